//! Fixtures shared by this crate's tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lumen_image::{BlobRef, ImageRecord, View};
use lumen_entity::Resolver;
use lumen_store::{
    BlobRefStore, BlobStore, InMemoryBlobStore, InMemoryDocumentStore, Payload, StoreResult,
};
use lumen_types::{
    BlobId, BoundingBox, CameraIntrinsics, ImageMetadata, ImageSourceType, LabelledObject,
    Timestamp, Transform,
};

/// Blob store that counts reads and writes.
#[derive(Default)]
pub struct CountingBlobStore {
    inner: InMemoryBlobStore,
    puts: AtomicUsize,
    gets: AtomicUsize,
}

impl CountingBlobStore {
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl BlobStore for CountingBlobStore {
    fn put(&self, bytes: &[u8]) -> StoreResult<BlobId> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(bytes)
    }
    fn get(&self, id: &BlobId) -> StoreResult<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id)
    }
    fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        self.inner.exists(id)
    }
}

pub struct Fixture {
    pub docs: Arc<InMemoryDocumentStore>,
    pub counting: Arc<CountingBlobStore>,
    pub blobs: BlobRefStore,
    pub resolver: Resolver,
}

pub fn fixture() -> Fixture {
    let docs = Arc::new(InMemoryDocumentStore::new());
    let counting = Arc::new(CountingBlobStore::default());
    let blobs = BlobRefStore::new(counting.clone());
    let resolver = Resolver::new(docs.clone(), blobs.clone(), crate::default_registry());
    Fixture {
        docs,
        counting,
        blobs,
        resolver,
    }
}

pub const H: usize = 6;
pub const W: usize = 8;

pub fn metadata() -> ImageMetadata {
    ImageMetadata::new(ImageSourceType::Synthetic, H as u32, W as u32)
        .with_intrinsics(CameraIntrinsics::new(0.9, 1.2, 0.5, 0.5))
}

pub fn labelled_metadata() -> ImageMetadata {
    metadata().with_labelled_objects(vec![LabelledObject::new(
        ["chair"],
        BoundingBox::new(1, 1, 3, 2),
    )])
}

pub fn colour(seed: u8) -> Payload {
    Payload::from_u8(
        vec![H, W, 3],
        (0..H * W * 3).map(|i| (i as u8).wrapping_mul(3).wrapping_add(seed)).collect(),
    )
    .unwrap()
}

pub fn depth(seed: u8) -> Payload {
    Payload::from_f32(
        vec![H, W],
        (0..H * W).map(|i| i as f32 * 0.5 + f32::from(seed)).collect(),
    )
    .unwrap()
}

pub fn pose(seed: u8) -> Transform {
    Transform::from_location([f64::from(seed), 0.0, 1.5])
}

pub fn mono(seed: u8) -> ImageRecord {
    ImageRecord::mono(View::new(pose(seed), colour(seed)), metadata()).unwrap()
}

pub fn mono_with_depth(seed: u8) -> ImageRecord {
    ImageRecord::mono(
        View::new(pose(seed), colour(seed)).with_depth(depth(seed)),
        metadata(),
    )
    .unwrap()
}

/// Stereo pair whose cameras sit `baseline` apart along x.
pub fn stereo(seed: u8, baseline: f64) -> ImageRecord {
    let left = View::new(pose(seed), colour(seed)).with_depth(depth(seed));
    let mut right_location = pose(seed).location();
    right_location[0] += baseline;
    let right = View::new(
        Transform::from_location(right_location),
        BlobRef::from_payload(colour(seed.wrapping_add(100))),
    )
    .with_depth(depth(seed.wrapping_add(100)));
    ImageRecord::stereo(left, right, metadata()).unwrap()
}

pub fn keyed<I>(images: I) -> BTreeMap<Timestamp, ImageRecord>
where
    I: IntoIterator<Item = (f64, ImageRecord)>,
{
    images
        .into_iter()
        .map(|(ts, image)| (Timestamp::new(ts).unwrap(), image))
        .collect()
}

pub fn ts(seconds: f64) -> Timestamp {
    Timestamp::new(seconds).unwrap()
}
