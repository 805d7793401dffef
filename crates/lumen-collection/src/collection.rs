use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

use lumen_canon::Document;
use lumen_entity::document::{envelope, expect_tag, optional, read_id, required, to_value};
use lumen_entity::{save_or_get, Entity, EntityResult, EntityType, Resolver};
use lumen_image::ImageRecord;
use lumen_store::{BlobRefStore, DocumentStore};
use lumen_types::{CameraIntrinsics, DocumentId, Timestamp};
use serde_json::Value;

use crate::capabilities::Capabilities;
use crate::cursor::Cursor;
use crate::members::Members;
use crate::sequence_type::SequenceType;
use crate::source::ImageSource;

/// Camera separations closer than this are the same stereo rig.
const BASELINE_TOLERANCE: f64 = 1e-9;

/// A set of images under one persisted identity, with random access by
/// timestamp.
///
/// Members are kept in timestamp order. Capability flags, shared intrinsics
/// and stereo baseline are computed once when the collection is built.
#[derive(Debug)]
pub struct ImageCollection {
    id: Option<DocumentId>,
    sequence_type: SequenceType,
    members: Members,
    intrinsics: Option<CameraIntrinsics>,
    stereo_baseline: Option<f64>,
}

impl ImageCollection {
    pub const TAG: &'static str = "ImageCollection";

    pub fn new(
        images: BTreeMap<Timestamp, ImageRecord>,
        sequence_type: SequenceType,
    ) -> EntityResult<Self> {
        let members = Members::new(images)?;
        let intrinsics = shared_intrinsics(members.images());
        let stereo_baseline = if members.capabilities().stereo {
            shared_baseline(members.images())
        } else {
            None
        };
        Ok(Self {
            id: None,
            sequence_type,
            members,
            intrinsics,
            stereo_baseline,
        })
    }

    /// Iterate `(timestamp, image)` in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, &ImageRecord)> {
        self.members.images().iter().map(|(ts, image)| (*ts, image))
    }

    /// Intrinsics shared by every member, or `None` if any member differs
    /// or lacks them.
    pub fn camera_intrinsics(&self) -> Option<&CameraIntrinsics> {
        self.intrinsics.as_ref()
    }

    /// Distance between the paired cameras, if every member is a stereo pair
    /// with the same separation.
    pub fn stereo_baseline(&self) -> Option<f64> {
        self.stereo_baseline
    }

    /// Save member payloads and documents, then dedup-save the collection.
    pub fn save_with_members(
        &mut self,
        docs: &dyn DocumentStore,
        blobs: &BlobRefStore,
    ) -> EntityResult<DocumentId> {
        self.members.save_all(docs, blobs)?;
        self.save(docs)
    }

    /// Dedup-save a collection document straight from image ids, without
    /// loading the images.
    ///
    /// Returns `Ok(None)` and logs a warning if any id is not in the store.
    pub fn create_and_save(
        docs: &dyn DocumentStore,
        images: &BTreeMap<Timestamp, DocumentId>,
        sequence_type: SequenceType,
    ) -> EntityResult<Option<DocumentId>> {
        let unique: Vec<DocumentId> = images
            .values()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let found = docs.count_existing(&unique)?;
        if found != unique.len() {
            tracing::warn!(
                missing = unique.len() - found,
                "refusing to create image collection with missing image ids"
            );
            return Ok(None);
        }

        let pairs: Vec<(Timestamp, DocumentId)> =
            images.iter().map(|(ts, id)| (*ts, *id)).collect();
        let doc = collection_document(None, &pairs, sequence_type)?;
        let id = save_or_get(doc, &["images"], docs)?;
        tracing::info!(collection = %id.short_hex(), images = pairs.len(), "image collection saved");
        Ok(Some(id))
    }
}

fn collection_document(
    id: Option<DocumentId>,
    pairs: &[(Timestamp, DocumentId)],
    sequence_type: SequenceType,
) -> EntityResult<Document> {
    let mut doc = envelope(ImageCollection::TAG, id);
    doc.insert("images".into(), to_value(ImageCollection::TAG, &pairs)?);
    doc.insert(
        "sequence_type".into(),
        Value::String(sequence_type.code().to_owned()),
    );
    Ok(doc)
}

fn shared_intrinsics(images: &BTreeMap<Timestamp, ImageRecord>) -> Option<CameraIntrinsics> {
    let mut values = images.values().map(|image| image.intrinsics().copied());
    let first = values.next()??;
    values.all(|other| other == Some(first)).then_some(first)
}

fn shared_baseline(images: &BTreeMap<Timestamp, ImageRecord>) -> Option<f64> {
    let mut values = images.values().map(ImageRecord::stereo_baseline);
    let first = values.next()??;
    values
        .all(|other| other.is_some_and(|b| (b - first).abs() <= BASELINE_TOLERANCE))
        .then_some(first)
}

impl ImageSource for ImageCollection {
    fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    fn get(&self, timestamp: Timestamp) -> Option<&ImageRecord> {
        self.members.get(timestamp)
    }

    fn timestamps(&self) -> &[Timestamp] {
        self.members.timestamps()
    }

    fn begin(&self) -> Cursor<'_> {
        self.members.cursor()
    }

    fn supports_random_access(&self) -> bool {
        true
    }

    fn capabilities(&self) -> Capabilities {
        self.members.capabilities()
    }

    fn validate(&self) -> bool {
        self.members.validate()
    }
}

impl Entity for ImageCollection {
    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn id(&self) -> Option<DocumentId> {
        self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = Some(id);
    }

    fn serialize(&self) -> EntityResult<Document> {
        let pairs = self.members.ids(Self::TAG)?;
        collection_document(self.id, &pairs, self.sequence_type)
    }

    fn unordered_fields(&self) -> &'static [&'static str] {
        &["images"]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl EntityType for ImageCollection {
    const TYPE_TAG: &'static str = Self::TAG;

    fn deserialize(doc: &Document, resolver: &Resolver) -> EntityResult<Self> {
        expect_tag(doc, Self::TAG)?;
        let pairs: Vec<(Timestamp, DocumentId)> = required(doc, "images")?;
        let sequence_type: SequenceType = optional(doc, "sequence_type")?.unwrap_or_default();
        let images = Members::resolve(&pairs, resolver)?;
        let mut collection = Self::new(images, sequence_type)?;
        collection.id = read_id(doc)?;
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use lumen_types::{ImageMetadata, ImageSourceType};

    use super::*;
    use crate::testing::*;

    #[test]
    fn saved_image_dedups_and_collection_reports_flags() {
        let f = fixture();
        let record = || {
            ImageRecord::mono(
                lumen_image::View::new(pose(0), colour(0)),
                ImageMetadata::new(ImageSourceType::Synthetic, 600, 800),
            )
            .unwrap()
        };
        let a = record().save_with_payloads(f.docs.as_ref(), &f.blobs).unwrap();
        let docs_after_first = f.docs.len().unwrap();
        let again = record().save_with_payloads(f.docs.as_ref(), &f.blobs).unwrap();
        assert_eq!(a, again);
        assert_eq!(f.docs.len().unwrap(), docs_after_first);

        let image = f.resolver.resolve_as::<ImageRecord>(&a).unwrap();
        let mut collection =
            ImageCollection::new([(Timestamp::ZERO, image)].into(), SequenceType::NonSequential)
                .unwrap();
        collection.save(f.docs.as_ref()).unwrap();
        assert!(!collection.depth_available());
        assert!(!collection.stereo_available());
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn flags_require_every_member() {
        let images = keyed([
            (0.0, mono_with_depth(0)),
            (1.0, mono_with_depth(1)),
            (2.0, mono_with_depth(2)),
            (3.0, mono(3)),
        ]);
        let collection = ImageCollection::new(images, SequenceType::Sequential).unwrap();
        assert!(!collection.depth_available());
        assert!(!collection.labels_available());

        let all = keyed([(0.0, mono_with_depth(0)), (1.0, mono_with_depth(1))]);
        let collection = ImageCollection::new(all, SequenceType::Sequential).unwrap();
        assert!(collection.depth_available());
    }

    #[test]
    fn empty_collection_has_no_capabilities() {
        let collection = ImageCollection::new(BTreeMap::new(), SequenceType::NonSequential).unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.capabilities(), Capabilities::default());
        assert!(!collection.bounding_boxes_available());
        assert_eq!(collection.camera_intrinsics(), None);
        assert_eq!(collection.stereo_baseline(), None);
        assert!(collection.validate());
    }

    #[test]
    fn missing_key_is_none() {
        let collection =
            ImageCollection::new(keyed([(1.0, mono(1))]), SequenceType::NonSequential).unwrap();
        assert!(collection.get(ts(1.0)).is_some());
        assert!(collection.get(ts(2.0)).is_none());
        assert!(collection.supports_random_access());
    }

    #[test]
    fn intrinsics_shared_or_none() {
        let collection =
            ImageCollection::new(keyed([(0.0, mono(0)), (1.0, mono(1))]), SequenceType::default())
                .unwrap();
        assert_eq!(collection.camera_intrinsics(), metadata().intrinsics.as_ref());

        let odd = ImageRecord::mono(
            lumen_image::View::new(pose(9), colour(9)),
            metadata().with_intrinsics(lumen_types::CameraIntrinsics::new(1.0, 1.0, 0.5, 0.5)),
        )
        .unwrap();
        let mixed =
            ImageCollection::new(keyed([(0.0, mono(0)), (1.0, odd)]), SequenceType::default())
                .unwrap();
        assert_eq!(mixed.camera_intrinsics(), None);
    }

    #[test]
    fn baseline_needs_matching_stereo_members() {
        let same = ImageCollection::new(
            keyed([(0.0, stereo(0, 0.12)), (1.0, stereo(1, 0.12))]),
            SequenceType::Sequential,
        )
        .unwrap();
        assert!(same.stereo_available());
        let baseline = same.stereo_baseline().unwrap();
        assert!((baseline - 0.12).abs() < 1e-9);

        let differ = ImageCollection::new(
            keyed([(0.0, stereo(0, 0.12)), (1.0, stereo(1, 0.3))]),
            SequenceType::Sequential,
        )
        .unwrap();
        assert_eq!(differ.stereo_baseline(), None);

        let mixed = ImageCollection::new(
            keyed([(0.0, stereo(0, 0.12)), (1.0, mono(1))]),
            SequenceType::Sequential,
        )
        .unwrap();
        assert!(!mixed.stereo_available());
        assert_eq!(mixed.stereo_baseline(), None);
    }

    #[test]
    fn bounding_boxes_need_labelled_objects_everywhere() {
        let labelled = || {
            ImageRecord::mono(lumen_image::View::new(pose(0), colour(0)), labelled_metadata())
                .unwrap()
        };
        let all = ImageCollection::new(
            keyed([(0.0, labelled()), (1.0, labelled())]),
            SequenceType::default(),
        )
        .unwrap();
        assert!(all.bounding_boxes_available());

        let some = ImageCollection::new(
            keyed([(0.0, labelled()), (1.0, mono(1))]),
            SequenceType::default(),
        )
        .unwrap();
        assert!(!some.bounding_boxes_available());
    }

    #[test]
    fn unsaved_members_cannot_be_serialized() {
        let collection =
            ImageCollection::new(keyed([(0.0, mono(0))]), SequenceType::default()).unwrap();
        let err = collection.serialize().unwrap_err();
        assert!(matches!(err, lumen_entity::EntityError::Schema { .. }));
    }

    #[test]
    fn round_trip_is_byte_stable() {
        let f = fixture();
        let mut collection = ImageCollection::new(
            keyed([(2.5, mono(2)), (0.0, stereo(0, 0.1)), (1.0, mono_with_depth(1))]),
            SequenceType::Sequential,
        )
        .unwrap();
        let id = collection.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();

        let mut doc = collection.serialize().unwrap();
        let original = serde_json::to_vec(&doc).unwrap();
        for _ in 0..100 {
            let decoded: ImageCollection = f.resolver.deserialize_as(&doc).unwrap();
            assert_eq!(decoded.id(), Some(id));
            doc = decoded.serialize().unwrap();
            assert_eq!(serde_json::to_vec(&doc).unwrap(), original);
        }
    }

    #[test]
    fn decoded_collection_keeps_flags_and_loads_lazily() {
        let f = fixture();
        let mut collection = ImageCollection::new(
            keyed([(0.0, mono_with_depth(0)), (1.0, mono_with_depth(1))]),
            SequenceType::Sequential,
        )
        .unwrap();
        let id = collection.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();
        let gets = f.counting.gets();

        let decoded: ImageCollection = f.resolver.resolve_as(&id).unwrap();
        assert_eq!(decoded.sequence_type(), SequenceType::Sequential);
        assert!(decoded.depth_available());
        assert_eq!(decoded.timestamps(), &[ts(0.0), ts(1.0)]);
        assert_eq!(f.counting.gets(), gets);

        let image = decoded.get(ts(1.0)).unwrap();
        assert_eq!(*image.colour().unwrap(), colour(1));
        assert_eq!(f.counting.gets(), gets + 1);
    }

    #[test]
    fn missing_sequence_type_defaults_to_non_sequential() {
        let f = fixture();
        let mut collection =
            ImageCollection::new(keyed([(0.0, mono(0))]), SequenceType::Sequential).unwrap();
        collection.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();

        let mut doc = collection.serialize().unwrap();
        doc.remove("sequence_type");
        let decoded: ImageCollection = f.resolver.deserialize_as(&doc).unwrap();
        assert_eq!(decoded.sequence_type(), SequenceType::NonSequential);
    }

    #[test]
    fn member_order_does_not_change_identity() {
        let f = fixture();
        let mut first = ImageCollection::new(
            keyed([(0.0, mono(0)), (1.0, mono(1))]),
            SequenceType::default(),
        )
        .unwrap();
        let a = first.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();

        let mut second = ImageCollection::new(
            keyed([(1.0, mono(1)), (0.0, mono(0))]),
            SequenceType::default(),
        )
        .unwrap();
        let b = second.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn create_and_save_refuses_missing_ids() {
        let f = fixture();
        let a = mono(0).save_with_payloads(f.docs.as_ref(), &f.blobs).unwrap();
        let images = BTreeMap::from([(ts(0.0), a), (ts(1.0), DocumentId::generate())]);
        let before = f.docs.len().unwrap();

        let result =
            ImageCollection::create_and_save(f.docs.as_ref(), &images, SequenceType::default())
                .unwrap();
        assert_eq!(result, None);
        assert_eq!(f.docs.len().unwrap(), before);
    }

    #[test]
    fn create_and_save_matches_a_regular_save() {
        let f = fixture();
        let mut collection = ImageCollection::new(
            keyed([(0.0, mono(0)), (1.0, mono(1)), (2.0, mono(0))]),
            SequenceType::Sequential,
        )
        .unwrap();
        let saved = collection.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();

        let ids: BTreeMap<Timestamp, DocumentId> = collection
            .iter()
            .map(|(ts, image)| (ts, image.id().unwrap()))
            .collect();
        let created =
            ImageCollection::create_and_save(f.docs.as_ref(), &ids, SequenceType::Sequential)
                .unwrap();
        assert_eq!(created, Some(saved));
        assert!(f.docs.get(&saved).unwrap().is_some());
    }
}
