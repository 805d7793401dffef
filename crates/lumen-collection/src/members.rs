use std::collections::{BTreeMap, HashSet};

use lumen_entity::{Entity, EntityError, EntityResult, Resolver};
use lumen_image::ImageRecord;
use lumen_store::{BlobRefStore, DocumentStore};
use lumen_types::{DocumentId, Timestamp};

use crate::capabilities::Capabilities;
use crate::cursor::Cursor;

/// Timestamped member images plus everything derived from them at build
/// time. Shared by both aggregate types.
#[derive(Debug)]
pub(crate) struct Members {
    images: BTreeMap<Timestamp, ImageRecord>,
    timestamps: Vec<Timestamp>,
    capabilities: Capabilities,
}

impl Members {
    pub(crate) fn new(images: BTreeMap<Timestamp, ImageRecord>) -> EntityResult<Self> {
        let capabilities = Capabilities::of(images.values())?;
        let timestamps = images.keys().copied().collect();
        Ok(Self {
            images,
            timestamps,
            capabilities,
        })
    }

    pub(crate) fn images(&self) -> &BTreeMap<Timestamp, ImageRecord> {
        &self.images
    }

    pub(crate) fn get(&self, timestamp: Timestamp) -> Option<&ImageRecord> {
        self.images.get(&timestamp)
    }

    pub(crate) fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub(crate) fn len(&self) -> usize {
        self.images.len()
    }

    pub(crate) fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub(crate) fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.images)
    }

    pub(crate) fn validate(&self) -> bool {
        self.images.values().all(ImageRecord::validate)
    }

    /// `(timestamp, image id)` pairs. Every member must have been saved.
    pub(crate) fn ids(&self, tag: &str) -> EntityResult<Vec<(Timestamp, DocumentId)>> {
        self.images
            .iter()
            .map(|(ts, image)| {
                image
                    .id()
                    .map(|id| (*ts, id))
                    .ok_or_else(|| EntityError::schema(tag, format!("image at {ts} is not saved")))
            })
            .collect()
    }

    /// Save every member's payloads and document.
    pub(crate) fn save_all(
        &mut self,
        docs: &dyn DocumentStore,
        blobs: &BlobRefStore,
    ) -> EntityResult<()> {
        for image in self.images.values_mut() {
            image.save_with_payloads(docs, blobs)?;
        }
        Ok(())
    }

    /// Fetch the images referenced by `pairs` in one batch.
    pub(crate) fn resolve(
        pairs: &[(Timestamp, DocumentId)],
        resolver: &Resolver,
    ) -> EntityResult<BTreeMap<Timestamp, ImageRecord>> {
        let mut unique: Vec<DocumentId> = pairs.iter().map(|(_, id)| *id).collect();
        unique.sort();
        unique.dedup();

        let mut resolved = resolver.resolve_many_as::<ImageRecord>(&unique)?;
        let mut taken = HashSet::new();
        let mut images = BTreeMap::new();
        for (ts, id) in pairs {
            let image = match resolved.remove(id) {
                Some(image) => image,
                // The same image under a second timestamp needs its own instance.
                None if taken.contains(id) => resolver.resolve_as(id)?,
                None => return Err(EntityError::NotFound(format!("image {id}"))),
            };
            taken.insert(*id);
            images.insert(*ts, image);
        }
        Ok(images)
    }
}
