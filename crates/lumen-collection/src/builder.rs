use std::collections::BTreeMap;

use lumen_entity::{Entity, EntityResult};
use lumen_image::ImageRecord;
use lumen_store::{BlobRefStore, DocumentStore};
use lumen_types::{DocumentId, Timestamp};

use crate::collection::ImageCollection;
use crate::sequence::ImageSequence;
use crate::sequence_type::SequenceType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Collection(SequenceType),
    Sequence,
}

/// Assembles an aggregate from images one at a time, then saves it.
///
/// One importer owns a builder; it is not meant to be shared.
#[derive(Debug)]
pub struct CollectionBuilder {
    target: Target,
    images: BTreeMap<Timestamp, ImageRecord>,
}

impl CollectionBuilder {
    /// Build an [`ImageCollection`] tagged with `sequence_type`.
    pub fn collection(sequence_type: SequenceType) -> Self {
        Self {
            target: Target::Collection(sequence_type),
            images: BTreeMap::new(),
        }
    }

    /// Build an [`ImageSequence`].
    pub fn sequence() -> Self {
        Self {
            target: Target::Sequence,
            images: BTreeMap::new(),
        }
    }

    /// Add `image` at `timestamp`, or one past the latest key if `None`.
    ///
    /// An image already at that timestamp is replaced.
    pub fn add_image(&mut self, image: ImageRecord, timestamp: Option<Timestamp>) -> Timestamp {
        let timestamp = timestamp.unwrap_or_else(|| {
            self.images
                .keys()
                .next_back()
                .map_or(Timestamp::ZERO, Timestamp::next)
        });
        if self.images.insert(timestamp, image).is_some() {
            tracing::warn!(%timestamp, "replacing image already added at this timestamp");
        }
        timestamp
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Persist every member's payloads and document, then the aggregate.
    ///
    /// Saving the same images twice returns the same aggregate id.
    pub fn save(self, docs: &dyn DocumentStore, blobs: &BlobRefStore) -> EntityResult<DocumentId> {
        let count = self.images.len();
        let (kind, id) = match self.target {
            Target::Collection(sequence_type) => {
                let mut collection = ImageCollection::new(self.images, sequence_type)?;
                let id = collection.save_with_members(docs, blobs)?;
                (collection.type_tag(), id)
            }
            Target::Sequence => {
                let mut sequence = ImageSequence::new(self.images)?;
                let id = sequence.save_with_members(docs, blobs)?;
                (sequence.type_tag(), id)
            }
        };
        tracing::info!(kind, id = %id.short_hex(), images = count, "aggregate saved");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ImageSource;
    use crate::testing::*;

    #[test]
    fn implicit_timestamps_increase() {
        let mut builder = CollectionBuilder::sequence();
        assert_eq!(builder.add_image(mono(0), None), Timestamp::ZERO);
        assert_eq!(builder.add_image(mono(1), None), ts(1.0));
        assert_eq!(builder.add_image(mono(2), Some(ts(7.25))), ts(7.25));
        assert_eq!(builder.add_image(mono(3), None), ts(8.0));
        assert_eq!(builder.len(), 4);
    }

    #[test]
    fn duplicate_timestamp_replaces() {
        let mut builder = CollectionBuilder::collection(SequenceType::NonSequential);
        builder.add_image(mono(0), Some(ts(1.0)));
        builder.add_image(mono_with_depth(1), Some(ts(1.0)));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn save_persists_members_then_aggregate() {
        let f = fixture();
        let mut builder = CollectionBuilder::collection(SequenceType::Sequential);
        builder.add_image(mono_with_depth(0), None);
        builder.add_image(mono_with_depth(1), None);
        let id = builder.save(f.docs.as_ref(), &f.blobs).unwrap();

        // Two colour and two depth payloads, two images, one collection.
        assert_eq!(f.counting.puts(), 4);
        assert_eq!(f.docs.len().unwrap(), 3);

        let collection: ImageCollection = f.resolver.resolve_as(&id).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.sequence_type(), SequenceType::Sequential);
        assert!(collection.depth_available());
    }

    #[test]
    fn importing_twice_returns_the_same_id() {
        let f = fixture();
        let import = || {
            let mut builder = CollectionBuilder::sequence();
            for seed in 0..3 {
                builder.add_image(mono(seed), None);
            }
            builder.save(f.docs.as_ref(), &f.blobs).unwrap()
        };
        let first = import();
        let docs = f.docs.len().unwrap();
        let second = import();
        assert_eq!(first, second);
        assert_eq!(f.docs.len().unwrap(), docs);

        let sequence = crate::resolve_source(&f.resolver, &first).unwrap();
        assert!(!sequence.supports_random_access());
        assert_eq!(sequence.len(), 3);
    }

    #[test]
    fn empty_builder_saves_an_empty_aggregate() {
        let f = fixture();
        let id = CollectionBuilder::collection(SequenceType::NonSequential)
            .save(f.docs.as_ref(), &f.blobs)
            .unwrap();
        let collection: ImageCollection = f.resolver.resolve_as(&id).unwrap();
        assert!(collection.is_empty());
        assert!(!collection.depth_available());
    }
}
