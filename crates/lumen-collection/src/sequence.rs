use std::any::Any;
use std::collections::BTreeMap;

use lumen_canon::Document;
use lumen_entity::document::{envelope, expect_tag, read_id, required, to_value};
use lumen_entity::{Entity, EntityResult, EntityType, Resolver};
use lumen_image::ImageRecord;
use lumen_store::{BlobRefStore, DocumentStore};
use lumen_types::{DocumentId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::capabilities::Capabilities;
use crate::cursor::Cursor;
use crate::members::Members;
use crate::sequence_type::SequenceType;
use crate::source::ImageSource;

/// Frames captured along a camera path, replayed in ascending timestamp
/// order.
///
/// A sequence is meant to be walked with a [`Cursor`]. Lookups by timestamp
/// work but [`ImageSource::supports_random_access`] reports `false`.
#[derive(Debug)]
pub struct ImageSequence {
    id: Option<DocumentId>,
    members: Members,
}

/// One `images` entry in a stored sequence document.
#[derive(Serialize, Deserialize)]
struct Frame {
    timestamp: Timestamp,
    image: DocumentId,
}

impl ImageSequence {
    pub const TAG: &'static str = "ImageSequence";

    pub fn new(images: BTreeMap<Timestamp, ImageRecord>) -> EntityResult<Self> {
        Ok(Self {
            id: None,
            members: Members::new(images)?,
        })
    }

    /// Save member payloads and documents, then dedup-save the sequence.
    pub fn save_with_members(
        &mut self,
        docs: &dyn DocumentStore,
        blobs: &BlobRefStore,
    ) -> EntityResult<DocumentId> {
        self.members.save_all(docs, blobs)?;
        self.save(docs)
    }
}

impl ImageSource for ImageSequence {
    fn sequence_type(&self) -> SequenceType {
        SequenceType::Sequential
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
        false
    }

    fn capabilities(&self) -> Capabilities {
        self.members.capabilities()
    }

    fn validate(&self) -> bool {
        self.members.validate()
    }
}

impl Entity for ImageSequence {
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
        let frames: Vec<Frame> = self
            .members
            .ids(Self::TAG)?
            .into_iter()
            .map(|(timestamp, image)| Frame { timestamp, image })
            .collect();
        let mut doc = envelope(Self::TAG, self.id);
        doc.insert("images".into(), to_value(Self::TAG, &frames)?);
        Ok(doc)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl EntityType for ImageSequence {
    const TYPE_TAG: &'static str = Self::TAG;

    fn deserialize(doc: &Document, resolver: &Resolver) -> EntityResult<Self> {
        expect_tag(doc, Self::TAG)?;
        let frames: Vec<Frame> = required(doc, "images")?;
        let pairs: Vec<(Timestamp, DocumentId)> = frames
            .into_iter()
            .map(|frame| (frame.timestamp, frame.image))
            .collect();
        let images = Members::resolve(&pairs, resolver)?;
        let mut sequence = Self::new(images)?;
        sequence.id = read_id(doc)?;
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn replays_in_ascending_order() {
        let sequence =
            ImageSequence::new(keyed([(5.0, mono(5)), (1.0, mono(1)), (3.0, mono(3))])).unwrap();
        let mut cursor = sequence.begin();
        let mut seen = Vec::new();
        while let Some((_, timestamp)) = cursor.get_next() {
            seen.push(timestamp);
        }
        assert_eq!(seen, vec![ts(1.0), ts(3.0), ts(5.0)]);
        assert!(cursor.is_complete());
        assert!(cursor.get_next().is_none());
    }

    #[test]
    fn always_sequential_and_walk_only() {
        let sequence = ImageSequence::new(keyed([(0.0, mono(0))])).unwrap();
        assert_eq!(sequence.sequence_type(), SequenceType::Sequential);
        assert!(!sequence.supports_random_access());
    }

    #[test]
    fn document_lists_frames() {
        let f = fixture();
        let mut sequence = ImageSequence::new(keyed([(1.0, mono(1)), (0.0, mono(0))])).unwrap();
        sequence.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();

        let doc = sequence.serialize().unwrap();
        let frames = doc["images"].as_array().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["timestamp"], serde_json::json!(0.0));
        assert!(frames[1]["image"].is_string());
    }

    #[test]
    fn round_trip_is_byte_stable() {
        let f = fixture();
        let mut sequence = ImageSequence::new(keyed([
            (0.0, stereo(0, 0.2)),
            (0.5, stereo(1, 0.2)),
            (1.0, stereo(2, 0.2)),
        ]))
        .unwrap();
        let id = sequence.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();

        let mut doc = sequence.serialize().unwrap();
        let original = serde_json::to_vec(&doc).unwrap();
        for _ in 0..100 {
            let decoded: ImageSequence = f.resolver.deserialize_as(&doc).unwrap();
            assert_eq!(decoded.id(), Some(id));
            assert!(decoded.stereo_available());
            doc = decoded.serialize().unwrap();
            assert_eq!(serde_json::to_vec(&doc).unwrap(), original);
        }
    }

    #[test]
    fn identical_sequences_share_an_id() {
        let f = fixture();
        let build = || ImageSequence::new(keyed([(0.0, mono(0)), (1.0, mono(1))])).unwrap();
        let a = build().save_with_members(f.docs.as_ref(), &f.blobs).unwrap();
        let b = build().save_with_members(f.docs.as_ref(), &f.blobs).unwrap();
        assert_eq!(a, b);

        let shorter = ImageSequence::new(keyed([(0.0, mono(0))]))
            .unwrap()
            .save_with_members(f.docs.as_ref(), &f.blobs)
            .unwrap();
        assert_ne!(a, shorter);
    }

    #[test]
    fn missing_member_is_not_found() {
        let f = fixture();
        let mut sequence = ImageSequence::new(keyed([(0.0, mono(0))])).unwrap();
        sequence.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();

        let mut doc = sequence.serialize().unwrap();
        doc["images"][0]["image"] = serde_json::json!(DocumentId::generate().to_string());
        let err = f.resolver.deserialize_as::<ImageSequence>(&doc).unwrap_err();
        assert!(matches!(err, lumen_entity::EntityError::NotFound(_)));
    }

    #[test]
    fn replay_fetches_only_what_is_read() {
        let f = fixture();
        let mut sequence = ImageSequence::new(keyed([
            (0.0, mono_with_depth(0)),
            (1.0, mono_with_depth(1)),
            (2.0, mono_with_depth(2)),
        ]))
        .unwrap();
        let id = sequence.save_with_members(f.docs.as_ref(), &f.blobs).unwrap();
        let decoded: ImageSequence = f.resolver.resolve_as(&id).unwrap();
        let gets = f.counting.gets();

        for (_, image) in decoded.begin() {
            image.colour().unwrap();
        }
        assert_eq!(f.counting.gets(), gets + 3);
    }
}
