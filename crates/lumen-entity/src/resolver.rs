use std::collections::HashMap;
use std::sync::Arc;

use lumen_canon::Document;
use lumen_store::{BlobRefStore, DocumentStore};
use lumen_types::DocumentId;

use crate::document::{read_id, type_tag};
use crate::entity::{Entity, EntityType};
use crate::error::{EntityError, EntityResult};
use crate::registry::Registry;

/// Turns stored documents back into entities.
///
/// A resolver bundles everything decoding needs: the document store to
/// fetch children from, the registry to dispatch on `_type`, and the blob
/// store that lazily-loaded channels will read from later.
#[derive(Clone)]
pub struct Resolver {
    docs: Arc<dyn DocumentStore>,
    blobs: BlobRefStore,
    registry: Arc<Registry>,
}

impl Resolver {
    pub fn new(docs: Arc<dyn DocumentStore>, blobs: BlobRefStore, registry: Registry) -> Self {
        Self {
            docs,
            blobs,
            registry: Arc::new(registry),
        }
    }

    pub fn documents(&self) -> &dyn DocumentStore {
        self.docs.as_ref()
    }

    pub fn blobs(&self) -> &BlobRefStore {
        &self.blobs
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Decode a document by dispatching on its type tag.
    pub fn deserialize(&self, doc: &Document) -> EntityResult<Box<dyn Entity>> {
        let tag = type_tag(doc)?;
        let decode = self
            .registry
            .get(tag)
            .ok_or_else(|| EntityError::schema(tag, "unknown type tag"))?;
        decode(doc, self)
    }

    /// Decode a document as a specific type.
    pub fn deserialize_as<T: EntityType>(&self, doc: &Document) -> EntityResult<T> {
        downcast(self.deserialize(doc)?)
    }

    /// Fetch and decode one entity.
    pub fn resolve(&self, id: &DocumentId) -> EntityResult<Box<dyn Entity>> {
        let doc = self
            .docs
            .get(id)?
            .ok_or_else(|| EntityError::NotFound(format!("document {id}")))?;
        self.deserialize(&doc)
    }

    /// Fetch and decode one entity as a specific type.
    pub fn resolve_as<T: EntityType>(&self, id: &DocumentId) -> EntityResult<T> {
        downcast(self.resolve(id)?)
    }

    /// Batch-fetch and decode many entities.
    ///
    /// Ids with no stored document are absent from the result; callers
    /// decide whether that is an error.
    pub fn resolve_many(
        &self,
        ids: &[DocumentId],
    ) -> EntityResult<HashMap<DocumentId, Box<dyn Entity>>> {
        let docs = self.docs.find_many(ids)?;
        let mut out = HashMap::with_capacity(docs.len());
        for doc in docs {
            let Some(id) = read_id(&doc)? else {
                return Err(EntityError::schema(
                    type_tag(&doc).unwrap_or("<untagged>"),
                    "stored document has no `_id`",
                ));
            };
            out.insert(id, self.deserialize(&doc)?);
        }
        tracing::trace!(requested = ids.len(), resolved = out.len(), "resolved batch");
        Ok(out)
    }

    /// Batch-fetch and decode many entities of one type.
    pub fn resolve_many_as<T: EntityType>(
        &self,
        ids: &[DocumentId],
    ) -> EntityResult<HashMap<DocumentId, T>> {
        self.resolve_many(ids)?
            .into_iter()
            .map(|(id, entity)| Ok((id, downcast(entity)?)))
            .collect()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn downcast<T: EntityType>(entity: Box<dyn Entity>) -> EntityResult<T> {
    let found = entity.type_tag();
    entity
        .into_any()
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| EntityError::TypeMismatch {
            expected: T::TYPE_TAG.to_owned(),
            found: found.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::envelope;
    use crate::testing::{setup, Note, Notebook};

    #[test]
    fn resolve_dispatches_on_tag() {
        let (docs, resolver) = setup();
        let mut note = Note::new("hello", &["a", "b"]);
        let id = note.save(docs.as_ref()).unwrap();

        let entity = resolver.resolve(&id).unwrap();
        assert_eq!(entity.type_tag(), "Note");
        assert_eq!(entity.id(), Some(id));
        let back = entity.as_any().downcast_ref::<Note>().unwrap();
        assert_eq!(back, &note);
    }

    #[test]
    fn resolve_as_wrong_type_is_mismatch() {
        let (docs, resolver) = setup();
        let id = Note::new("n", &[]).save(docs.as_ref()).unwrap();
        let err = resolver.resolve_as::<Notebook>(&id).unwrap_err();
        assert!(matches!(
            err,
            EntityError::TypeMismatch { ref expected, ref found }
                if expected == "Notebook" && found == "Note"
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let (_, resolver) = setup();
        let err = resolver.deserialize(&envelope("Hologram", None)).err().unwrap();
        assert!(matches!(
            err,
            EntityError::Schema { ref tag, ref reason }
                if tag == "Hologram" && reason == "unknown type tag"
        ));
    }

    #[test]
    fn missing_document_is_not_found() {
        let (_, resolver) = setup();
        let err = resolver.resolve(&DocumentId::generate()).err().unwrap();
        assert!(matches!(err, EntityError::NotFound(_)));
    }

    #[test]
    fn children_resolved_in_one_batch() {
        let (docs, resolver) = setup();
        let mut a = Note::new("a", &[]);
        let mut b = Note::new("b", &[]);
        a.save(docs.as_ref()).unwrap();
        b.save(docs.as_ref()).unwrap();

        let mut book = Notebook {
            id: None,
            notes: vec![a.clone(), b.clone()],
        };
        let id = book.save(docs.as_ref()).unwrap();

        let back: Notebook = resolver.resolve_as(&id).unwrap();
        assert_eq!(back.notes, vec![a, b]);
    }

    #[test]
    fn resolve_many_skips_missing_ids() {
        let (docs, resolver) = setup();
        let id = Note::new("n", &[]).save(docs.as_ref()).unwrap();
        let found = resolver
            .resolve_many(&[id, DocumentId::generate()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&id));
    }

    #[test]
    fn serialize_is_stable_across_round_trips() {
        let (docs, resolver) = setup();
        let mut note = Note::new("stable", &["x", "y"]);
        note.save(docs.as_ref()).unwrap();

        let first = lumen_canon::canonical_bytes(&note.serialize().unwrap());
        let mut current = note;
        for _ in 0..100 {
            let doc = current.serialize().unwrap();
            current = resolver.deserialize_as::<Note>(&doc).unwrap();
        }
        assert_eq!(lumen_canon::canonical_bytes(&current.serialize().unwrap()), first);
    }
}
