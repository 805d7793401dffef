use std::any::Any;

use lumen_canon::Document;
use lumen_store::DocumentStore;
use lumen_types::DocumentId;

use crate::error::EntityResult;
use crate::persist::save_or_get;
use crate::resolver::Resolver;

/// A persistable record with store-assigned identity.
///
/// An entity starts life in memory without an id. `save` serializes it,
/// dedups the document against the store, and records the id it ends up
/// with: either a fresh one or that of an existing equal document.
pub trait Entity: Send + Sync + 'static {
    /// Registry tag written as `_type`.
    fn type_tag(&self) -> &'static str;

    /// The persisted id, if saved.
    fn id(&self) -> Option<DocumentId>;

    /// Record the id assigned by the store.
    fn set_id(&mut self, id: DocumentId);

    /// Encode as a type-tagged document.
    ///
    /// Referenced entities appear by id only. Implementations must not embed
    /// child content, so the dedup query does not depend on how children
    /// are encoded.
    fn serialize(&self) -> EntityResult<Document>;

    /// Top-level fields whose array values are compared as sets on dedup.
    fn unordered_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Dedup-persist this entity's document and record the resulting id.
    fn save(&mut self, store: &dyn DocumentStore) -> EntityResult<DocumentId> {
        let doc = self.serialize()?;
        let id = save_or_get(doc, self.unordered_fields(), store)?;
        self.set_id(id);
        Ok(id)
    }
}

/// A concrete entity type that can be registered for polymorphic decoding.
pub trait EntityType: Entity + Sized {
    /// Tag under which documents of this type are stored.
    const TYPE_TAG: &'static str;

    /// Rebuild an instance from a stored document.
    ///
    /// Fields added after a document was written must default when absent.
    /// Child references are resolved through `resolver`.
    fn deserialize(doc: &Document, resolver: &Resolver) -> EntityResult<Self>;
}
