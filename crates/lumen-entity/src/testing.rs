//! Fixtures shared by this crate's tests.

use std::any::Any;
use std::sync::Arc;

use lumen_canon::{ContentKey, Document};
use lumen_store::{
    BlobRefStore, DocumentStore, InMemoryBlobStore, InMemoryDocumentStore, Projection, Query,
    StoreError, StoreResult,
};
use lumen_types::DocumentId;
use serde_json::Value;

use crate::document::{envelope, optional, read_id, required, to_value};
use crate::entity::{Entity, EntityType};
use crate::error::EntityResult;
use crate::registry::Registry;
use crate::resolver::Resolver;

/// Leaf entity with a set-valued field.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub id: Option<DocumentId>,
    pub text: String,
    pub tags: Vec<String>,
}

impl Note {
    pub fn new(text: &str, tags: &[&str]) -> Self {
        Self {
            id: None,
            text: text.to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        }
    }
}

impl Entity for Note {
    fn type_tag(&self) -> &'static str {
        Self::TYPE_TAG
    }
    fn id(&self) -> Option<DocumentId> {
        self.id
    }
    fn set_id(&mut self, id: DocumentId) {
        self.id = Some(id);
    }
    fn serialize(&self) -> EntityResult<Document> {
        let mut doc = envelope(Self::TYPE_TAG, self.id);
        doc.insert("text".into(), Value::String(self.text.clone()));
        doc.insert("tags".into(), to_value(Self::TYPE_TAG, &self.tags)?);
        Ok(doc)
    }
    fn unordered_fields(&self) -> &'static [&'static str] {
        &["tags"]
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl EntityType for Note {
    const TYPE_TAG: &'static str = "Note";

    fn deserialize(doc: &Document, _resolver: &Resolver) -> EntityResult<Self> {
        Ok(Self {
            id: read_id(doc)?,
            text: required(doc, "text")?,
            tags: optional(doc, "tags")?.unwrap_or_default(),
        })
    }
}

/// Parent entity referencing notes by id.
#[derive(Debug)]
pub struct Notebook {
    pub id: Option<DocumentId>,
    pub notes: Vec<Note>,
}

impl Entity for Notebook {
    fn type_tag(&self) -> &'static str {
        Self::TYPE_TAG
    }
    fn id(&self) -> Option<DocumentId> {
        self.id
    }
    fn set_id(&mut self, id: DocumentId) {
        self.id = Some(id);
    }
    fn serialize(&self) -> EntityResult<Document> {
        let ids: Vec<Option<DocumentId>> = self.notes.iter().map(|n| n.id).collect();
        let mut doc = envelope(Self::TYPE_TAG, self.id);
        doc.insert("notes".into(), to_value(Self::TYPE_TAG, &ids)?);
        Ok(doc)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl EntityType for Notebook {
    const TYPE_TAG: &'static str = "Notebook";

    fn deserialize(doc: &Document, resolver: &Resolver) -> EntityResult<Self> {
        let ids: Vec<DocumentId> = required(doc, "notes")?;
        let mut resolved = resolver.resolve_many_as::<Note>(&ids)?;
        let notes = ids.iter().filter_map(|id| resolved.remove(id)).collect();
        Ok(Self {
            id: read_id(doc)?,
            notes,
        })
    }
}

pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<Note>().register::<Notebook>();
    registry
}

pub fn setup() -> (Arc<InMemoryDocumentStore>, Resolver) {
    let docs = Arc::new(InMemoryDocumentStore::new());
    let blobs = BlobRefStore::new(Arc::new(InMemoryBlobStore::new()));
    let resolver = Resolver::new(docs.clone(), blobs, registry());
    (docs, resolver)
}

/// Document store whose every call fails as if the server were down.
pub struct FailingDocumentStore;

impl DocumentStore for FailingDocumentStore {
    fn find_one(&self, _: &Query, _: Projection) -> StoreResult<Option<Document>> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    fn insert(&self, _: Document, _: ContentKey) -> StoreResult<DocumentId> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    fn get(&self, _: &DocumentId) -> StoreResult<Option<Document>> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}
