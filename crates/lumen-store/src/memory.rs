use std::collections::HashMap;
use std::sync::RwLock;

use lumen_canon::{ContentKey, Document, ID_FIELD};
use lumen_types::{BlobId, DocumentId};
use serde_json::Value;

use crate::error::{poisoned, StoreError, StoreResult};
use crate::query::{Projection, Query};
use crate::traits::{blob_id_for, BlobStore, DocumentStore};

#[derive(Default)]
struct DocumentState {
    docs: HashMap<DocumentId, Document>,
    by_key: HashMap<ContentKey, Vec<DocumentId>>,
    insertion_order: Vec<DocumentId>,
}

/// In-memory document store.
///
/// Intended for tests and embedding. Documents are indexed by content key,
/// so `find_one` is a hash lookup followed by a canonical comparison rather
/// than a scan.
pub struct InMemoryDocumentStore {
    inner: RwLock<DocumentState>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(DocumentState::default()),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.inner.read().map_err(poisoned)?.docs.len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All document ids in insertion order.
    pub fn all_ids(&self) -> StoreResult<Vec<DocumentId>> {
        Ok(self.inner.read().map_err(poisoned)?.insertion_order.clone())
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn find_one(&self, query: &Query, projection: Projection) -> StoreResult<Option<Document>> {
        let state = self.inner.read().map_err(poisoned)?;
        let Some(candidates) = state.by_key.get(&query.key()) else {
            return Ok(None);
        };
        Ok(candidates
            .iter()
            .filter_map(|id| state.docs.get(id))
            .find(|doc| query.matches(doc))
            .map(|doc| projection.apply(doc)))
    }

    fn insert(&self, mut doc: Document, key: ContentKey) -> StoreResult<DocumentId> {
        let id = DocumentId::generate();
        let id_value =
            serde_json::to_value(id).map_err(|e| StoreError::Serialization(e.to_string()))?;
        doc.insert(ID_FIELD.to_owned(), id_value);

        let mut state = self.inner.write().map_err(poisoned)?;
        state.docs.insert(id, doc);
        state.by_key.entry(key).or_default().push(id);
        state.insertion_order.push(id);
        Ok(id)
    }

    fn get(&self, id: &DocumentId) -> StoreResult<Option<Document>> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.docs.get(id).cloned())
    }

    fn find_many(&self, ids: &[DocumentId]) -> StoreResult<Vec<Document>> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(ids.iter().filter_map(|id| state.docs.get(id).cloned()).collect())
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.inner.read().map(|s| s.docs.len()).unwrap_or_default();
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &count)
            .finish()
    }
}

/// In-memory blob store.
///
/// Intended for tests and embedding. Ids are content-derived, so equal
/// bytes are held once.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.blobs.read().map_err(poisoned)?.len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> StoreResult<u64> {
        Ok(self
            .blobs
            .read()
            .map_err(poisoned)?
            .values()
            .map(|b| b.len() as u64)
            .sum())
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> StoreResult<BlobId> {
        let id = blob_id_for(bytes);
        self.blobs
            .write()
            .map_err(poisoned)?
            .insert(id, bytes.to_vec());
        Ok(id)
    }

    fn get(&self, id: &BlobId) -> StoreResult<Vec<u8>> {
        self.blobs
            .read()
            .map_err(poisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("blob {id}")))
    }

    fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        Ok(self.blobs.read().map_err(poisoned)?.contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.blobs.read().map(|b| b.len()).unwrap_or_default();
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &count)
            .finish()
    }
}

/// Read the `_id` envelope field of a stored document.
pub fn document_id(doc: &Document) -> Option<DocumentId> {
    match doc.get(ID_FIELD) {
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}
