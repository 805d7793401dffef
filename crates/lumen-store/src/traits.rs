use lumen_canon::{ContentHasher, ContentKey, Document};
use lumen_types::{BlobId, DocumentId};

use crate::error::StoreResult;
use crate::query::{Projection, Query};

/// Document store holding entity documents.
///
/// All implementations must satisfy these invariants:
/// - Ids are assigned by the store on `insert` and written into the stored
///   document's `_id` field.
/// - Writes are durable before `insert` returns.
/// - Connectivity or lock failures are reported as `StoreError::Unavailable`
///   and never retried internally.
///
/// `find_one` followed by `insert` is not atomic. Two writers inserting the
/// same content concurrently can both miss and both insert.
pub trait DocumentStore: Send + Sync {
    /// Return one stored document satisfying `query`, if any.
    fn find_one(&self, query: &Query, projection: Projection) -> StoreResult<Option<Document>>;

    /// Insert a document and return its newly assigned id.
    ///
    /// `key` is the content key of the document's canonical form; backends
    /// use it to index documents for `find_one`.
    fn insert(&self, doc: Document, key: ContentKey) -> StoreResult<DocumentId>;

    /// Fetch a document by id. `Ok(None)` if it does not exist.
    fn get(&self, id: &DocumentId) -> StoreResult<Option<Document>>;

    /// Fetch many documents by id, skipping ids that do not exist.
    ///
    /// Default implementation calls `get()` for each id. Backends may
    /// override for fewer round-trips.
    fn find_many(&self, ids: &[DocumentId]) -> StoreResult<Vec<Document>> {
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get(id)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    /// How many of `ids` exist in the store.
    fn count_existing(&self, ids: &[DocumentId]) -> StoreResult<usize> {
        let mut count = 0;
        for id in ids {
            if self.get(id)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Blob store holding large binary payloads.
///
/// Blob stores are content-addressed: `put` returns [`blob_id_for`] of the
/// bytes, so writing the same bytes twice yields the same id.
pub trait BlobStore: Send + Sync {
    /// Write bytes and return their id. Durable on return.
    fn put(&self, bytes: &[u8]) -> StoreResult<BlobId>;

    /// Read the bytes stored under `id`.
    ///
    /// Fails with `StoreError::NotFound` if the id is unknown.
    fn get(&self, id: &BlobId) -> StoreResult<Vec<u8>>;

    /// Check whether a blob exists.
    fn exists(&self, id: &BlobId) -> StoreResult<bool>;
}

/// Content-derived blob id: the first 16 bytes of the domain-separated
/// BLAKE3 digest of `bytes`.
pub fn blob_id_for(bytes: &[u8]) -> BlobId {
    let key = ContentHasher::BLOB.hash(bytes);
    let mut prefix = [0u8; 16];
    prefix.copy_from_slice(&key.as_bytes()[..16]);
    BlobId::from_digest(prefix)
}

impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    fn find_one(&self, query: &Query, projection: Projection) -> StoreResult<Option<Document>> {
        (**self).find_one(query, projection)
    }

    fn insert(&self, doc: Document, key: ContentKey) -> StoreResult<DocumentId> {
        (**self).insert(doc, key)
    }

    fn get(&self, id: &DocumentId) -> StoreResult<Option<Document>> {
        (**self).get(id)
    }

    fn find_many(&self, ids: &[DocumentId]) -> StoreResult<Vec<Document>> {
        (**self).find_many(ids)
    }

    fn count_existing(&self, ids: &[DocumentId]) -> StoreResult<usize> {
        (**self).count_existing(ids)
    }
}

impl<T: BlobStore + ?Sized> BlobStore for std::sync::Arc<T> {
    fn put(&self, bytes: &[u8]) -> StoreResult<BlobId> {
        (**self).put(bytes)
    }

    fn get(&self, id: &BlobId) -> StoreResult<Vec<u8>> {
        (**self).get(id)
    }

    fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        (**self).exists(id)
    }
}
