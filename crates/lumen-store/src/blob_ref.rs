use std::sync::Arc;

use lumen_types::BlobId;

use crate::error::StoreResult;
use crate::payload::Payload;
use crate::traits::BlobStore;

/// Encodes payloads into a [`BlobStore`] and decodes them back.
///
/// `store` is the only write path for channel data. A payload that already
/// carries an id is assumed durable and is returned unchanged unless the
/// caller forces a rewrite. Forcing writes the bytes again, which repairs a
/// blob lost from the backing store; the id is content-derived and does not
/// change.
#[derive(Clone)]
pub struct BlobRefStore {
    blobs: Arc<dyn BlobStore>,
}

impl BlobRefStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Persist `payload` unless `existing` is set and `force` is false.
    pub fn store(
        &self,
        payload: &Payload,
        existing: Option<BlobId>,
        force: bool,
    ) -> StoreResult<BlobId> {
        if let (Some(id), false) = (existing, force) {
            return Ok(id);
        }
        let id = self.blobs.put(&payload.encode()?)?;
        tracing::debug!(
            blob = %id.short_hex(),
            shape = ?payload.shape(),
            sample_type = %payload.sample_type(),
            forced = force,
            "blob stored"
        );
        Ok(id)
    }

    /// Read and decode the payload stored under `id`.
    ///
    /// Fails with `StoreError::NotFound` if the blob store does not know `id`.
    pub fn fetch(&self, id: BlobId) -> StoreResult<Payload> {
        let bytes = self.blobs.get(&id)?;
        let payload = Payload::decode(&bytes)?;
        tracing::trace!(blob = %id.short_hex(), samples = payload.len(), "blob fetched");
        Ok(payload)
    }

    /// Whether the blob store holds `id`.
    pub fn contains(&self, id: BlobId) -> StoreResult<bool> {
        self.blobs.exists(&id)
    }

    /// The underlying blob store.
    pub fn backend(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }
}

impl std::fmt::Debug for BlobRefStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobRefStore").finish_non_exhaustive()
    }
}
