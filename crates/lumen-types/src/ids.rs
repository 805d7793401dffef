use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Identifier of a persisted document.
///
/// A `DocumentId` is always assigned by the document store at insert time;
/// entities never choose their own. UUID v7 keeps ids roughly insertion
/// ordered, which keeps listings and on-disk layouts stable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Mint a fresh identifier. Only store backends should call this.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Simple (unhyphenated) hex form, used for file names.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Short identifier (last 8 hex characters, where v7 ids differ).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0.as_bytes()[12..])
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.short_hex())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidId(format!("{s}: {e}")))
    }
}

/// Identifier of a binary payload in the blob store.
///
/// Assigned by the blob store when a payload is written. Blob stores are
/// content-addressed, so the id is derived from the stored bytes and equal
/// payloads share an id. A channel that carries a `BlobId` is durable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(Uuid);

impl BlobId {
    /// Build an id from a digest prefix. Only blob store backends should
    /// call this.
    pub const fn from_digest(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build a deterministic id from a small integer. Handy for fixtures.
    pub const fn from_u128(n: u128) -> Self {
        Self(Uuid::from_u128(n))
    }

    /// The raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Full hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Short hex form (last 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0.as_bytes()[12..])
    }

    /// Parse from the hex form produced by [`BlobId::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidId(e.to_string()))?;
        let arr: [u8; 16] = bytes.try_into().map_err(|v: Vec<u8>| {
            TypeError::InvalidId(format!("expected 16 bytes, got {}", v.len()))
        })?;
        Ok(Self(Uuid::from_bytes(arr)))
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.short_hex())
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
