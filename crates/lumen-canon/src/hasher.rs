use crate::canonical::{canonical_bytes, canonicalize, Document};
use crate::key::ContentKey;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"lumen-document-v1"`) that is
/// prepended to every hash computation, so a document and a raw payload with
/// identical bytes never share a key.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for entity documents.
    pub const DOCUMENT: Self = Self {
        domain: "lumen-document-v1",
    };
    /// Hasher for raw blob payloads.
    pub const BLOB: Self = Self {
        domain: "lumen-blob-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentKey::from_hash(*hasher.finalize().as_bytes())
    }

    /// Content key of a document, ignoring its id and the order of the
    /// named set-valued fields.
    pub fn key_of(&self, doc: &Document, unordered: &[&str]) -> ContentKey {
        self.hash(&canonical_bytes(&canonicalize(doc, unordered)))
    }
}
