//! Canonical document form and content keys for Lumen.
//!
//! Dedup-on-insert needs a single answer to "is this document already
//! stored?" that does not depend on how the document happened to be built.
//! This crate reduces a document to a canonical byte string (sorted keys,
//! envelope id removed, set-valued fields sorted) and hashes it with a
//! domain-separated BLAKE3 hasher into a [`ContentKey`].
//!
//! The canonical form doubles as the equality query sent to the document
//! store, so the query and the hash can never disagree.

pub mod canonical;
pub mod hasher;
pub mod key;

pub use canonical::{canonical_bytes, canonicalize, Document, ID_FIELD, TYPE_FIELD};
pub use hasher::ContentHasher;
pub use key::ContentKey;
