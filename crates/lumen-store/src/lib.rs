//! Store collaborators for Lumen.
//!
//! Lumen is a typed access layer, not a database: it persists entity
//! documents in a document store and large pixel payloads in a separate blob
//! store. This crate defines the two collaborator traits and ships backends
//! for both.
//!
//! # Traits
//!
//! - [`DocumentStore`] -- `find_one` by canonical query, `insert`, batch fetch
//! - [`BlobStore`] -- `put` bytes under a content-derived id, `get` them back
//!
//! # Backends
//!
//! - [`InMemoryDocumentStore`] / [`InMemoryBlobStore`] -- for tests and embedding
//! - [`FileDocumentStore`] / [`FileBlobStore`] -- one file per record on disk
//!
//! # Payloads
//!
//! [`Payload`] is a typed, shaped sample array (colour, depth, labels or
//! normals). [`BlobRefStore`] encodes payloads into a [`BlobStore`] and
//! implements the store-once rule: a payload that already has an id is not
//! written again unless forced.
//!
//! # Design Rules
//!
//! 1. Document ids are assigned by the store and blob ids derive from content;
//!    callers never choose either.
//! 2. Writes are durable before the call returns.
//! 3. Calls are blocking; there is no internal retry. Callers own retry policy.
//! 4. Transport and lock failures surface as [`StoreError::Unavailable`].

pub mod blob_ref;
pub mod error;
pub mod file;
pub mod memory;
pub mod payload;
pub mod query;
pub mod traits;

pub use blob_ref::BlobRefStore;
pub use error::{StoreError, StoreResult};
pub use file::{FileBlobStore, FileDocumentStore};
pub use memory::{document_id, InMemoryBlobStore, InMemoryDocumentStore};
pub use payload::{Payload, SampleType, Samples};
pub use query::{Projection, Query};
pub use traits::{blob_id_for, BlobStore, DocumentStore};
