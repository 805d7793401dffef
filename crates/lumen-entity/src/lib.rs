//! Entity persistence for Lumen.
//!
//! An entity is a record that is serialized to a type-tagged document,
//! deduplicated against the document store on first save, and later rebuilt
//! from its document by dispatching on the tag.
//!
//! # Key Types
//!
//! - [`Entity`] -- identity, serialization, and `save`
//! - [`EntityType`] -- a concrete type with a registry tag and a deserializer
//! - [`Registry`] -- open tag-to-deserializer map, filled at startup
//! - [`Resolver`] -- fetches documents and decodes them through the registry
//! - [`save_or_get`] -- dedup-on-insert over the canonical document form
//!
//! # Document Envelope
//!
//! Every entity document carries `_type` and, once persisted, `_id`.
//! Referenced entities are stored by id, never embedded.

pub mod document;
pub mod entity;
pub mod error;
pub mod persist;
pub mod registry;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use entity::{Entity, EntityType};
pub use error::{EntityError, EntityResult};
pub use persist::save_or_get;
pub use registry::{DeserializeFn, Registry};
pub use resolver::Resolver;
