//! Image collections and sequences for Lumen.
//!
//! Both aggregates own a timestamp-keyed set of [`ImageRecord`]s, stored by
//! reference. An [`ImageCollection`] allows random access by timestamp; an
//! [`ImageSequence`] is replayed in ascending timestamp order through a
//! [`Cursor`]. Both implement [`ImageSource`].
//!
//! # Capability Flags
//!
//! Depth, labels, normals, stereo and bounding-box availability are derived
//! once, when the aggregate is built, from every member. A flag is set only
//! if every member has it, so an empty aggregate reports none.
//!
//! # Building
//!
//! Importers add images to a [`CollectionBuilder`] and call `save`, which
//! writes member payloads, then member documents, then the aggregate. Every
//! step deduplicates, so importing the same data twice returns the same ids.

pub mod builder;
pub mod capabilities;
pub mod collection;
pub mod cursor;
mod members;
pub mod sequence;
pub mod sequence_type;
pub mod source;

#[cfg(test)]
mod testing;

pub use builder::CollectionBuilder;
pub use capabilities::Capabilities;
pub use collection::ImageCollection;
pub use cursor::Cursor;
pub use sequence::ImageSequence;
pub use sequence_type::SequenceType;
pub use source::ImageSource;

use lumen_entity::{EntityError, EntityResult, Registry, Resolver};
use lumen_types::DocumentId;

/// Add the image and aggregate entity types to `registry`.
pub fn register(registry: &mut Registry) {
    lumen_image::register(registry);
    registry
        .register::<ImageCollection>()
        .register::<ImageSequence>();
}

/// A registry holding every Lumen entity type.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    register(&mut registry);
    registry
}

/// Load a stored aggregate of either kind.
pub fn resolve_source(resolver: &Resolver, id: &DocumentId) -> EntityResult<Box<dyn ImageSource>> {
    let entity = resolver.resolve(id)?;
    let found = entity.type_tag();
    let entity = match entity.into_any().downcast::<ImageCollection>() {
        Ok(collection) => return Ok(collection as Box<dyn ImageSource>),
        Err(other) => other,
    };
    match entity.downcast::<ImageSequence>() {
        Ok(sequence) => Ok(sequence as Box<dyn ImageSource>),
        Err(_) => Err(EntityError::TypeMismatch {
            expected: format!("{} or {}", ImageCollection::TAG, ImageSequence::TAG),
            found: found.to_owned(),
        }),
    }
}
