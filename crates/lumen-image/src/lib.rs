//! Image records for Lumen.
//!
//! An [`ImageRecord`] is one frame from a mono camera or a stereo pair. Each
//! camera has a pose and four channels (colour, depth, labels, world
//! normals); colour is mandatory and the rest are independently optional.
//! Channel payloads live in the blob store and the record's document holds
//! only their ids.
//!
//! # Channel Lifecycle
//!
//! Each channel is a [`Channel`]: `Absent`, `Stored(id)`, or `InMemory`.
//! A decoded record starts with stored channels and loads each one the first
//! time it is read. A null id in the document decodes to `Absent` and never
//! causes a fetch.

pub mod channel;
pub mod record;

pub use channel::{BlobRef, Channel, ChannelKind};
pub use record::{ImageRecord, Side, View, MONO_TAG, STEREO_TAG};

use lumen_entity::Registry;

/// Add the image entity types to `registry`.
pub fn register(registry: &mut Registry) {
    registry
        .register::<ImageRecord>()
        .register_alias::<ImageRecord>(STEREO_TAG);
}
