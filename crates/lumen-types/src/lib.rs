//! Foundation types for Lumen.
//!
//! This crate provides the identifiers and immutable value objects shared by
//! every other Lumen crate. Nothing here touches a store: the types are plain
//! data whose equality, hashing, and serialization are pure functions of
//! their field values, so they can be used as set members and as dedup keys.
//!
//! # Key Types
//!
//! - [`DocumentId`] -- Store-assigned identifier of a persisted document
//! - [`BlobId`] -- Content-derived identifier of a binary payload
//! - [`Timestamp`] -- Totally ordered frame timestamp (seconds or ordinal index)
//! - [`Transform`] -- Camera pose: location plus unit quaternion
//! - [`CameraIntrinsics`] -- Normalised pinhole intrinsics
//! - [`ImageMetadata`] -- Per-image metadata block
//! - [`LabelledObject`] -- Per-object label inside an image

pub mod error;
pub mod ids;
pub mod intrinsics;
pub mod metadata;
pub mod timestamp;
pub mod transform;

mod float_hash;

pub use error::TypeError;
pub use ids::{BlobId, DocumentId};
pub use intrinsics::CameraIntrinsics;
pub use metadata::{
    BoundingBox, EnvironmentType, ImageMetadata, ImageSourceType, LabelledObject, LightingLevel,
    LightingModel, TimeOfDay,
};
pub use timestamp::Timestamp;
pub use transform::Transform;
