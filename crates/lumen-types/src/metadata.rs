use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::float_hash::hash_opt_f64;
use crate::intrinsics::CameraIntrinsics;
use crate::transform::Transform;

/// Where the pixels came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageSourceType {
    RealWorld,
    Synthetic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentType {
    IndoorClose,
    Indoor,
    OutdoorUrban,
    OutdoorLandscape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LightingLevel {
    PitchBlack,
    Poor,
    Dim,
    EvenlyLit,
    WellLit,
    Bright,
}

/// Whether a synthetic scene was rendered with lighting at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LightingModel {
    Unlit,
    Lit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOfDay {
    Night,
    Dawn,
    Morning,
    Day,
    Afternoon,
    Twilight,
}

/// Axis-aligned box in pixel coordinates, measured from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Parse the `(x, y, width, height)` tuple form used by importers.
    pub fn from_xywh(xywh: [i64; 4]) -> Result<Self, TypeError> {
        let [x, y, w, h] = xywh;
        let conv = |v: i64| {
            i32::try_from(v).map_err(|_| TypeError::InvalidBoundingBox(format!("{xywh:?}")))
        };
        let dim = |v: i64| {
            u32::try_from(v).map_err(|_| TypeError::InvalidBoundingBox(format!("{xywh:?}")))
        };
        Ok(Self::new(conv(x)?, conv(y)?, dim(w)?, dim(h)?))
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Metadata for one labelled object visible in an image.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelledObject {
    pub class_names: Vec<String>,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub label_color: Option<[u8; 3]>,
    #[serde(default)]
    pub relative_pose: Option<Transform>,
    #[serde(default)]
    pub object_id: Option<String>,
}

impl LabelledObject {
    pub fn new<I, S>(class_names: I, bounding_box: BoundingBox) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class_names: class_names.into_iter().map(Into::into).collect(),
            bounding_box,
            label_color: None,
            relative_pose: None,
            object_id: None,
        }
    }

    pub fn with_label_color(mut self, color: [u8; 3]) -> Self {
        self.label_color = Some(color);
        self
    }

    pub fn with_relative_pose(mut self, pose: Transform) -> Self {
        self.relative_pose = Some(pose);
        self
    }

    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }
}

fn default_normal_maps() -> Option<bool> {
    Some(true)
}

/// Per-image metadata block, embedded in every image record.
///
/// Only `source_type`, `height` and `width` are required. Every other field
/// defaults when absent from a stored document, so records written before a
/// field existed still load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub source_type: ImageSourceType,
    pub height: u32,
    pub width: u32,

    #[serde(default)]
    pub environment_type: Option<EnvironmentType>,
    #[serde(default)]
    pub light_level: Option<LightingLevel>,
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,

    #[serde(default)]
    pub fov: Option<f64>,
    #[serde(default)]
    pub focal_length: Option<f64>,
    #[serde(default)]
    pub aperture: Option<f64>,
    #[serde(default)]
    pub intrinsics: Option<CameraIntrinsics>,
    #[serde(default)]
    pub right_intrinsics: Option<CameraIntrinsics>,

    // Rendering settings for synthetic images.
    #[serde(default)]
    pub simulation_world: Option<String>,
    #[serde(default)]
    pub lighting_model: Option<LightingModel>,
    #[serde(default)]
    pub texture_mipmap_bias: Option<i32>,
    #[serde(default = "default_normal_maps")]
    pub normal_maps_enabled: Option<bool>,
    #[serde(default)]
    pub roughness_enabled: Option<bool>,
    #[serde(default)]
    pub geometry_decimation: Option<i32>,
    #[serde(default)]
    pub procedural_generation_seed: Option<i64>,

    #[serde(default)]
    pub labelled_objects: Vec<LabelledObject>,
    #[serde(default)]
    pub average_scene_depth: Option<f64>,
}

impl ImageMetadata {
    /// Minimal metadata: everything optional left unset.
    pub fn new(source_type: ImageSourceType, height: u32, width: u32) -> Self {
        Self {
            source_type,
            height,
            width,
            environment_type: None,
            light_level: None,
            time_of_day: None,
            fov: None,
            focal_length: None,
            aperture: None,
            intrinsics: None,
            right_intrinsics: None,
            simulation_world: None,
            lighting_model: None,
            texture_mipmap_bias: None,
            normal_maps_enabled: default_normal_maps(),
            roughness_enabled: None,
            geometry_decimation: None,
            procedural_generation_seed: None,
            labelled_objects: Vec::new(),
            average_scene_depth: None,
        }
    }

    pub fn with_environment(
        mut self,
        environment: EnvironmentType,
        light_level: LightingLevel,
        time_of_day: TimeOfDay,
    ) -> Self {
        self.environment_type = Some(environment);
        self.light_level = Some(light_level);
        self.time_of_day = Some(time_of_day);
        self
    }

    pub fn with_intrinsics(mut self, intrinsics: CameraIntrinsics) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    pub fn with_right_intrinsics(mut self, intrinsics: CameraIntrinsics) -> Self {
        self.right_intrinsics = Some(intrinsics);
        self
    }

    pub fn with_fov(mut self, fov: f64) -> Self {
        self.fov = Some(fov);
        self
    }

    pub fn with_labelled_objects(mut self, objects: Vec<LabelledObject>) -> Self {
        self.labelled_objects = objects;
        self
    }

    pub fn with_average_scene_depth(mut self, depth: f64) -> Self {
        self.average_scene_depth = Some(depth);
        self
    }

    pub fn with_simulation_world(mut self, world: impl Into<String>) -> Self {
        self.simulation_world = Some(world.into());
        self
    }

    /// Number of pixels in one channel plane.
    pub fn pixel_count(&self) -> usize {
        self.height as usize * self.width as usize
    }
}

impl Eq for ImageMetadata {}

impl Hash for ImageMetadata {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_type.hash(state);
        self.height.hash(state);
        self.width.hash(state);
        self.environment_type.hash(state);
        self.light_level.hash(state);
        self.time_of_day.hash(state);
        hash_opt_f64(self.fov, state);
        hash_opt_f64(self.focal_length, state);
        hash_opt_f64(self.aperture, state);
        self.intrinsics.hash(state);
        self.right_intrinsics.hash(state);
        self.simulation_world.hash(state);
        self.lighting_model.hash(state);
        self.texture_mipmap_bias.hash(state);
        self.normal_maps_enabled.hash(state);
        self.roughness_enabled.hash(state);
        self.geometry_decimation.hash(state);
        self.procedural_generation_seed.hash(state);
        self.labelled_objects.hash(state);
        hash_opt_f64(self.average_scene_depth, state);
    }
}
