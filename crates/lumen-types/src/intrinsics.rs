use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::float_hash::hash_f64;

/// Pinhole camera intrinsics, normalised by image width and height.
///
/// Normalising makes the intrinsics independent of the stored resolution:
/// `fx` and `cx` are fractions of the image width, `fy` and `cy` of its
/// height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Normalise pixel-unit intrinsics for an image of the given size.
    pub fn from_pixels(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        let w = f64::from(width.max(1));
        let h = f64::from(height.max(1));
        Self::new(fx / w, fy / h, cx / w, cy / h)
    }

    /// Focal length in pixels for an image `width` pixels wide.
    pub fn fx_pixels(&self, width: u32) -> f64 {
        self.fx * f64::from(width)
    }

    /// Focal length in pixels for an image `height` pixels high.
    pub fn fy_pixels(&self, height: u32) -> f64 {
        self.fy * f64::from(height)
    }

    /// Horizontal field of view in radians.
    pub fn horizontal_fov(&self) -> f64 {
        let widest = self.cx.max(1.0 - self.cx);
        2.0 * widest.atan2(self.fx)
    }
}

impl Eq for CameraIntrinsics {}

impl Hash for CameraIntrinsics {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in [self.fx, self.fy, self.cx, self.cy] {
            hash_f64(v, state);
        }
    }
}
