use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::float_hash::hash_f64;

/// Rigid-body camera pose: a location and a unit quaternion rotation.
///
/// The quaternion is stored `w`-first and normalised on construction and on
/// deserialization, so two transforms built from proportional quaternions
/// compare equal wherever they came from. A zero quaternion is treated as
/// the identity rotation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTransform")]
pub struct Transform {
    location: [f64; 3],
    rotation: [f64; 4],
}

/// Document shape of a [`Transform`] before its rotation is normalised.
#[derive(Deserialize)]
struct RawTransform {
    location: [f64; 3],
    rotation: [f64; 4],
}

impl From<RawTransform> for Transform {
    fn from(raw: RawTransform) -> Self {
        Self::new(raw.location, raw.rotation)
    }
}

impl Transform {
    /// Build a transform from a location and a `(w, x, y, z)` quaternion.
    pub fn new(location: [f64; 3], rotation_wxyz: [f64; 4]) -> Self {
        Self {
            location,
            rotation: normalise(rotation_wxyz),
        }
    }

    /// Build a transform from a location and an `(x, y, z, w)` quaternion.
    pub fn from_xyzw(location: [f64; 3], rotation_xyzw: [f64; 4]) -> Self {
        let [x, y, z, w] = rotation_xyzw;
        Self::new(location, [w, x, y, z])
    }

    /// A pure translation.
    pub fn from_location(location: [f64; 3]) -> Self {
        Self::new(location, [1.0, 0.0, 0.0, 0.0])
    }

    /// The identity pose.
    pub fn identity() -> Self {
        Self::from_location([0.0; 3])
    }

    pub fn location(&self) -> [f64; 3] {
        self.location
    }

    /// Rotation as `(w, x, y, z)`.
    pub fn rotation_wxyz(&self) -> [f64; 4] {
        self.rotation
    }

    /// Rotation as `(x, y, z, w)`.
    pub fn rotation_xyzw(&self) -> [f64; 4] {
        let [w, x, y, z] = self.rotation;
        [x, y, z, w]
    }

    /// Euclidean distance between the two locations.
    pub fn distance_to(&self, other: &Self) -> f64 {
        let [a, b, c] = self.location;
        let [d, e, f] = other.location;
        ((a - d).powi(2) + (b - e).powi(2) + (c - f).powi(2)).sqrt()
    }

    /// Compose a pose expressed relative to this one into the same frame as
    /// this one.
    pub fn find_independent(&self, relative: &Self) -> Self {
        let offset = rotate(self.rotation, relative.location);
        let location = [
            self.location[0] + offset[0],
            self.location[1] + offset[1],
            self.location[2] + offset[2],
        ];
        Self::new(location, quat_mul(self.rotation, relative.rotation))
    }

    /// Express `other` relative to this pose. Inverse of
    /// [`Transform::find_independent`].
    pub fn find_relative(&self, other: &Self) -> Self {
        let inverse = conjugate(self.rotation);
        let delta = [
            other.location[0] - self.location[0],
            other.location[1] - self.location[1],
            other.location[2] - self.location[2],
        ];
        Self::new(rotate(inverse, delta), quat_mul(inverse, other.rotation))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Eq for Transform {}

impl Hash for Transform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in self.location.iter().chain(self.rotation.iter()) {
            hash_f64(*v, state);
        }
    }
}

/// Squared-norm slack within which a quaternion already counts as unit.
const UNIT_TOLERANCE: f64 = 1e-12;

/// Unit quaternion with non-negative `w` and no negative zeros.
///
/// Quaternions already in that form come back unchanged, so normalising a
/// stored rotation again never moves it.
fn normalise(q: [f64; 4]) -> [f64; 4] {
    let norm_sq = q.iter().map(|v| v * v).sum::<f64>();
    if norm_sq == 0.0 || !norm_sq.is_finite() {
        return [1.0, 0.0, 0.0, 0.0];
    }
    let canonical_sign = q[0] >= 0.0 && q.iter().all(|v| *v != 0.0 || v.is_sign_positive());
    if canonical_sign && (norm_sq - 1.0).abs() <= UNIT_TOLERANCE {
        return q;
    }
    let norm = norm_sq.sqrt();
    // Keep w non-negative: q and -q are the same rotation.
    let sign = if q[0] < 0.0 { -1.0 } else { 1.0 };
    q.map(|v| sign * v / norm + 0.0)
}

fn conjugate(q: [f64; 4]) -> [f64; 4] {
    [q[0], -q[1], -q[2], -q[3]]
}

fn quat_mul(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    let [aw, ax, ay, az] = a;
    let [bw, bx, by, bz] = b;
    [
        aw * bw - ax * bx - ay * by - az * bz,
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
    ]
}

fn rotate(q: [f64; 4], v: [f64; 3]) -> [f64; 3] {
    let p = [0.0, v[0], v[1], v[2]];
    let r = quat_mul(quat_mul(q, p), conjugate(q));
    [r[1], r[2], r[3]]
}
