use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Key of a frame inside an image collection or sequence.
///
/// Either a capture time in seconds or a plain ordinal index. Timestamps are
/// totally ordered so aggregates can keep their members in a sorted map and
/// replay them in ascending order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(OrderedFloat<f64>);

impl Timestamp {
    /// The first key handed out by builders when no timestamp is supplied.
    pub const ZERO: Self = Self(OrderedFloat(0.0));

    /// Create a timestamp from seconds. NaN and infinities are rejected.
    pub fn new(seconds: f64) -> Result<Self, TypeError> {
        if !seconds.is_finite() {
            return Err(TypeError::InvalidTimestamp(seconds.to_string()));
        }
        // Collapse -0.0 so equal keys hash and serialize identically.
        Ok(Self(OrderedFloat(seconds + 0.0)))
    }

    /// Timestamp for an ordinal frame index.
    pub fn from_index(index: u32) -> Self {
        Self(OrderedFloat(f64::from(index)))
    }

    /// The raw value in seconds.
    pub fn as_secs(&self) -> f64 {
        self.0 .0
    }

    /// The next implicit key after this one.
    pub fn next(&self) -> Self {
        Self(OrderedFloat(self.0 .0.floor() + 1.0))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.as_secs())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_secs())
    }
}

impl TryFrom<f64> for Timestamp {
    type Error = TypeError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
