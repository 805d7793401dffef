use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Element type of a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    U8,
    U16,
    F32,
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::F32 => write!(f, "f32"),
        }
    }
}

/// Flat sample storage, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::U8(_) => SampleType::U8,
            Self::U16(_) => SampleType::U16,
            Self::F32(_) => SampleType::F32,
        }
    }
}

/// A channel's pixel data: a shaped array of scalar samples.
///
/// Colour images are `[height, width, 3]` of `u8`; depth is `[height, width]`
/// of `f32`; labels are `[height, width]` of `u16` class ids; world normals are
/// `[height, width, 3]` of `f32`. Nothing here enforces a particular layout,
/// only that the shape accounts for every sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    shape: Vec<usize>,
    samples: Samples,
}

impl Payload {
    /// Create a payload, checking that `shape` covers exactly the samples.
    pub fn new(shape: Vec<usize>, samples: Samples) -> StoreResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != samples.len() {
            return Err(StoreError::Serialization(format!(
                "shape {shape:?} needs {expected} samples, got {}",
                samples.len()
            )));
        }
        Ok(Self { shape, samples })
    }

    /// Shorthand for an 8-bit payload.
    pub fn from_u8(shape: Vec<usize>, data: Vec<u8>) -> StoreResult<Self> {
        Self::new(shape, Samples::U8(data))
    }

    /// Shorthand for a 16-bit payload.
    pub fn from_u16(shape: Vec<usize>, data: Vec<u16>) -> StoreResult<Self> {
        Self::new(shape, Samples::U16(data))
    }

    /// Shorthand for a float payload.
    pub fn from_f32(shape: Vec<usize>, data: Vec<f32>) -> StoreResult<Self> {
        Self::new(shape, Samples::F32(data))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn sample_type(&self) -> SampleType {
        self.samples.sample_type()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(height, width)` for image-shaped payloads.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        match self.shape.as_slice() {
            [h, w] | [h, w, _] => Some((*h, *w)),
            _ => None,
        }
    }

    /// Mean of all samples as `f64`, if any.
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let sum: f64 = match &self.samples {
            Samples::U8(v) => v.iter().map(|&s| f64::from(s)).sum(),
            Samples::U16(v) => v.iter().map(|&s| f64::from(s)).sum(),
            Samples::F32(v) => v.iter().map(|&s| f64::from(s)).sum(),
        };
        Some(sum / self.len() as f64)
    }

    /// Encode for the blob store.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode bytes produced by [`Payload::encode`].
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        let payload: Self =
            bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
        // Re-check the invariant; the bytes came from outside.
        Self::new(payload.shape, payload.samples)
    }
}
