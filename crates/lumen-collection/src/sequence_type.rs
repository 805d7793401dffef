use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How the frames of an image source relate to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SequenceType {
    /// Frames follow a camera path and must be replayed in order.
    Sequential,
    /// Frames are independent samples.
    #[default]
    NonSequential,
}

impl SequenceType {
    /// Stored code: `"SEQ"` or `"NON"`.
    pub fn code(self) -> &'static str {
        match self {
            Self::Sequential => "SEQ",
            Self::NonSequential => "NON",
        }
    }

    /// Parse a stored code. Anything other than `"SEQ"` is non-sequential.
    pub fn from_code(code: &str) -> Self {
        if code == "SEQ" {
            Self::Sequential
        } else {
            Self::NonSequential
        }
    }
}

impl std::fmt::Display for SequenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::NonSequential => write!(f, "non-sequential"),
        }
    }
}

impl Serialize for SequenceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for SequenceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}
