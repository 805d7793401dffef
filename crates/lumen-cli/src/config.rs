use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Settings read from `lumen.toml`. Every key is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LumenConfig {
    /// Holds `docs/` and `blobs/`.
    pub data_dir: PathBuf,
    /// zstd level for blob files.
    pub compression_level: i32,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for LumenConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".lumen"),
            compression_level: 3,
            log_filter: "info".into(),
        }
    }
}

impl LumenConfig {
    /// Read `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("invalid config file {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.data_dir.join("docs")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}
