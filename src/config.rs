//! Engine configuration
//!
//! Backing-store policy, persisted as JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Row span alignment in pixels for new [`MemBitmap`](crate::MemBitmap)s.
    /// Rounded down to a power of two, at most 16; 0 or 1 disables padding.
    pub line_align: u32,
    /// Growth over-allocates by `requested / growth_divisor` (0 disables)
    pub growth_divisor: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            line_align: 0,
            growth_divisor: 4,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save config to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("loaded engine config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
