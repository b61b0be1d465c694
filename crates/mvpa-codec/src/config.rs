use std::path::Path;

use mvpa_store::LeafOptions;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// Default nesting limit for encode and decode.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Settings shared by encode, decode and the save/load entry points.
///
/// ```toml
/// max_depth = 128
///
/// [leaf]
/// compression = { zstd = { level = 3 } }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Deepest nesting accepted before failing with `DepthExceeded`.
    pub max_depth: usize,
    /// Forwarded untouched to every leaf the encoder creates.
    pub leaf: LeafOptions,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            leaf: LeafOptions::default(),
        }
    }
}

impl CodecConfig {
    pub fn from_toml_str(s: &str) -> CodecResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| CodecError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> CodecResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CodecError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> CodecResult<()> {
        if self.max_depth == 0 {
            return Err(CodecError::Config("max_depth must be at least 1".into()));
        }
        self.leaf
            .compression
            .validate()
            .map_err(|e| CodecError::Config(e.to_string()))
    }
}
