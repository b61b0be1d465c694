use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Payload compression applied to a leaf.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Raw little-endian element bytes.
    #[default]
    None,
    /// zstd at the given level.
    Zstd { level: i32 },
}

impl Compression {
    pub fn zstd(level: i32) -> Self {
        Self::Zstd { level }
    }

    /// Short name for listings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zstd { .. } => "zstd",
        }
    }

    /// Check the level against what the linked zstd supports.
    pub fn validate(&self) -> StoreResult<()> {
        if let Self::Zstd { level } = self {
            let range = zstd::compression_level_range();
            if !range.contains(level) {
                return Err(StoreError::Compression(format!(
                    "zstd level {level} outside {}..={}",
                    range.start(),
                    range.end()
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn compress(&self, raw: &[u8]) -> StoreResult<Vec<u8>> {
        match self {
            Self::None => Ok(raw.to_vec()),
            Self::Zstd { level } => {
                self.validate()?;
                zstd::encode_all(raw, *level).map_err(|e| StoreError::Compression(e.to_string()))
            }
        }
    }

    /// Inflate `stored`, producing at most `limit + 1` bytes so that an
    /// oversized payload shows up as a length mismatch without being
    /// expanded in full.
    pub(crate) fn decompress(&self, stored: &[u8], limit: u64) -> StoreResult<Vec<u8>> {
        match self {
            Self::None => Ok(stored.to_vec()),
            Self::Zstd { .. } => {
                let decoder = zstd::stream::read::Decoder::new(stored)
                    .map_err(|e| StoreError::Compression(e.to_string()))?;
                let mut raw = Vec::new();
                decoder
                    .take(limit.saturating_add(1))
                    .read_to_end(&mut raw)
                    .map_err(|e| StoreError::Compression(e.to_string()))?;
                Ok(raw)
            }
        }
    }
}

/// Options bag applied to every leaf created by an encode call.
///
/// The codec forwards it untouched; only the store interprets it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeafOptions {
    pub compression: Compression,
}

impl LeafOptions {
    /// Options compressing every leaf with zstd at `level`.
    pub fn compressed(level: i32) -> Self {
        Self {
            compression: Compression::zstd(level),
        }
    }
}
