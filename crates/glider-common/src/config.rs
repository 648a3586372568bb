//! Decoder bounds.
//!
//! Every length read off the wire is checked against one of these limits
//! before anything is allocated for it.

use crate::error::ProtocolError;
use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_MAX_STRING_LENGTH: usize = 32767;
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 65536;
/// 2^21 - 1, the largest length a 3-byte varint prefix can carry.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 2097151;
pub const DEFAULT_MAX_NBT_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecLimits {
    /// Maximum string length in characters.
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,

    /// Maximum element count of any length-prefixed collection.
    #[serde(default = "default_max_array_length")]
    pub max_array_length: usize,

    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: usize,

    #[serde(default = "default_max_nbt_depth")]
    pub max_nbt_depth: usize,
}

fn default_max_string_length() -> usize {
    DEFAULT_MAX_STRING_LENGTH
}

fn default_max_array_length() -> usize {
    DEFAULT_MAX_ARRAY_LENGTH
}

fn default_max_frame_length() -> usize {
    DEFAULT_MAX_FRAME_LENGTH
}

fn default_max_nbt_depth() -> usize {
    DEFAULT_MAX_NBT_DEPTH
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            max_nbt_depth: DEFAULT_MAX_NBT_DEPTH,
        }
    }
}

impl CodecLimits {
    pub fn from_json(content: &str) -> Result<Self> {
        let limits: CodecLimits = serde_json::from_str(content)
            .map_err(|e| ProtocolError::Config(format!("Failed to parse limits: {e}")))?;
        limits.validate()?;
        Ok(limits)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ProtocolError::Config(format!(
                "Failed to read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_string_length == 0 || self.max_array_length == 0 || self.max_frame_length == 0
        {
            return Err(ProtocolError::Config(
                "limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
