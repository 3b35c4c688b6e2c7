use crate::frame::SaveMode;
use odbcframe_native::{BindOptions, DecodeOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest `SQLGetData` buffer worth a round trip.
pub const MIN_CHUNK_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameOptions {
    pub bind: BindOptions,
    pub decode: DecodeOptions,
    /// Mode used by `write_table` callers that do not pick one.
    pub save_mode: SaveMode,
}

impl FrameOptions {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let options: Self = toml::from_str(contents)?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.decode.chunk_size < MIN_CHUNK_SIZE {
            return Err(anyhow::anyhow!(format!(
                "decode.chunk_size must be at least {MIN_CHUNK_SIZE}, got {}",
                self.decode.chunk_size
            )));
        }
        // Wide characters are two bytes; an odd chunk would split one.
        if self.decode.chunk_size % 2 != 0 {
            return Err(anyhow::anyhow!(format!(
                "decode.chunk_size must be even, got {}",
                self.decode.chunk_size
            )));
        }
        if self.bind.max_variable_stride < 2 {
            return Err(anyhow::anyhow!("bind.max_variable_stride must be at least 2"));
        }
        Ok(())
    }
}
