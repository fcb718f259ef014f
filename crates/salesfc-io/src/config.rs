//! Pipeline configuration files.

use crate::error::Result;
use salesfc_core::PipelineConfig;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load a JSON configuration; absent keys keep their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let config: PipelineConfig = serde_json::from_str(&text)?;
    config.validate()?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Write a configuration as pretty-printed JSON.
pub fn save_config(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<()> {
    fs::write(path.as_ref(), serde_json::to_string_pretty(config)?)?;
    Ok(())
}
