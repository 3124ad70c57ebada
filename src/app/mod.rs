pub mod pipeline;
pub mod runner;
pub mod shutdown;

pub use pipeline::{Pipeline, PipelineFrame};
pub use runner::{run_headless, run_realtime, RunMode, RunSummary};
pub use shutdown::ShutdownManager;

use anyhow::{Context, Result};
use sandpulse_core::SimConfig;
use std::path::Path;

/// Reads `path` as TOML, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(SimConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = SimConfig::from_toml(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}
