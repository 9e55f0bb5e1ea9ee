pub mod analyze;
pub mod cleanup;
pub mod config_cmd;
pub mod context;
pub mod redact;
pub mod replay;

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and parse a JSON input file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}
