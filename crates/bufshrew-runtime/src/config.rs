//! Runtime configuration

use anyhow::{Context, Result};
use bufshrew_support::DEFAULT_IMPORT_MODULE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a [`crate::BridgeRuntime`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Import module the two bridge functions are linked under.
    /// Toolchains that import host functions under another module name
    /// (e.g. `go`) can override it here.
    pub import_module: String,

    /// Upper bound on guest linear memory, in bytes. `None` leaves it unlimited.
    pub max_memory_bytes: Option<usize>,

    /// Fuel granted to each guest invocation. `None` disables fuel metering.
    pub fuel: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            import_module: DEFAULT_IMPORT_MODULE.to_string(),
            max_memory_bytes: None,
            fuel: None,
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse bridge config")
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bridge config {}", path.display()))?;
        Self::from_json_str(&json)
    }
}
