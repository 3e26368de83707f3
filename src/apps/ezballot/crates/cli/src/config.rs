use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ezballot_core::GenesisConfig;

/// Settings read from `ezballot.toml`. Every field can be overridden on the command line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Where the ledger snapshot lives
    pub state_path: PathBuf,

    /// Default log level for the ezballot crates
    pub log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("ledger.json"),
            log_level: "info".to_string(),
        }
    }
}

impl CliConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Read a genesis file, TOML or JSON depending on the extension.
pub fn load_genesis(path: &Path) -> Result<GenesisConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read genesis file {}", path.display()))?;

    let genesis = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("invalid genesis JSON in {}", path.display()))?,
        _ => toml::from_str(&content)
            .with_context(|| format!("invalid genesis TOML in {}", path.display()))?,
    };

    Ok(genesis)
}
