//! Ledger subcommands.

pub mod block;
pub mod cosign;
pub mod log;
pub mod verify;

use anyhow::{Context, Result};
use fabric_chain::ChainConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve the ledger layout from `--config` or `--root`.
pub fn resolve_config(root: &Path, config: Option<&Path>) -> Result<ChainConfig> {
    let resolved = match config {
        Some(path) => ChainConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ChainConfig::from_root(root),
    };
    debug!(
        ledger = %resolved.ledger_path.display(),
        keys = %resolved.keys_dir.display(),
        "resolved ledger layout"
    );
    Ok(resolved)
}

/// Apply a `--ledger` override.
pub fn with_ledger(mut config: ChainConfig, ledger: Option<PathBuf>) -> ChainConfig {
    if let Some(path) = ledger {
        config.ledger_path = path;
    }
    config
}
