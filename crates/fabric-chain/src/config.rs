//! Filesystem locations of the ledger and its companion files.

use crate::error::{ChainError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a ledger and its inputs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub ledger_path: PathBuf,
    pub keys_dir: PathBuf,
    pub policy_path: PathBuf,
    pub pubkeys_path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    paths: PathsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsSection {
    ledger: Option<PathBuf>,
    keys: Option<PathBuf>,
    policy: Option<PathBuf>,
    pubkeys: Option<PathBuf>,
}

impl ChainConfig {
    /// Conventional layout under `root/chain/`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let chain = root.as_ref().join("chain");
        Self {
            ledger_path: chain.join("CHAIN.jsonl"),
            keys_dir: chain.join("keys"),
            policy_path: chain.join("policy.json"),
            pubkeys_path: chain.join("pubkeys.json"),
        }
    }

    /// Load a TOML config; relative paths resolve against its directory.
    ///
    /// ```toml
    /// [paths]
    /// ledger = "ledger/CHAIN.jsonl"
    /// keys = "/secure/keys"
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| ChainError::io(path, err))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base).map_err(|reason| ChainError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse TOML config text, resolving relative paths against `base`.
    pub fn parse(text: &str, base: &Path) -> std::result::Result<Self, String> {
        let file: ConfigFile = toml::from_str(text).map_err(|err| err.to_string())?;
        let defaults = Self::from_root(base);
        let resolve = |value: Option<PathBuf>, default: PathBuf| match value {
            Some(p) if p.is_absolute() => p,
            Some(p) => base.join(p),
            None => default,
        };
        let paths = file.paths;
        Ok(Self {
            ledger_path: resolve(paths.ledger, defaults.ledger_path),
            keys_dir: resolve(paths.keys, defaults.keys_dir),
            policy_path: resolve(paths.policy, defaults.policy_path),
            pubkeys_path: resolve(paths.pubkeys, defaults.pubkeys_path),
        })
    }
}
