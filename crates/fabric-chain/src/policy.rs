//! Acceptance policies and the advisory pubkey registry.

use crate::error::{ChainError, Result};
use crate::types::b64_fixed;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

fn default_threshold() -> u32 {
    1
}

/// Threshold policy document: `{"allowed_signers": [...], "threshold": n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Signer names whose signatures count; empty means any name counts
    #[serde(default)]
    pub allowed_signers: BTreeSet<String>,

    /// Minimum number of valid signatures from allowed signers (default: 1)
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_signers: BTreeSet::new(),
            threshold: default_threshold(),
        }
    }
}

impl Policy {
    pub fn new<I, S>(allowed_signers: I, threshold: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_signers: allowed_signers.into_iter().map(Into::into).collect(),
            threshold,
        }
    }

    /// Load and validate a policy file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| ChainError::io(path, err))?;
        Self::parse(&text).map_err(|reason| ChainError::MalformedPolicy {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse and validate policy JSON.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let policy: Policy = serde_json::from_str(text).map_err(|err| err.to_string())?;
        if policy.threshold == 0 {
            return Err("threshold must be at least 1".to_string());
        }
        Ok(policy)
    }

    /// Whether signatures from `signer` count toward the threshold.
    pub fn allows(&self, signer: &str) -> bool {
        self.allowed_signers.is_empty() || self.allowed_signers.contains(signer)
    }
}

/// How the verifier decides whether a block's signatures are sufficient.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AcceptancePolicy {
    /// At least one valid signature from any signer.
    #[default]
    Basic,
    /// At least `threshold` valid signatures from allowed signers.
    Threshold(Policy),
}

impl AcceptancePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            AcceptancePolicy::Basic => "basic",
            AcceptancePolicy::Threshold(_) => "threshold",
        }
    }

    /// Number of counted valid signatures a block needs.
    pub fn required(&self) -> usize {
        match self {
            AcceptancePolicy::Basic => 1,
            AcceptancePolicy::Threshold(policy) => policy.threshold as usize,
        }
    }

    /// Whether a valid signature from `signer` is counted.
    pub fn counts(&self, signer: &str) -> bool {
        match self {
            AcceptancePolicy::Basic => true,
            AcceptancePolicy::Threshold(policy) => policy.allows(signer),
        }
    }
}

/// Registry entry: one key or a list of acceptable keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RegistryEntry {
    One(String),
    Many(Vec<String>),
}

/// Outcome of checking an embedded key against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryCheck {
    Match,
    Mismatch,
    Unregistered,
}

/// Known-good public keys per signer name. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PubkeyRegistry {
    keys: BTreeMap<String, Vec<[u8; 32]>>,
}

impl PubkeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry file. A missing file yields an empty registry.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| ChainError::io(path, err))?;
        Self::parse(&text).map_err(|reason| ChainError::MalformedRegistry {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse `{"name": "<b64>"}` or `{"name": ["<b64>", ...]}`.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let raw: BTreeMap<String, RegistryEntry> =
            serde_json::from_str(text).map_err(|err| err.to_string())?;
        let mut keys = BTreeMap::new();
        for (signer, entry) in raw {
            let encoded = match entry {
                RegistryEntry::One(key) => vec![key],
                RegistryEntry::Many(list) => list,
            };
            let decoded = encoded
                .iter()
                .map(|k| b64_fixed::decode::<32>(k).map_err(|err| format!("{signer}: {err}")))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            keys.insert(signer, decoded);
        }
        Ok(Self { keys })
    }

    /// Write the registry as pretty JSON with sorted names.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.stage(path)?.commit()
    }

    /// Write the registry beside `path` without replacing it yet.
    ///
    /// The returned [`StagedRegistry`] must be committed to take effect, so a
    /// caller can finish other writes first and drop the staged copy if any
    /// of them fail.
    pub fn stage(&self, path: &Path) -> Result<StagedRegistry> {
        let raw: BTreeMap<&str, RegistryEntry> = self
            .keys
            .iter()
            .map(|(signer, keys)| {
                let entry = match keys.as_slice() {
                    [single] => RegistryEntry::One(b64_fixed::encode(single)),
                    many => RegistryEntry::Many(many.iter().map(|k| b64_fixed::encode(k)).collect()),
                };
                (signer.as_str(), entry)
            })
            .collect();
        let json = serde_json::to_string_pretty(&raw)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| ChainError::io(parent, err))?;
            }
        }
        let mut staged = path.as_os_str().to_owned();
        staged.push(".tmp");
        let staged = PathBuf::from(staged);
        fs::write(&staged, json).map_err(|err| ChainError::io(&staged, err))?;
        Ok(StagedRegistry {
            staged,
            target: path.to_path_buf(),
        })
    }

    /// Record `pubkey` as the sole known key for `signer`.
    pub fn register(&mut self, signer: &str, pubkey: [u8; 32]) {
        self.keys.insert(signer.to_string(), vec![pubkey]);
    }

    pub fn keys_for(&self, signer: &str) -> Option<&[[u8; 32]]> {
        self.keys.get(signer).map(Vec::as_slice)
    }

    pub fn check(&self, signer: &str, pubkey: &[u8; 32]) -> RegistryCheck {
        match self.keys.get(signer) {
            None => RegistryCheck::Unregistered,
            Some(known) if known.contains(pubkey) => RegistryCheck::Match,
            Some(_) => RegistryCheck::Mismatch,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

/// A registry written to a sibling temporary file, pending [`commit`].
///
/// Dropping it without committing removes the temporary file.
///
/// [`commit`]: StagedRegistry::commit
#[derive(Debug)]
pub struct StagedRegistry {
    staged: PathBuf,
    target: PathBuf,
}

impl StagedRegistry {
    /// Move the staged file over the registry path.
    pub fn commit(self) -> Result<()> {
        fs::rename(&self.staged, &self.target).map_err(|err| ChainError::io(&self.target, err))
    }
}

impl Drop for StagedRegistry {
    fn drop(&mut self) {
        // Already gone after a successful commit.
        let _ = fs::remove_file(&self.staged);
    }
}
