//! Ledger verification.
//!
//! The verifier replays a ledger from genesis and checks every block
//! independently. A failed check is recorded and the scan continues, so a
//! single report lists every defect in the ledger.

use crate::block::compute_block_hash;
use crate::digest::Hash256;
use crate::error::Result;
use crate::merkle::merkle_root;
use crate::policy::{AcceptancePolicy, PubkeyRegistry, RegistryCheck};
use crate::signature::{verify_signature, SignatureError};
use crate::store::LedgerStore;
use crate::types::Block;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Which rule a defect breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefectCategory {
    /// Index continuity, hash chain, Merkle root or block hash.
    InvariantViolation,
    /// A signature that does not verify.
    SignatureFailure,
    /// Too few counted signatures for the acceptance policy.
    PolicyFailure,
}

fn opt_hash(hash: &Option<Hash256>) -> String {
    match hash {
        Some(h) => h.to_hex(),
        None => "null".to_string(),
    }
}

fn opt_index(index: &Option<u64>) -> String {
    match index {
        Some(i) => i.to_string(),
        None => "start".to_string(),
    }
}

/// A single verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefectKind {
    #[error("index jump: {found} after {}", opt_index(.previous))]
    IndexJump { previous: Option<u64>, found: u64 },

    #[error("prev_hash mismatch: expected {}, found {}", opt_hash(.expected), opt_hash(.found))]
    PrevHashMismatch {
        expected: Option<Hash256>,
        found: Option<Hash256>,
    },

    #[error("block records no files")]
    NoFiles,

    #[error("merkle_root mismatch: computed {computed}, stored {stored}")]
    MerkleRootMismatch { computed: Hash256, stored: Hash256 },

    #[error("block_hash mismatch: computed {computed}, stored {stored}")]
    BlockHashMismatch { computed: Hash256, stored: Hash256 },

    #[error("block_hash cannot be recomputed: {0}")]
    Unencodable(String),

    #[error("no signatures")]
    NoSignatures,

    #[error("bad signature from '{signer}': {reason}")]
    BadSignature {
        signer: String,
        reason: SignatureError,
    },

    #[error("signature threshold not met: {valid}/{required} valid")]
    ThresholdNotMet { valid: usize, required: usize },
}

impl DefectKind {
    pub fn category(&self) -> DefectCategory {
        match self {
            DefectKind::IndexJump { .. }
            | DefectKind::PrevHashMismatch { .. }
            | DefectKind::NoFiles
            | DefectKind::MerkleRootMismatch { .. }
            | DefectKind::BlockHashMismatch { .. }
            | DefectKind::Unencodable(_) => DefectCategory::InvariantViolation,
            DefectKind::NoSignatures | DefectKind::BadSignature { .. } => {
                DefectCategory::SignatureFailure
            }
            DefectKind::ThresholdNotMet { .. } => DefectCategory::PolicyFailure,
        }
    }
}

/// A defect located in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defect {
    /// 0-based position of the block in the ledger
    pub position: usize,
    /// The block's declared index
    pub index: u64,
    pub kind: DefectKind,
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {}: {}", self.index, self.kind)
    }
}

/// Advisory findings. They never change the accept/reject outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Embedded key differs from every registered key for the signer
    RegistryMismatch { signer: String },
    /// Signer has no registry entry
    Unregistered { signer: String },
    /// Signer is outside the allowlist; signature not counted
    SignerNotAllowed { signer: String },
    /// More than one signature under the same signer name
    DuplicateSigner { signer: String },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::RegistryMismatch { signer } => {
                write!(f, "pubkey mismatch for signer '{signer}' against registry")
            }
            WarningKind::Unregistered { signer } => {
                write!(f, "signer '{signer}' not in pubkey registry")
            }
            WarningKind::SignerNotAllowed { signer } => {
                write!(f, "signer '{signer}' not in allowed_signers")
            }
            WarningKind::DuplicateSigner { signer } => {
                write!(f, "signer '{signer}' appears more than once")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub index: u64,
    pub kind: WarningKind,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {}: {}", self.index, self.kind)
    }
}

/// Outcome of verifying a whole ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub policy: &'static str,
    pub blocks_checked: usize,
    pub defects: Vec<Defect>,
    pub warnings: Vec<Warning>,
}

impl VerificationReport {
    pub fn accepted(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn defects_at(&self, index: u64) -> impl Iterator<Item = &Defect> {
        self.defects.iter().filter(move |d| d.index == index)
    }

    pub fn count(&self, category: DefectCategory) -> usize {
        self.defects
            .iter()
            .filter(|d| d.kind.category() == category)
            .count()
    }
}

/// Replays a ledger under an acceptance policy.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    policy: AcceptancePolicy,
    registry: Option<PubkeyRegistry>,
}

/// Running state carried from one block to the next.
#[derive(Debug, Default)]
struct ScanState {
    prev_hash: Option<Hash256>,
    prev_index: Option<u64>,
}

impl Verifier {
    pub fn new(policy: AcceptancePolicy) -> Self {
        Self {
            policy,
            registry: None,
        }
    }

    /// Cross-check embedded keys against `registry`, producing warnings only.
    pub fn with_registry(mut self, registry: PubkeyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    /// Load every block from `store` and verify them.
    ///
    /// Only input errors (missing store, malformed record) are returned as
    /// `Err`; ledger defects are reported in the [`VerificationReport`].
    pub fn verify_store<S: LedgerStore + ?Sized>(&self, store: &S) -> Result<VerificationReport> {
        let blocks = store.load_all()?;
        Ok(self.verify_blocks(&blocks))
    }

    /// Verify blocks in the given order.
    pub fn verify_blocks(&self, blocks: &[Block]) -> VerificationReport {
        let mut report = VerificationReport {
            policy: self.policy.name(),
            blocks_checked: 0,
            defects: Vec::new(),
            warnings: Vec::new(),
        };
        let mut state = ScanState::default();

        for (position, block) in blocks.iter().enumerate() {
            debug!(position, index = block.index, "checking block");
            let mut defects = Vec::new();
            let mut warnings = Vec::new();

            self.check_links(block, &state, &mut defects);
            self.check_contents(block, &mut defects);
            self.check_signatures(block, &mut defects, &mut warnings);

            for kind in defects {
                warn!(index = block.index, category = ?kind.category(), "{kind}");
                report.defects.push(Defect {
                    position,
                    index: block.index,
                    kind,
                });
            }
            for kind in warnings {
                warn!(index = block.index, advisory = true, "{kind}");
                report.warnings.push(Warning {
                    index: block.index,
                    kind,
                });
            }

            state.prev_hash = Some(block.block_hash);
            state.prev_index = Some(block.index);
            report.blocks_checked += 1;
        }

        debug!(
            blocks = report.blocks_checked,
            defects = report.defects.len(),
            accepted = report.accepted(),
            "verification finished"
        );
        report
    }

    fn check_links(&self, block: &Block, state: &ScanState, defects: &mut Vec<DefectKind>) {
        let expected_index = state.prev_index.map_or(0, |i| i.wrapping_add(1));
        if block.index != expected_index {
            defects.push(DefectKind::IndexJump {
                previous: state.prev_index,
                found: block.index,
            });
        }
        if block.prev_hash != state.prev_hash {
            defects.push(DefectKind::PrevHashMismatch {
                expected: state.prev_hash,
                found: block.prev_hash,
            });
        }
    }

    fn check_contents(&self, block: &Block, defects: &mut Vec<DefectKind>) {
        if block.files.is_empty() {
            defects.push(DefectKind::NoFiles);
        }

        let computed = merkle_root(&block.leaves());
        if computed != block.merkle_root {
            defects.push(DefectKind::MerkleRootMismatch {
                computed,
                stored: block.merkle_root,
            });
        }

        match compute_block_hash(block) {
            Ok(computed) if computed != block.block_hash => {
                defects.push(DefectKind::BlockHashMismatch {
                    computed,
                    stored: block.block_hash,
                });
            }
            Ok(_) => {}
            Err(err) => defects.push(DefectKind::Unencodable(err.to_string())),
        }
    }

    fn check_signatures(
        &self,
        block: &Block,
        defects: &mut Vec<DefectKind>,
        warnings: &mut Vec<WarningKind>,
    ) {
        if block.signatures.is_empty() {
            defects.push(DefectKind::NoSignatures);
            return;
        }

        let mut seen = BTreeSet::new();
        let mut counted = BTreeSet::new();

        for sig in &block.signatures {
            let signer = sig.signer.as_str();
            if !seen.insert(signer) {
                warnings.push(WarningKind::DuplicateSigner {
                    signer: signer.to_string(),
                });
            }

            if let Some(registry) = &self.registry {
                match registry.check(signer, &sig.pubkey) {
                    RegistryCheck::Match => {}
                    RegistryCheck::Mismatch => warnings.push(WarningKind::RegistryMismatch {
                        signer: signer.to_string(),
                    }),
                    RegistryCheck::Unregistered => warnings.push(WarningKind::Unregistered {
                        signer: signer.to_string(),
                    }),
                }
            }

            // Signatures outside the allowlist are neither counted nor checked.
            if !self.policy.counts(signer) {
                warnings.push(WarningKind::SignerNotAllowed {
                    signer: signer.to_string(),
                });
                continue;
            }

            match verify_signature(&block.block_hash, sig) {
                Ok(()) => {
                    counted.insert(signer);
                }
                Err(reason) => defects.push(DefectKind::BadSignature {
                    signer: signer.to_string(),
                    reason,
                }),
            }
        }

        let required = self.policy.required();
        if counted.len() < required {
            defects.push(DefectKind::ThresholdNotMet {
                valid: counted.len(),
                required,
            });
        }
    }
}
