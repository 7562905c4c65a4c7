//! Tamper-evident, append-only ledger of file-provenance blocks.
//!
//! Each block records a batch of files by SHA-256, folds their digests into a
//! Merkle root, links to its predecessor by hash, and carries one or more
//! Ed25519 signatures over its block hash. The [`Verifier`] replays a ledger
//! from genesis and reports every broken invariant.
//!
//! # Example
//!
//! ```
//! use ed25519_dalek::SigningKey;
//! use fabric_chain::{AcceptancePolicy, ChainBuilderExt, MemoryLedger, Policy, Verifier};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = dir.path().join("report.pdf");
//! std::fs::write(&file, b"contents").unwrap();
//!
//! let alice = SigningKey::from_bytes(&[1; 32]);
//! let bob = SigningKey::from_bytes(&[2; 32]);
//!
//! let mut ledger = MemoryLedger::new();
//! let block = ledger.append_signed("alice", &alice, "quarterly report", &[&file]).unwrap();
//! ledger.co_sign_block("bob", &bob, Some(block.index)).unwrap();
//!
//! let policy = AcceptancePolicy::Threshold(Policy::new(["alice", "bob"], 2));
//! let report = Verifier::new(policy).verify_store(&ledger).unwrap();
//! assert!(report.accepted());
//! ```

mod block;
mod builder;
mod canonical;
mod config;
mod digest;
mod error;
mod keys;
mod merkle;
mod policy;
mod signature;
mod store;
mod types;
mod verify;

pub use block::{assemble_block, build_block, build_block_at, compute_block_hash, file_record};
pub use builder::ChainBuilderExt;
pub use canonical::{canonical_bytes, canonical_string};
pub use config::ChainConfig;
pub use digest::{digest_bytes, digest_file, digest_pair, Hash256, ParseHashError, CHUNK_SIZE};
pub use error::{ChainError, Result};
pub use keys::{KeyDirectory, KeyProvider};
pub use merkle::merkle_root;
pub use policy::{AcceptancePolicy, Policy, PubkeyRegistry, RegistryCheck, StagedRegistry};
pub use signature::{attach, co_sign, sign_block, verify_signature, SignatureError};
pub use store::{parse_ledger, render_ledger, JsonlLedger, LedgerStore, MemoryLedger};
pub use types::{b64_fixed, Block, FileRecord, Signature, UnsignedBlock, SCHEMA};
pub use verify::{
    Defect, DefectCategory, DefectKind, VerificationReport, Verifier, Warning, WarningKind,
};
