//! Ed25519 signing and verification of block hashes.
//!
//! Signatures cover the raw 32 bytes of `block_hash`, never its hex text
//! and never the canonical encoding.

use crate::digest::Hash256;
use crate::types::{Block, Signature};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use thiserror::Error;
use tracing::info;

/// Why a signature failed to verify. Never fatal to a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("public key is not a valid Ed25519 point")]
    MalformedPublicKey,

    #[error("signature does not verify")]
    BadSignature,
}

/// Sign `block.block_hash` as `signer`.
pub fn sign_block(block: &Block, key: &SigningKey, signer: &str) -> Signature {
    let signature = key.sign(block.block_hash.as_bytes());
    Signature {
        signer: signer.to_string(),
        pubkey: key.verifying_key().to_bytes(),
        signature: signature.to_bytes(),
    }
}

/// Append a signature to a block.
pub fn attach(block: &mut Block, signature: Signature) {
    block.signatures.push(signature);
}

/// Replace any signature by `signer` with a fresh one from `key`.
///
/// The caller persists the returned block in place of the previous instance.
pub fn co_sign(mut block: Block, signer: &str, key: &SigningKey) -> Block {
    let before = block.signatures.len();
    block.signatures.retain(|s| s.signer != signer);
    let replaced = before - block.signatures.len();

    let signature = sign_block(&block, key, signer);
    attach(&mut block, signature);
    info!(
        index = block.index,
        signer,
        replaced,
        signatures = block.signatures.len(),
        "co-signed block"
    );
    block
}

/// Verify one signature against the exact bytes of `block_hash`.
pub fn verify_signature(block_hash: &Hash256, signature: &Signature) -> Result<(), SignatureError> {
    let verifying_key =
        VerifyingKey::from_bytes(&signature.pubkey).map_err(|_| SignatureError::MalformedPublicKey)?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.signature);
    verifying_key
        .verify_strict(block_hash.as_bytes(), &sig)
        .map_err(|_| SignatureError::BadSignature)
}
