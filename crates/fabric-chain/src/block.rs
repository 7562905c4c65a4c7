//! Block construction and block hashing.

use crate::canonical::canonical_bytes;
use crate::digest::{digest_bytes, digest_file, Hash256};
use crate::error::{ChainError, Result};
use crate::merkle::merkle_root;
use crate::types::{Block, FileRecord, SCHEMA};
use chrono::{DateTime, SubsecRound, Utc};
use std::path::Path;

/// Digest of the canonical encoding of a block's unsigned fields.
pub fn compute_block_hash(block: &Block) -> Result<Hash256, serde_json::Error> {
    let bytes = canonical_bytes(&block.unsigned())?;
    Ok(digest_bytes(&bytes))
}

/// Digest one file into a [`FileRecord`], keeping the path as given.
pub fn file_record(path: &Path) -> Result<FileRecord> {
    let display = path
        .to_str()
        .ok_or_else(|| ChainError::NonUtf8Path(path.to_path_buf()))?
        .to_string();
    let (bytes, sha256) = digest_file(path)?;
    Ok(FileRecord {
        path: display,
        bytes,
        sha256,
    })
}

/// Compose an unsigned block from already-digested files.
///
/// `merkle_root` and `block_hash` are derived here; `signatures` is empty.
pub fn assemble_block(
    index: u64,
    prev_hash: Option<Hash256>,
    timestamp: DateTime<Utc>,
    files: Vec<FileRecord>,
    notes: &str,
) -> Result<Block> {
    if files.is_empty() {
        return Err(ChainError::NoFiles);
    }
    let leaves: Vec<Hash256> = files.iter().map(|f| f.sha256).collect();
    let mut block = Block {
        schema: SCHEMA.to_string(),
        index,
        timestamp: timestamp.trunc_subsecs(0),
        prev_hash,
        merkle_root: merkle_root(&leaves),
        files,
        notes: notes.to_string(),
        block_hash: Hash256([0u8; 32]),
        signatures: Vec::new(),
    };
    block.block_hash = compute_block_hash(&block)?;
    Ok(block)
}

/// Build the successor of `prev` (or a genesis block) over `paths`.
///
/// Every path is digested before anything is returned; the first missing
/// file aborts the whole build with [`ChainError::MissingFile`].
pub fn build_block<P: AsRef<Path>>(note: &str, paths: &[P], prev: Option<&Block>) -> Result<Block> {
    build_block_at(note, paths, prev, Utc::now())
}

/// [`build_block`] with an explicit creation time.
pub fn build_block_at<P: AsRef<Path>>(
    note: &str,
    paths: &[P],
    prev: Option<&Block>,
    timestamp: DateTime<Utc>,
) -> Result<Block> {
    if paths.is_empty() {
        return Err(ChainError::NoFiles);
    }
    let files = paths
        .iter()
        .map(|p| file_record(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let (index, prev_hash) = match prev {
        Some(prev) => (prev.index + 1, Some(prev.block_hash)),
        None => (0, None),
    };
    assemble_block(index, prev_hash, timestamp, files, note)
}
