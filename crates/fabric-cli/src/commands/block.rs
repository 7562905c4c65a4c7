//! `new-block` and `hash` commands.

use anyhow::{Context, Result};
use colored::Colorize;
use fabric_chain::{digest_file, ChainBuilderExt, ChainConfig, JsonlLedger, KeyDirectory, KeyProvider};
use std::path::PathBuf;

/// Digest `files`, link to the ledger tail, sign as `signer`, and append.
pub fn cmd_new_block(config: &ChainConfig, signer: &str, note: &str, files: &[PathBuf]) -> Result<()> {
    let keys = KeyDirectory::new(&config.keys_dir);
    let key = keys
        .signing_key(signer)
        .with_context(|| format!("cannot sign as '{signer}'"))?;

    let mut ledger = JsonlLedger::new(&config.ledger_path);
    let block = ledger
        .append_signed(signer, &key, note, files)
        .with_context(|| format!("failed to append to {}", config.ledger_path.display()))?;

    println!("{} Block {} appended", "✓".green().bold(), block.index);
    println!("    hash: {}", block.block_hash);
    if let Some(prev) = block.prev_hash {
        println!("    prev: {prev}");
    }
    Ok(())
}

/// Print length and SHA-256 of each file.
pub fn cmd_hash(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let (bytes, digest) = digest_file(path)
            .with_context(|| format!("failed to hash {}", path.display()))?;
        println!("{digest}  {bytes:>10}  {}", path.display());
    }
    Ok(())
}
