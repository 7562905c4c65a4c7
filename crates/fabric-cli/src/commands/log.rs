//! `log` command.

use anyhow::{Context, Result};
use colored::Colorize;
use fabric_chain::{ChainConfig, JsonlLedger, LedgerStore};

/// Display every block in human-readable form, or as JSON with `json`.
pub fn cmd_log(config: &ChainConfig, json: bool) -> Result<()> {
    let ledger = JsonlLedger::new(&config.ledger_path);
    let blocks = ledger
        .load_all()
        .with_context(|| format!("failed to load ledger from {}", config.ledger_path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    if blocks.is_empty() {
        println!("{}", "Chain is empty".yellow());
        return Ok(());
    }

    println!("{}", "Provenance Ledger".bold().underline());
    println!("{}: {}", "File".bold(), config.ledger_path.display());
    println!("{}: {}", "Blocks".bold(), blocks.len());
    println!();

    for block in &blocks {
        println!("{} {}", "Block".bold().cyan(), block.index.to_string().cyan());
        println!("  {}: {}", "Timestamp".bold(), block.timestamp.format("%Y-%m-%dT%H:%M:%SZ"));
        println!("  {}: {}", "Hash".bold(), block.block_hash);
        if let Some(prev) = &block.prev_hash {
            println!("  {}: {}", "Previous".bold(), prev);
        }
        println!("  {}: {}", "Merkle Root".bold(), block.merkle_root);
        if !block.notes.is_empty() {
            println!("  {}: \"{}\"", "Notes".bold(), block.notes);
        }
        println!("  {}:", "Files".bold());
        for file in &block.files {
            println!("    - {} ({} bytes) {}", file.path, file.bytes, file.sha256);
        }

        if block.signatures.is_empty() {
            println!("  {}: {}", "Signatures".bold(), "none".yellow());
        } else {
            println!("  {}:", "Signatures".bold());
            for sig in &block.signatures {
                println!("    - {}: {}", sig.signer.green(), sig.pubkey_b64());
            }
        }
        println!();
    }

    Ok(())
}
