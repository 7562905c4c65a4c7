//! `cosign` command.

use anyhow::{Context, Result};
use colored::Colorize;
use fabric_chain::{ChainBuilderExt, ChainConfig, JsonlLedger, KeyDirectory, KeyProvider, PubkeyRegistry};

/// Add or replace `signer`'s signature on a block (latest by default), then
/// record the signer's public key in the registry.
///
/// The registry update is staged before the ledger is rewritten and only
/// committed afterwards, so a failure at either step leaves both files as
/// they were.
pub fn cmd_cosign(config: &ChainConfig, signer: &str, index: Option<u64>) -> Result<()> {
    let keys = KeyDirectory::new(&config.keys_dir);
    let key = keys
        .signing_key(signer)
        .with_context(|| format!("cannot sign as '{signer}'"))?;

    let mut registry = PubkeyRegistry::load_or_default(&config.pubkeys_path)
        .context("failed to read pubkey registry")?;
    registry.register(signer, key.verifying_key().to_bytes());
    let staged = registry
        .stage(&config.pubkeys_path)
        .context("failed to update pubkey registry")?;

    let mut ledger = JsonlLedger::new(&config.ledger_path);
    let block = ledger
        .co_sign_block(signer, &key, index)
        .context("co-sign failed")?;

    staged
        .commit()
        .context("failed to update pubkey registry")?;

    println!(
        "{} Co-signed block {} as '{}'",
        "✓".green().bold(),
        block.index,
        signer
    );
    println!("    signers: {}", block.signers().collect::<Vec<_>>().join(", "));
    Ok(())
}
