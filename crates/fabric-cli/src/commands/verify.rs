//! `verify` command.

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use fabric_chain::{
    AcceptancePolicy, ChainConfig, JsonlLedger, Policy, PubkeyRegistry, VerificationReport,
    Verifier,
};
use std::path::PathBuf;

/// Acceptance mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// At least one valid signature per block
    #[default]
    Basic,
    /// Policy threshold of valid signatures from allowed signers
    Threshold,
}

pub struct VerifyOptions {
    pub mode: Mode,
    /// Policy file overriding the configured one
    pub policy: Option<PathBuf>,
    /// Registry file overriding the configured one
    pub pubkeys: Option<PathBuf>,
    /// Skip the advisory registry cross-check
    pub no_registry: bool,
}

/// Build the acceptance policy for `mode`.
///
/// An explicit `--policy` file must exist. Otherwise the configured policy
/// file is used if present, and the default policy (threshold 1, any signer)
/// if not.
fn acceptance_policy(config: &ChainConfig, opts: &VerifyOptions) -> Result<AcceptancePolicy> {
    match opts.mode {
        Mode::Basic => Ok(AcceptancePolicy::Basic),
        Mode::Threshold => {
            let policy = match &opts.policy {
                Some(path) => Policy::load(path)?,
                None if config.policy_path.exists() => Policy::load(&config.policy_path)?,
                None => Policy::default(),
            };
            Ok(AcceptancePolicy::Threshold(policy))
        }
    }
}

fn registry(config: &ChainConfig, opts: &VerifyOptions) -> Result<Option<PubkeyRegistry>> {
    if opts.no_registry {
        return Ok(None);
    }
    let registry = match &opts.pubkeys {
        Some(path) => Some(PubkeyRegistry::load(path)?),
        None if config.pubkeys_path.exists() => Some(PubkeyRegistry::load(&config.pubkeys_path)?),
        None => None,
    };
    Ok(registry)
}

/// Verify the ledger and print one line per defect.
///
/// Returns whether the ledger was accepted. Input errors (missing ledger,
/// malformed record or policy) are returned as `Err`.
pub fn cmd_verify(config: &ChainConfig, opts: &VerifyOptions) -> Result<bool> {
    let policy = acceptance_policy(config, opts).context("failed to load policy")?;
    let mut verifier = Verifier::new(policy);
    if let Some(registry) = registry(config, opts).context("failed to load pubkey registry")? {
        verifier = verifier.with_registry(registry);
    }

    let ledger = JsonlLedger::new(&config.ledger_path);
    let report = verifier
        .verify_store(&ledger)
        .with_context(|| format!("failed to read ledger {}", config.ledger_path.display()))?;

    print_report(&report);
    Ok(report.accepted())
}

pub fn print_report(report: &VerificationReport) {
    for defect in &report.defects {
        println!("{} {}", "[!]".red().bold(), defect);
    }
    for warning in &report.warnings {
        println!("{} {}", "[~]".yellow(), warning);
    }

    if report.blocks_checked == 0 {
        println!("{}", "Chain is empty".yellow());
    }
    if report.accepted() {
        println!(
            "{} Chain verified OK ({} blocks, {} policy)",
            "✓".green().bold(),
            report.blocks_checked,
            report.policy
        );
    } else {
        println!(
            "{} Chain verification FAILED ({} defects in {} blocks, {} policy)",
            "✗".red().bold(),
            report.defects.len(),
            report.blocks_checked,
            report.policy
        );
    }
}
