use clap::{Parser, Subcommand};
use colored::Colorize;
use fabric_cli::commands::{self, verify::Mode, verify::VerifyOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// File provenance ledger: append signed blocks of file digests, co-sign
/// them, and verify the chain.
#[derive(Parser, Debug)]
#[command(name = "fabric", version)]
struct Cli {
    /// Project root holding the `chain/` directory.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// TOML file overriding the ledger layout.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Digest files into a new signed block at the end of the ledger.
    NewBlock {
        /// Name of the signing key under the keys directory.
        #[arg(long)]
        signer: String,
        /// Free-form note stored in the block.
        #[arg(long, default_value = "")]
        note: String,
        /// File to include (repeatable, in order).
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },
    /// Add or replace a signature on an existing block.
    Cosign {
        #[arg(long)]
        signer: String,
        /// Block index; defaults to the latest block.
        #[arg(long)]
        index: Option<u64>,
    },
    /// Check chain linkage, digests, and signatures.
    Verify {
        #[arg(long, value_enum, default_value_t = Mode::Basic)]
        mode: Mode,
        /// Policy file (threshold mode).
        #[arg(long)]
        policy: Option<PathBuf>,
        /// Public key registry for the advisory cross-check.
        #[arg(long)]
        pubkeys: Option<PathBuf>,
        /// Skip the registry cross-check entirely.
        #[arg(long)]
        no_registry: bool,
        /// Ledger file to verify instead of the configured one.
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// Print every block in the ledger.
    Log {
        /// Emit blocks as a JSON array.
        #[arg(long)]
        json: bool,
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// Print the length and SHA-256 of files.
    Hash {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(2)
        }
    }
}

/// Dispatch a subcommand. `Ok(false)` means the ledger was rejected.
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = commands::resolve_config(&cli.root, cli.config.as_deref())?;
    match cli.command {
        Commands::NewBlock {
            signer,
            note,
            files,
        } => commands::block::cmd_new_block(&config, &signer, &note, &files).map(|_| true),
        Commands::Cosign { signer, index } => {
            commands::cosign::cmd_cosign(&config, &signer, index).map(|_| true)
        }
        Commands::Verify {
            mode,
            policy,
            pubkeys,
            no_registry,
            ledger,
        } => {
            let config = commands::with_ledger(config, ledger);
            let opts = VerifyOptions {
                mode,
                policy,
                pubkeys,
                no_registry,
            };
            commands::verify::cmd_verify(&config, &opts)
        }
        Commands::Log { json, ledger } => {
            let config = commands::with_ledger(config, ledger);
            commands::log::cmd_log(&config, json).map(|_| true)
        }
        Commands::Hash { files } => commands::block::cmd_hash(&files).map(|_| true),
    }
}
