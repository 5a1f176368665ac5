//! OSIGN Service-Order Signing: Demo CLI
//!
//! Runs one or all of the four reference scenarios against the in-process
//! runtime. Each scenario uses the real engine (lifecycle rules,
//! finalization coordinator, assembly, audit chain) with fictional data.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- sequential
//!   cargo run -p demo -- --config osign.toml simultaneous
//!   cargo run -p demo -- cancellation
//!   cargo run -p demo -- removal

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use osign_config::EngineConfig;
use osign_contracts::error::OsignResult;
use osign_ref::scenarios::{
    cancellation, signer_removal, simultaneous_completion, two_signer_completion,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// OSIGN: electronic signature of service orders.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "OSIGN service-order signing reference demo",
    long_about = "Runs OSIGN reference scenarios showing signature capture,\n\
                  at-most-once finalization, cancellation and audit chain integrity."
)]
struct Cli {
    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario A: two signers sign one after the other.
    Sequential,
    /// Scenario B: both signers sign at the same instant.
    Simultaneous,
    /// Scenario C: cancel a partially signed order, then delete it.
    Cancellation,
    /// Scenario D: removing the last pending signer completes the order.
    Removal,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // RUST_LOG=info shows every state transition, debug shows store detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(&config).await,
        Command::Sequential => two_signer_completion::run_scenario(&config).await,
        Command::Simultaneous => simultaneous_completion::run_scenario(&config).await,
        Command::Cancellation => cancellation::run_scenario(&config).await,
        Command::Removal => signer_removal::run_scenario(&config).await,
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> OsignResult<EngineConfig> {
    match path {
        Some(path) => {
            let config = EngineConfig::from_file(path)?;
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

async fn run_all(config: &EngineConfig) -> OsignResult<()> {
    two_signer_completion::run_scenario(config).await?;
    simultaneous_completion::run_scenario(config).await?;
    cancellation::run_scenario(config).await?;
    signer_removal::run_scenario(config).await?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("OSIGN: Service-Order Electronic Signature");
    println!("Reference Demo");
    println!("=========================================");
    println!();
    println!("Signing pipeline per signature:");
    println!("  [1] Identity claim validated (full name, CPF check digits, birth date)");
    println!("  [2] Signer must be Pending; order must accept signatures");
    println!("  [3] Evidence captured and hashed; transition + counters committed atomically");
    println!("  [4] Audit event appended to the order's SHA-256 chain");
    println!("  [5] Finalization claimed by compare-and-swap: assembly runs at most once");
    println!();
}
