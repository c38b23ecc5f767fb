//! Chassis Tracker
//!
//! Command-line front end for tracking registration, annual inspection and
//! BIT due dates across a chassis fleet, with per-chassis inspection,
//! citation and repair history.
//!
//! State lives in `fleet.json` and `ledger.json` under the configured data
//! directory. Logs go to stderr so `export --out -` can write CSV to stdout.

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use compliance_engine::ComplianceEngine;
use fleet_core::{Env, Tracker};
use tracing::info;
use tracing_subscriber::{
    filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

mod commands;
mod config;
mod store;

use commands::Command;
use config::Config;
use store::JsonFileStore;

/// Command-line arguments for the chassis tracker
#[derive(Parser, Debug)]
#[command(name = "chassis-tracker")]
#[command(version, about = "Track chassis registration and inspection compliance")]
struct Args {
    /// TOML config file (default: ./chassis-tracker.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory, overriding the config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(level: &str, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { level };
    let directive: Directive = level
        .parse()
        .with_context(|| format!("Invalid log level: {}", level))?;

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(directive))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    init_tracing(&config.logging.level, args.verbose)?;

    let data_dir = args.data_dir.unwrap_or(config.storage.data_dir);
    info!(data_dir = %data_dir.display(), "Opening fleet data");
    let store = JsonFileStore::open(data_dir.clone())
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;

    let engine = ComplianceEngine::with_soon_threshold(config.compliance.soon_threshold_days);
    let mut tracker = Tracker::load(store, Env::system(), engine)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    commands::run(&mut tracker, args.command, &mut out)
}
