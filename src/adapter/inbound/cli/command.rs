//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Multi-network wallet provisioning and balance tracking
#[derive(Parser, Debug)]
#[command(name = "coinkeeper")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(short, long, global = true, default_value = "coinkeeper.toml")]
    pub config: PathBuf,

    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Keep balances and prices fresh until interrupted
    Run(RunArgs),

    /// Provision wallets on one or more networks
    Generate(GenerateArgs),

    /// Run a single balance and price refresh
    Refresh,

    /// Show wallets and totals
    Status,
}

/// Arguments for `coinkeeper run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Refresh interval in seconds (overrides the config file)
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,
}

/// Arguments for `coinkeeper generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Network identifiers, e.g. BTC ETH SOL
    #[arg(required = true, value_name = "NETWORK")]
    pub networks: Vec<String>,
}
