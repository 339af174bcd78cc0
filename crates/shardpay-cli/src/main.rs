//! Shardpay CLI: ledger accounts and payment channels from the command line.
//!
//! Subcommands: init, account, channel.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shardpay_core::{LoggingConfig, ShardpayConfig};
use tracing_subscriber::EnvFilter;

/// Shardpay operator tool.
#[derive(Parser, Debug)]
#[command(name = "shardpay", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "shardpay.toml")]
    config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a configuration file.
    Init(commands::init::InitArgs),
    /// Create or import a ledger account.
    #[command(subcommand)]
    Account(commands::account::AccountCommand),
    /// Open or close a payment channel.
    #[command(subcommand)]
    Channel(commands::channel::ChannelCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init(args) = &cli.command {
        init_logging(&LoggingConfig::default(), cli.log_level.as_deref());
        return commands::init::run(args, &cli.config);
    }

    let config = ShardpayConfig::load(&cli.config)?;
    init_logging(&config.logging, cli.log_level.as_deref());

    match &cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Account(cmd) => commands::account::run(cmd, &config).await,
        Commands::Channel(cmd) => commands::channel::run(cmd, &config).await,
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_logging(logging: &LoggingConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(&logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match logging.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init(),
    }
}
