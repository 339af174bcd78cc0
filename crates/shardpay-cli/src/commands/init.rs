//! `shardpay init`: write a configuration file.

use std::path::{Path, PathBuf};

use clap::Args;
use shardpay_core::ShardpayConfig;
use shardpay_crypto::PublicKey;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Escrow authority endpoint (`host:port`).
    #[arg(long)]
    pub escrow_domain: Option<String>,

    /// Hex-encoded escrow authority public key.
    #[arg(long)]
    pub escrow_public_key: Option<String>,

    /// Ledger authority endpoint (`host:port`).
    #[arg(long)]
    pub ledger_domain: Option<String>,

    /// PEM root certificate authenticating both authorities.
    #[arg(long)]
    pub trust_anchor: Option<PathBuf>,

    /// Allow plaintext connections when no trust anchor is set.
    #[arg(long)]
    pub allow_insecure: bool,

    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs, path: &Path) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        anyhow::bail!("configuration file already exists at {}", path.display());
    }

    let config = build_config(args)?;
    config.save(path)?;

    println!("Wrote Shardpay configuration to {}", path.display());
    if config.services.trust_anchor_path.is_none() {
        if config.services.allow_insecure {
            println!("Warning: no trust anchor set, authority connections are unauthenticated.");
        } else {
            println!("Set services.trust_anchor_path (or pass --allow-insecure) before connecting.");
        }
    }
    Ok(())
}

fn build_config(args: &InitArgs) -> anyhow::Result<ShardpayConfig> {
    let mut config = ShardpayConfig::default();
    if let Some(domain) = &args.escrow_domain {
        config.services.escrow_domain = domain.clone();
    }
    if let Some(domain) = &args.ledger_domain {
        config.services.ledger_domain = domain.clone();
    }
    if let Some(key) = &args.escrow_public_key {
        PublicKey::from_hex(key)?;
        config.services.escrow_public_key = key.trim().to_string();
    }
    config.services.trust_anchor_path = args.trust_anchor.clone();
    config.services.allow_insecure = args.allow_insecure;
    Ok(config)
}
