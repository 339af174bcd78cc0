//! `shardpay channel`: open and close payment channels.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};
use serde::Serialize;
use shardpay_core::proto::ledger::SignedChannelState;
use shardpay_core::ShardpayConfig;
use shardpay_crypto::PublicKey;
use shardpay_ledger::{sign_channel_state, LedgerClient};

use super::{call_context, print_json, read_keypair};

#[derive(Subcommand, Debug)]
pub enum ChannelCommand {
    /// Commit funds to a new channel.
    Open(OpenArgs),
    /// Close a channel with a bilaterally signed state.
    Close(CloseArgs),
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Payer secret key file (hex).
    #[arg(long, default_value = "shardpay.key")]
    pub key_file: PathBuf,

    /// Receiver public key (hex).
    #[arg(short, long)]
    pub receiver: String,

    /// Amount to commit.
    #[arg(short, long)]
    pub amount: i64,
}

#[derive(Args, Debug)]
pub struct CloseArgs {
    /// JSON-encoded signed channel state.
    #[arg(long)]
    pub state: PathBuf,

    /// Sign as the paying side with this key before submitting.
    #[arg(long)]
    pub from_key: Option<PathBuf>,

    /// Sign as the receiving side with this key before submitting.
    #[arg(long)]
    pub to_key: Option<PathBuf>,
}

#[derive(Serialize)]
struct OpenOutput {
    channel_id: i64,
    payer: String,
    receiver: String,
    amount: i64,
}

#[derive(Serialize)]
struct CloseOutput {
    channel_id: i64,
    sequence: i64,
}

pub async fn run(cmd: &ChannelCommand, config: &ShardpayConfig) -> anyhow::Result<()> {
    match cmd {
        ChannelCommand::Open(args) => open(args, config).await,
        ChannelCommand::Close(args) => close(args, config).await,
    }
}

async fn open(args: &OpenArgs, config: &ShardpayConfig) -> anyhow::Result<()> {
    if args.amount <= 0 {
        anyhow::bail!("amount must be positive, got {}", args.amount);
    }
    let payer = read_keypair(&args.key_file)?;
    let receiver = PublicKey::from_hex(&args.receiver).context("parse receiver public key")?;

    let client = LedgerClient::connect(&config.services, &config.rpc).await?;
    let id = client
        .open_channel(&call_context(config), &payer, &receiver, args.amount)
        .await?;

    print_json(&OpenOutput {
        channel_id: id.id,
        payer: payer.public_key().to_hex(),
        receiver: receiver.to_hex(),
        amount: args.amount,
    })
}

async fn close(args: &CloseArgs, config: &ShardpayConfig) -> anyhow::Result<()> {
    let signed = load_signed_state(args)?;
    let (channel_id, sequence) = signed
        .channel
        .as_ref()
        .map(|s| (s.channel_id().unwrap_or_default(), s.sequence))
        .unwrap_or_default();

    let client = LedgerClient::connect(&config.services, &config.rpc).await?;
    client.close_channel(&call_context(config), signed).await?;

    print_json(&CloseOutput {
        channel_id,
        sequence,
    })
}

/// Read the state file and add any signatures requested on the command line.
fn load_signed_state(args: &CloseArgs) -> anyhow::Result<SignedChannelState> {
    let mut signed = read_state(&args.state)?;
    let state = signed
        .channel
        .clone()
        .context("state file carries no channel state")?;

    if let Some(path) = &args.from_key {
        signed.from_signature = sign_channel_state(&state, &read_keypair(path)?);
    }
    if let Some(path) = &args.to_key {
        signed.to_signature = sign_channel_state(&state, &read_keypair(path)?);
    }
    Ok(signed)
}

fn read_state(path: &Path) -> anyhow::Result<SignedChannelState> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read state file {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse state file {}", path.display()))
}
