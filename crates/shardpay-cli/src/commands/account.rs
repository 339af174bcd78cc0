//! `shardpay account`: provision ledger accounts.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use shardpay_core::proto::ledger::Account;
use shardpay_core::ShardpayConfig;
use shardpay_crypto::KeyPair;
use shardpay_ledger::LedgerClient;

use super::{call_context, print_json, read_keypair, write_keypair};

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Generate a new key pair and register it with the ledger.
    Create(CreateArgs),
    /// Attach to the ledger account of an existing key.
    Import(ImportArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Where to write the new secret key (hex). Must not exist.
    #[arg(long, default_value = "shardpay.key")]
    pub key_out: PathBuf,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Secret key file (hex).
    #[arg(long, default_value = "shardpay.key")]
    pub key_file: PathBuf,
}

#[derive(Serialize)]
struct AccountOutput {
    address: String,
    balance: i64,
    key_file: String,
}

impl AccountOutput {
    fn new(account: &Account, key_file: &std::path::Path) -> Self {
        Self {
            address: hex::encode(account.address_bytes()),
            balance: account.balance,
            key_file: key_file.display().to_string(),
        }
    }
}

pub async fn run(cmd: &AccountCommand, config: &ShardpayConfig) -> anyhow::Result<()> {
    match cmd {
        AccountCommand::Create(args) => create(args, config).await,
        AccountCommand::Import(args) => import(args, config).await,
    }
}

async fn create(args: &CreateArgs, config: &ShardpayConfig) -> anyhow::Result<()> {
    // The key is on disk before the ledger learns about it.
    let keypair = KeyPair::generate();
    write_keypair(&args.key_out, &keypair)?;

    let client = LedgerClient::connect(&config.services, &config.rpc).await?;
    let account = client
        .import_account(&call_context(config), &keypair.public_key())
        .await?;

    print_json(&AccountOutput::new(&account, &args.key_out))
}

async fn import(args: &ImportArgs, config: &ShardpayConfig) -> anyhow::Result<()> {
    let keypair = read_keypair(&args.key_file)?;

    let client = LedgerClient::connect(&config.services, &config.rpc).await?;
    let account = client
        .import_account(&call_context(config), &keypair.public_key())
        .await?;

    print_json(&AccountOutput::new(&account, &args.key_file))
}
