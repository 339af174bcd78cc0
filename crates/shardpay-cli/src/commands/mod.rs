pub mod account;
pub mod channel;
pub mod init;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use shardpay_core::{CallContext, ShardpayConfig};
use shardpay_crypto::KeyPair;
use zeroize::Zeroizing;

/// Read a hex-encoded secret key file.
pub fn read_keypair(path: &Path) -> anyhow::Result<KeyPair> {
    let contents = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("read key file {}", path.display()))?,
    );
    KeyPair::from_hex(&contents).with_context(|| format!("parse key file {}", path.display()))
}

/// Write a secret key as hex, readable by the owner only. Never overwrites
/// an existing file.
pub fn write_keypair(path: &Path, keypair: &KeyPair) -> anyhow::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            anyhow::anyhow!("key file already exists at {}", path.display())
        } else {
            anyhow::Error::new(e).context(format!("create key file {}", path.display()))
        }
    })?;
    let contents = Zeroizing::new(hex::encode(keypair.secret_bytes()));
    file.write_all(contents.as_bytes())
        .and_then(|()| file.sync_all())
        .with_context(|| format!("write key file {}", path.display()))?;
    Ok(())
}

/// Call scope bounded by the configured RPC timeout.
pub fn call_context(config: &ShardpayConfig) -> CallContext {
    CallContext::background().with_timeout(config.rpc.timeout())
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
