//! Configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CoreError;
use crate::rpc::TrustAnchor;

/// Full configuration handed to the settlement and ledger components.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShardpayConfig {
    /// Remote authority endpoints and trust material.
    #[serde(default)]
    pub services: ServicesConfig,

    /// RPC call settings.
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Escrow authority endpoint (`host:port`).
    #[serde(default = "default_escrow_domain")]
    pub escrow_domain: String,
    /// Hex-encoded public key the escrow authority signs results with.
    #[serde(default)]
    pub escrow_public_key: String,
    /// Ledger authority endpoint (`host:port`).
    #[serde(default = "default_ledger_domain")]
    pub ledger_domain: String,
    /// PEM root certificate used to authenticate both authorities.
    #[serde(default)]
    pub trust_anchor_path: Option<PathBuf>,
    /// Permit plaintext connections when no trust anchor is configured.
    #[serde(default)]
    pub allow_insecure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Per-call deadline in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connection establishment timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_escrow_domain() -> String {
    "escrow.shardpay.network:443".into()
}
fn default_ledger_domain() -> String {
    "ledger.shardpay.network:443".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            escrow_domain: default_escrow_domain(),
            escrow_public_key: String::new(),
            ledger_domain: default_ledger_domain(),
            trust_anchor_path: None,
            allow_insecure: false,
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ServicesConfig {
    /// Resolve the configured trust anchor.
    ///
    /// `Ok(None)` means plaintext transport and is only returned when
    /// `allow_insecure` is set.
    pub fn trust_anchor(&self) -> Result<Option<TrustAnchor>, CoreError> {
        match (&self.trust_anchor_path, self.allow_insecure) {
            (Some(path), _) => TrustAnchor::from_pem_file(path).map(Some),
            (None, true) => {
                tracing::warn!("no trust anchor configured, authority connections are unauthenticated");
                Ok(None)
            }
            (None, false) => Err(CoreError::Config(
                "no trust anchor configured: set services.trust_anchor_path or services.allow_insecure".into(),
            )),
        }
    }

    /// Decode the escrow authority's public key.
    pub fn escrow_public_key_bytes(&self) -> Result<Vec<u8>, CoreError> {
        if self.escrow_public_key.is_empty() {
            return Err(CoreError::Config("services.escrow_public_key is not set".into()));
        }
        hex::decode(&self.escrow_public_key)
            .map_err(|e| CoreError::Config(format!("invalid escrow public key hex: {e}")))
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl ShardpayConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)
                .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
