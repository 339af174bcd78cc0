use std::fmt;

use shardpay_core::{CoreError, RpcError};
use shardpay_crypto::CryptoError;

/// Side of a payment channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    From,
    To,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::From => write!(f, "from"),
            Self::To => write!(f, "to"),
        }
    }
}

/// Ledger-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger RPC failed: {0}")]
    Rpc(RpcError),

    #[error("ledger rejected {method}: {message}")]
    Rejected { method: &'static str, message: String },

    #[error("empty {0} response from ledger")]
    EmptyResponse(&'static str),

    #[error("stale state for channel {channel_id}: sequence {sequence} <= accepted {accepted}")]
    StaleSequence {
        channel_id: i64,
        sequence: i64,
        accepted: i64,
    },

    #[error("{party} signature does not verify for channel {channel_id}")]
    InvalidSignature { channel_id: i64, party: Party },

    #[error("malformed channel message: {0}")]
    Malformed(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("configuration error: {0}")]
    Config(#[from] CoreError),
}

impl From<RpcError> for LedgerError {
    fn from(err: RpcError) -> Self {
        if err.is_rejection() {
            if let RpcError::Status { method, message, .. } = err {
                return Self::Rejected { method, message };
            }
        }
        Self::Rpc(err)
    }
}
