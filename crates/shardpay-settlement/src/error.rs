use shardpay_core::{CoreError, RpcError};

/// Error type returned by external collaborators (session store, balance
/// source, payment step, commit signer).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Settlement-layer errors.
///
/// `submit_and_pay` returns the first of these it hits, so callers can tell
/// a funds problem from an integrity problem from a transport problem.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("session {session_id} cannot submit: {source}")]
    StateTransition {
        session_id: String,
        #[source]
        source: CoreError,
    },

    #[error("shard {index} ({hash}) lookup failed: {source}")]
    ShardLookup {
        index: usize,
        hash: String,
        #[source]
        source: BoxError,
    },

    #[error("shard {index}: malformed escrow contract: {source}")]
    Decode {
        index: usize,
        #[source]
        source: prost::DecodeError,
    },

    #[error("escrow RPC failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("escrow response is nil")]
    NilResponse,

    #[error("verify escrow failed: {reason}")]
    Verification { reason: String },

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("escrow amount mismatch: aggregated {aggregated}, request declares {requested}")]
    AmountMismatch { aggregated: i64, requested: i64 },

    #[error("total price overflows at shard {index}")]
    AmountOverflow { index: usize },

    #[error("escrow request amounts overflow (aggregated {aggregated})")]
    DeclaredAmountOverflow { aggregated: i64 },

    #[error("balance check failed: {0}")]
    BalanceCheck(#[source] BoxError),

    #[error("sign buyer channel commit: {0}")]
    Signing(#[source] BoxError),

    #[error("payment failed: {0}")]
    Payment(#[source] BoxError),

    #[error("configuration error: {0}")]
    Config(#[from] CoreError),
}

impl SettlementError {
    /// Whether the failure is terminal for this session regardless of retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::Verification { .. }
                | Self::AmountMismatch { .. }
                | Self::DeclaredAmountOverflow { .. }
                | Self::Decode { .. }
                | Self::StateTransition { .. }
        )
    }
}
