use crate::session::SessionState;

/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid session transition from {from} to {to}")]
    InvalidStateTransition { from: SessionState, to: SessionState },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("trust anchor error: {0}")]
    TrustAnchor(String),

    #[error("deserialization error: {0}")]
    DeserializationError(#[from] prost::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
