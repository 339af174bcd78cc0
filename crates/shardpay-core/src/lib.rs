//! Shardpay Core: wire messages, session state machine, configuration,
//! and RPC plumbing shared by the ledger and settlement crates.

pub mod config;
pub mod context;
pub mod error;
pub mod proto;
pub mod rpc;
pub mod session;

pub use config::{LoggingConfig, RpcConfig, ServicesConfig, ShardpayConfig};
pub use context::{CallContext, CancelHandle};
pub use error::CoreError;
pub use rpc::{Connection, RpcError, TrustAnchor};
pub use session::{SessionEvent, SessionGate, SessionState, SessionStateMachine};
