//! Shardpay Ledger
//!
//! Client side of the payment-channel ledger authority: account
//! provisioning, channel opening, bilaterally signed channel states, and
//! channel closing.

pub mod channel;
pub mod client;
pub mod error;
pub mod messages;
pub mod service;

pub use channel::ChannelStateTracker;
pub use client::{sign_channel_state, LedgerClient};
pub use error::{LedgerError, Party};
pub use messages::{new_account, new_channel_commit, new_channel_state, new_signed_channel_state};
pub use service::{GrpcLedgerService, LedgerService};
