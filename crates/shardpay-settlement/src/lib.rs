//! Shardpay Settlement
//!
//! Submits a renter session's per-shard escrow contracts to the escrow
//! authority as one aggregate request, verifies the authority's signed
//! answer, and hands the verified result to the payment step.

pub mod aggregator;
pub mod error;
pub mod escrow;
pub mod orchestrator;
pub mod traits;
pub mod types;

pub use aggregator::ContractAggregator;
pub use error::{BoxError, SettlementError};
pub use escrow::{EscrowSubmitter, GrpcEscrowService};
pub use orchestrator::SettlementOrchestrator;
pub use traits::{BalanceChecker, CommitSigner, EscrowService, LocalCommitSigner, PaymentTrigger, RenterSession, Shard};
pub use types::{AggregatedContracts, GuardContract, ShardContracts, VerifiedEscrowResult};
