use serde::{Deserialize, Serialize};
use shardpay_core::proto::escrow::{SignedEscrowContract, SubmitContractResult};

/// Storage-deal contract for one shard; carries the agreed price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardContract {
    pub contract_id: String,
    pub amount: i64,
}

/// The contract pair a shard owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardContracts {
    /// Encoded `SignedEscrowContract`, exactly as the host and renter signed it.
    pub signed_escrow_contract: Vec<u8>,
    pub guard: GuardContract,
}

/// Output of contract aggregation: one decoded contract per shard, in shard
/// order, and the sum of the shards' guard prices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedContracts {
    pub contracts: Vec<SignedEscrowContract>,
    pub total_price: i64,
}

impl AggregatedContracts {
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Escrow submission result whose signature has been checked against the
/// escrow authority's key.
///
/// Only the escrow submitter can construct one, so holding a value of this
/// type is proof of verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEscrowResult {
    result: SubmitContractResult,
    escrow_signature: Vec<u8>,
}

impl VerifiedEscrowResult {
    pub(crate) fn new(result: SubmitContractResult, escrow_signature: Vec<u8>) -> Self {
        Self {
            result,
            escrow_signature,
        }
    }

    pub fn result(&self) -> &SubmitContractResult {
        &self.result
    }

    pub fn escrow_signature(&self) -> &[u8] {
        &self.escrow_signature
    }

    pub fn total_amount(&self) -> i64 {
        self.result.total_amount
    }

    pub fn into_parts(self) -> (SubmitContractResult, Vec<u8>) {
        (self.result, self.escrow_signature)
    }
}
