//! Wire messages exchanged with the ledger and escrow authorities.
//!
//! Field numbers are part of the wire contract and must never be reused.
//! Decoders skip unknown fields, so new optional fields can be appended
//! without breaking older readers.

/// Payment-channel ledger schema (`ledger` package).
pub mod ledger {
    use serde::{Deserialize, Serialize};

    /// Raw public key bytes of a ledger participant.
    #[derive(Clone, PartialEq, Eq, Hash, prost::Message, Serialize, Deserialize)]
    pub struct PublicKey {
        #[prost(bytes = "vec", tag = "1")]
        pub key: Vec<u8>,
    }

    /// A ledger-visible identity and its balance.
    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct Account {
        #[prost(message, optional, tag = "1")]
        pub address: Option<PublicKey>,
        #[prost(int64, tag = "2")]
        pub balance: i64,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Hash, prost::Message, Serialize, Deserialize)]
    pub struct ChannelId {
        #[prost(int64, tag = "1")]
        pub id: i64,
    }

    /// Proposal to open a channel, signed by the payer.
    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct ChannelCommit {
        #[prost(message, optional, tag = "1")]
        pub payer: Option<PublicKey>,
        #[prost(message, optional, tag = "2")]
        pub receiver: Option<PublicKey>,
        #[prost(int64, tag = "3")]
        pub amount: i64,
        /// Uniqueness nonce. Carries no ordering meaning.
        #[prost(int64, tag = "4")]
        pub payer_id: i64,
    }

    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct SignedChannelCommit {
        #[prost(message, optional, tag = "1")]
        pub channel: Option<ChannelCommit>,
        #[prost(bytes = "vec", tag = "2")]
        pub signature: Vec<u8>,
    }

    /// Balance snapshot of a channel at a given sequence number.
    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct ChannelState {
        #[prost(message, optional, tag = "1")]
        pub id: Option<ChannelId>,
        #[prost(int64, tag = "2")]
        pub sequence: i64,
        #[prost(message, optional, tag = "3")]
        pub from: Option<Account>,
        #[prost(message, optional, tag = "4")]
        pub to: Option<Account>,
    }

    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct SignedChannelState {
        #[prost(message, optional, tag = "1")]
        pub channel: Option<ChannelState>,
        #[prost(bytes = "vec", tag = "2")]
        pub from_signature: Vec<u8>,
        #[prost(bytes = "vec", tag = "3")]
        pub to_signature: Vec<u8>,
    }

    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct CreateAccountResult {
        #[prost(message, optional, tag = "1")]
        pub account: Option<Account>,
    }

    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct ChannelClosed {
        #[prost(message, optional, tag = "1")]
        pub state: Option<SignedChannelState>,
    }

    impl Account {
        /// Raw address bytes, empty when the address is unset.
        pub fn address_bytes(&self) -> &[u8] {
            self.address.as_ref().map(|a| a.key.as_slice()).unwrap_or_default()
        }
    }

    impl ChannelState {
        /// Channel id value, `None` when the id is unset.
        pub fn channel_id(&self) -> Option<i64> {
            self.id.map(|id| id.id)
        }
    }
}

/// Escrow authority schema (`escrow` package).
pub mod escrow {
    use serde::{Deserialize, Serialize};

    use super::ledger::{ChannelId, SignedChannelCommit};

    /// Funds commitment for one shard's storage deal.
    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct EscrowContract {
        #[prost(string, tag = "1")]
        pub contract_id: String,
        #[prost(bytes = "vec", tag = "2")]
        pub buyer_address: Vec<u8>,
        #[prost(bytes = "vec", tag = "3")]
        pub seller_address: Vec<u8>,
        #[prost(bytes = "vec", tag = "4")]
        pub auth_address: Vec<u8>,
        #[prost(int64, tag = "5")]
        pub amount: i64,
        #[prost(int64, tag = "6")]
        pub collateral_amount: i64,
        #[prost(int64, tag = "7")]
        pub withhold_amount: i64,
        #[prost(int32, tag = "8")]
        pub num_payouts: i32,
    }

    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct SignedEscrowContract {
        #[prost(message, optional, tag = "1")]
        pub contract: Option<EscrowContract>,
        #[prost(bytes = "vec", tag = "2")]
        pub buyer_signature: Vec<u8>,
        #[prost(bytes = "vec", tag = "3")]
        pub seller_signature: Vec<u8>,
    }

    /// Aggregate submission: one signed contract per shard, in shard order,
    /// plus the buyer's channel commit funding the escrow.
    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct EscrowContractRequest {
        #[prost(message, repeated, tag = "1")]
        pub contract: Vec<SignedEscrowContract>,
        #[prost(message, optional, tag = "2")]
        pub buyer_channel: Option<SignedChannelCommit>,
    }

    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct SubmitContractResult {
        #[prost(bytes = "vec", tag = "1")]
        pub buyer_address: Vec<u8>,
        #[prost(string, repeated, tag = "2")]
        pub contract_ids: Vec<String>,
        #[prost(int64, tag = "3")]
        pub total_amount: i64,
        #[prost(message, optional, tag = "4")]
        pub buyer_channel_id: Option<ChannelId>,
    }

    /// Escrow authority response with a detached signature over `result`.
    #[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
    pub struct SignedSubmitContractResult {
        #[prost(message, optional, tag = "1")]
        pub result: Option<SubmitContractResult>,
        #[prost(bytes = "vec", tag = "2")]
        pub escrow_signature: Vec<u8>,
    }

    impl SignedEscrowContract {
        /// Declared amount of the inner contract, zero when absent.
        pub fn amount(&self) -> i64 {
            self.contract.as_ref().map(|c| c.amount).unwrap_or_default()
        }
    }

    impl EscrowContractRequest {
        /// Sum of every contract entry's declared amount, `None` on overflow.
        pub fn declared_amount(&self) -> Option<i64> {
            self.contract
                .iter()
                .try_fold(0i64, |acc, c| acc.checked_add(c.amount()))
        }
    }
}
