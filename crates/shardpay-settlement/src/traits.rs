use async_trait::async_trait;
use shardpay_core::proto::escrow::{EscrowContractRequest, SignedSubmitContractResult};
use shardpay_core::proto::ledger::ChannelCommit;
use shardpay_core::{CallContext, CoreError, RpcError, SessionEvent, SessionState};
use shardpay_crypto::{sign_message, KeyPair, PublicKey};

use crate::error::BoxError;
use crate::types::{ShardContracts, VerifiedEscrowResult};

/// An in-progress upload, owned by the session subsystem.
#[async_trait]
pub trait RenterSession: Send + Sync {
    fn session_id(&self) -> &str;

    /// Shard hashes in shard order.
    fn shard_hashes(&self) -> &[String];

    /// Scope for every RPC made on behalf of this session.
    fn context(&self) -> &CallContext;

    /// Move the session's state machine. Must check and apply atomically.
    async fn transition(&self, event: SessionEvent) -> Result<SessionState, CoreError>;

    /// Look up the shard stored at `index` under `hash`.
    async fn shard(&self, hash: &str, index: usize) -> Result<Box<dyn Shard>, BoxError>;
}

/// One stored piece of the upload.
pub trait Shard: Send + Sync {
    fn contracts(&self) -> Result<ShardContracts, BoxError>;
}

/// Source of the renter's spendable balance.
#[async_trait]
pub trait BalanceChecker: Send + Sync {
    /// Balance available to the session, real or to be escrowed.
    async fn available_balance(&self, session_id: &str, offline_signing: bool) -> Result<i64, BoxError>;
}

/// The payment step run after the escrow authority accepted the contracts.
#[async_trait]
pub trait PaymentTrigger: Send + Sync {
    async fn pay(
        &self,
        session_id: &str,
        result: &VerifiedEscrowResult,
        amount: i64,
        file_size: i64,
        offline_signing: bool,
    ) -> Result<(), BoxError>;
}

/// Signs the buyer channel commit that funds the escrow.
#[async_trait]
pub trait CommitSigner: Send + Sync {
    /// Renter key the commit is paid from.
    fn payer(&self) -> PublicKey;

    /// Signature over the commit's canonical bytes.
    async fn sign_commit(
        &self,
        session_id: &str,
        commit: &ChannelCommit,
        offline_signing: bool,
    ) -> Result<Vec<u8>, BoxError>;
}

/// The escrow authority's RPC surface.
#[async_trait]
pub trait EscrowService: Send + Sync {
    /// `Ok(None)` means the authority answered with no message at all.
    async fn submit_contracts(
        &self,
        ctx: &CallContext,
        request: EscrowContractRequest,
    ) -> Result<Option<SignedSubmitContractResult>, RpcError>;
}

/// Signs commits with a key held by this process.
pub struct LocalCommitSigner {
    keypair: KeyPair,
}

impl LocalCommitSigner {
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl CommitSigner for LocalCommitSigner {
    fn payer(&self) -> PublicKey {
        self.keypair.public_key()
    }

    async fn sign_commit(
        &self,
        session_id: &str,
        commit: &ChannelCommit,
        offline_signing: bool,
    ) -> Result<Vec<u8>, BoxError> {
        if offline_signing {
            return Err(format!(
                "session {session_id} requires offline signing; no local key may be used"
            )
            .into());
        }
        Ok(sign_message(commit, &self.keypair).to_vec())
    }
}
