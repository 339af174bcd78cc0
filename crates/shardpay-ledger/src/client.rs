use std::sync::Arc;

use shardpay_core::proto::ledger::{
    Account, ChannelClosed, ChannelId, ChannelState, SignedChannelCommit, SignedChannelState,
};
use shardpay_core::{CallContext, Connection, RpcConfig, ServicesConfig};
use shardpay_crypto::{sign_message, verify_message, KeyPair, PublicKey};

use crate::channel::ChannelStateTracker;
use crate::error::{LedgerError, Party};
use crate::messages::new_channel_commit;
use crate::service::{GrpcLedgerService, LedgerService};

/// Client for the ledger authority.
///
/// Every remote operation is a single RPC. Channel closes are checked
/// locally first (both signatures and sequence monotonicity) so that a
/// state the authority must reject is never sent.
pub struct LedgerClient {
    service: Arc<dyn LedgerService>,
    tracker: Arc<ChannelStateTracker>,
}

impl LedgerClient {
    pub fn new(service: Arc<dyn LedgerService>) -> Self {
        Self {
            service,
            tracker: Arc::new(ChannelStateTracker::new()),
        }
    }

    /// Share a sequence tracker with other clients of the same ledger.
    pub fn with_tracker(service: Arc<dyn LedgerService>, tracker: Arc<ChannelStateTracker>) -> Self {
        Self { service, tracker }
    }

    /// Connect to the ledger authority named in `services`.
    pub async fn connect(services: &ServicesConfig, rpc: &RpcConfig) -> Result<Self, LedgerError> {
        let anchor = services.trust_anchor()?;
        let conn = Connection::open(&services.ledger_domain, anchor.as_ref(), rpc).await?;
        tracing::info!(endpoint = %conn.endpoint(), "connected to ledger authority");
        Ok(Self::new(Arc::new(GrpcLedgerService::new(conn))))
    }

    pub fn tracker(&self) -> &ChannelStateTracker {
        &self.tracker
    }

    /// Generate a fresh identity and register it with the ledger.
    pub async fn create_account(&self, ctx: &CallContext) -> Result<(KeyPair, Account), LedgerError> {
        let keypair = KeyPair::generate();
        let account = self.import_account(ctx, &keypair.public_key()).await?;
        Ok((keypair, account))
    }

    /// Register (or re-attach to) the account for an existing public key.
    pub async fn import_account(
        &self,
        ctx: &CallContext,
        public_key: &PublicKey,
    ) -> Result<Account, LedgerError> {
        let result = self
            .service
            .create_account(ctx, public_key.to_proto())
            .await
            .map_err(|e| {
                tracing::error!(address = %public_key, error = %e, "create account failed");
                LedgerError::from(e)
            })?;

        let account = result
            .account
            .ok_or(LedgerError::EmptyResponse("CreateAccount"))?;
        tracing::info!(address = %public_key, balance = account.balance, "ledger account ready");
        Ok(account)
    }

    /// Open a channel from a signed commit.
    pub async fn create_channel(
        &self,
        ctx: &CallContext,
        commit: SignedChannelCommit,
    ) -> Result<ChannelId, LedgerError> {
        if commit.channel.is_none() {
            return Err(LedgerError::Malformed("signed commit carries no channel".into()));
        }
        let amount = commit.channel.as_ref().map_or(0, |c| c.amount);

        let id = self
            .service
            .create_channel(ctx, commit)
            .await
            .map_err(|e| {
                tracing::error!(amount, error = %e, "create channel failed");
                LedgerError::from(e)
            })?;
        tracing::info!(channel_id = id.id, amount, "channel created");
        Ok(id)
    }

    /// Build, sign, and submit a commit from `payer` to `receiver`.
    pub async fn open_channel(
        &self,
        ctx: &CallContext,
        payer: &KeyPair,
        receiver: &PublicKey,
        amount: i64,
    ) -> Result<ChannelId, LedgerError> {
        let commit = new_channel_commit(&payer.public_key(), receiver, amount);
        let signature = sign_message(&commit, payer).to_vec();
        self.create_channel(
            ctx,
            SignedChannelCommit {
                channel: Some(commit),
                signature,
            },
        )
        .await
    }

    /// Next state for `id` after the latest one accepted through this client.
    pub fn next_channel_state(&self, id: ChannelId, from: Account, to: Account) -> ChannelState {
        self.tracker.next_state(id, from, to)
    }

    /// Close a channel with a bilaterally signed state.
    pub async fn close_channel(
        &self,
        ctx: &CallContext,
        signed: SignedChannelState,
    ) -> Result<ChannelClosed, LedgerError> {
        let state = signed
            .channel
            .as_ref()
            .ok_or_else(|| LedgerError::Malformed("signed state carries no channel".into()))?;
        let channel_id = state
            .channel_id()
            .ok_or_else(|| LedgerError::Malformed("channel state has no channel id".into()))?;

        verify_party(state, channel_id, Party::From, &signed.from_signature)?;
        verify_party(state, channel_id, Party::To, &signed.to_signature)?;
        self.tracker.check(state)?;

        let sequence = state.sequence;
        let accepted = state.clone();
        let closed = self
            .service
            .close_channel(ctx, signed)
            .await
            .map_err(|e| {
                tracing::error!(channel_id, sequence, error = %e, "close channel failed");
                LedgerError::from(e)
            })?;

        if let Err(e) = self.tracker.accept(&accepted) {
            // A concurrent close got a newer state recorded first.
            tracing::warn!(channel_id, sequence, error = %e, "closed state superseded locally");
        }
        tracing::info!(channel_id, sequence, "channel closed");
        Ok(closed)
    }
}

/// Sign a channel state as one of its parties.
pub fn sign_channel_state(state: &ChannelState, keypair: &KeyPair) -> Vec<u8> {
    sign_message(state, keypair).to_vec()
}

fn verify_party(
    state: &ChannelState,
    channel_id: i64,
    party: Party,
    signature: &[u8],
) -> Result<(), LedgerError> {
    let account = match party {
        Party::From => state.from.as_ref(),
        Party::To => state.to.as_ref(),
    };
    let address = account
        .and_then(|a| a.address.as_ref())
        .ok_or_else(|| LedgerError::Malformed(format!("{party} account has no address")))?;
    let key = PublicKey::from_proto(address)?;

    verify_message(state, signature, &key)
        .map_err(|_| LedgerError::InvalidSignature { channel_id, party })
}
