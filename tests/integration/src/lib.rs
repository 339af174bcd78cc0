//! In-memory stand-ins for the session store, the escrow and ledger
//! authorities, and the payment step, shared by the scenario tests.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use prost::Message;
use shardpay_core::proto::escrow::{
    EscrowContract, EscrowContractRequest, SignedEscrowContract, SignedSubmitContractResult,
    SubmitContractResult,
};
use shardpay_core::proto::ledger::{
    Account, ChannelClosed, ChannelId, CreateAccountResult, PublicKey as WireKey,
    SignedChannelCommit, SignedChannelState,
};
use shardpay_core::{CallContext, CoreError, RpcError, SessionEvent, SessionGate, SessionState};
use shardpay_crypto::{sign_message, verify_message, KeyPair, PublicKey};
use shardpay_ledger::LedgerService;
use shardpay_settlement::{
    BalanceChecker, BoxError, EscrowService, EscrowSubmitter, GuardContract, LocalCommitSigner,
    PaymentTrigger, RenterSession, SettlementOrchestrator, Shard, ShardContracts,
    VerifiedEscrowResult,
};

// =========================================================================
// Session store
// =========================================================================

pub struct StoredShard(ShardContracts);

impl Shard for StoredShard {
    fn contracts(&self) -> Result<ShardContracts, BoxError> {
        Ok(self.0.clone())
    }
}

/// Renter session whose shards live in memory.
pub struct MemorySession {
    id: String,
    gate: SessionGate,
    hashes: Vec<String>,
    shards: DashMap<String, ShardContracts>,
    ctx: CallContext,
}

impl MemorySession {
    /// One shard per price; escrow and guard contracts agree on the amount.
    pub fn with_prices(id: &str, prices: &[i64]) -> Self {
        let shards = DashMap::new();
        let mut hashes = Vec::new();
        for (i, price) in prices.iter().enumerate() {
            let hash = format!("QmShard{i}");
            let escrow = SignedEscrowContract {
                contract: Some(EscrowContract {
                    contract_id: format!("{id}-escrow-{i}"),
                    amount: *price,
                    num_payouts: 1,
                    ..Default::default()
                }),
                buyer_signature: vec![1; 64],
                seller_signature: vec![2; 64],
            };
            shards.insert(
                hash.clone(),
                ShardContracts {
                    signed_escrow_contract: escrow.encode_to_vec(),
                    guard: GuardContract {
                        contract_id: format!("{id}-guard-{i}"),
                        amount: *price,
                    },
                },
            );
            hashes.push(hash);
        }
        Self {
            id: id.to_string(),
            gate: SessionGate::default(),
            hashes,
            shards,
            ctx: CallContext::background(),
        }
    }

    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn state(&self) -> SessionState {
        self.gate.current()
    }

    /// Drop a shard from the store, leaving its hash in the session.
    pub fn lose_shard(&self, index: usize) {
        self.shards.remove(&self.hashes[index]);
    }
}

#[async_trait]
impl RenterSession for MemorySession {
    fn session_id(&self) -> &str {
        &self.id
    }

    fn shard_hashes(&self) -> &[String] {
        &self.hashes
    }

    fn context(&self) -> &CallContext {
        &self.ctx
    }

    async fn transition(&self, event: SessionEvent) -> Result<SessionState, CoreError> {
        self.gate.fire(event)
    }

    async fn shard(&self, hash: &str, index: usize) -> Result<Box<dyn Shard>, BoxError> {
        let contracts = self
            .shards
            .get(hash)
            .map(|s| s.clone())
            .ok_or_else(|| format!("shard {index} ({hash}) not found"))?;
        Ok(Box::new(StoredShard(contracts)))
    }
}

// =========================================================================
// Balance and payment
// =========================================================================

pub struct FixedBalance {
    balance: i64,
    pub calls: AtomicUsize,
}

impl FixedBalance {
    pub fn new(balance: i64) -> Self {
        Self {
            balance,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BalanceChecker for FixedBalance {
    async fn available_balance(&self, _session_id: &str, _offline_signing: bool) -> Result<i64, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub session_id: String,
    pub amount: i64,
    pub file_size: i64,
    pub escrow_total: i64,
}

#[derive(Default)]
pub struct RecordingPayment {
    payments: Mutex<Vec<Payment>>,
}

impl RecordingPayment {
    pub fn payments(&self) -> Vec<Payment> {
        self.payments.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PaymentTrigger for RecordingPayment {
    async fn pay(
        &self,
        session_id: &str,
        result: &VerifiedEscrowResult,
        amount: i64,
        file_size: i64,
        _offline_signing: bool,
    ) -> Result<(), BoxError> {
        self.payments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Payment {
                session_id: session_id.to_string(),
                amount,
                file_size,
                escrow_total: result.total_amount(),
            });
        Ok(())
    }
}

// =========================================================================
// Escrow authority
// =========================================================================

/// Escrow authority that accepts every request and signs the result with
/// `signer`. Signing with a key other than the advertised one models a
/// forged or corrupted response.
pub struct MockEscrowAuthority {
    signer: KeyPair,
    pub calls: AtomicUsize,
    requests: Mutex<Vec<EscrowContractRequest>>,
}

impl MockEscrowAuthority {
    pub fn new(signer: KeyPair) -> Self {
        Self {
            signer,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<EscrowContractRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl EscrowService for MockEscrowAuthority {
    async fn submit_contracts(
        &self,
        ctx: &CallContext,
        request: EscrowContractRequest,
    ) -> Result<Option<SignedSubmitContractResult>, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.run("SubmitContracts", async { Ok(()) }).await?;

        let buyer_address = request
            .buyer_channel
            .as_ref()
            .and_then(|c| c.channel.as_ref())
            .and_then(|c| c.payer.as_ref())
            .map(|k| k.key.clone())
            .unwrap_or_default();
        let result = SubmitContractResult {
            buyer_address,
            contract_ids: request
                .contract
                .iter()
                .filter_map(|c| c.contract.as_ref().map(|c| c.contract_id.clone()))
                .collect(),
            total_amount: request.declared_amount().unwrap_or_default(),
            buyer_channel_id: Some(ChannelId { id: 1 }),
        };
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let escrow_signature = sign_message(&result, &self.signer).to_vec();
        Ok(Some(SignedSubmitContractResult {
            result: Some(result),
            escrow_signature,
        }))
    }
}

// =========================================================================
// Ledger authority
// =========================================================================

/// Ledger authority that enforces what the real one does on close: both
/// signatures must verify and sequences must strictly increase per channel.
#[derive(Default)]
pub struct MockLedgerAuthority {
    accounts: DashMap<Vec<u8>, i64>,
    channels: DashMap<i64, SignedChannelCommit>,
    closed: DashMap<i64, i64>,
    next_channel: AtomicI64,
    pub close_calls: AtomicUsize,
}

impl MockLedgerAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, id: i64) -> Option<SignedChannelCommit> {
        self.channels.get(&id).map(|c| c.clone())
    }

    pub fn closed_sequence(&self, id: i64) -> Option<i64> {
        self.closed.get(&id).map(|s| *s)
    }
}

fn rejected(method: &'static str, message: impl Into<String>) -> RpcError {
    RpcError::Status {
        method,
        code: tonic::Code::FailedPrecondition,
        message: message.into(),
    }
}

#[async_trait]
impl LedgerService for MockLedgerAuthority {
    async fn create_account(
        &self,
        _ctx: &CallContext,
        public_key: WireKey,
    ) -> Result<CreateAccountResult, RpcError> {
        let balance = *self.accounts.entry(public_key.key.clone()).or_insert(0);
        Ok(CreateAccountResult {
            account: Some(Account {
                address: Some(public_key),
                balance,
            }),
        })
    }

    async fn create_channel(
        &self,
        _ctx: &CallContext,
        commit: SignedChannelCommit,
    ) -> Result<ChannelId, RpcError> {
        let payload = commit
            .channel
            .as_ref()
            .ok_or_else(|| rejected("CreateChannel", "missing commit"))?;
        let payer = payload
            .payer
            .as_ref()
            .and_then(|k| PublicKey::from_proto(k).ok())
            .ok_or_else(|| rejected("CreateChannel", "bad payer key"))?;
        verify_message(payload, &commit.signature, &payer)
            .map_err(|_| rejected("CreateChannel", "bad commit signature"))?;

        let id = self.next_channel.fetch_add(1, Ordering::SeqCst) + 1;
        self.channels.insert(id, commit);
        Ok(ChannelId { id })
    }

    async fn close_channel(
        &self,
        _ctx: &CallContext,
        signed: SignedChannelState,
    ) -> Result<ChannelClosed, RpcError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let state = signed
            .channel
            .as_ref()
            .ok_or_else(|| rejected("CloseChannel", "missing state"))?;
        let id = state
            .channel_id()
            .ok_or_else(|| rejected("CloseChannel", "missing channel id"))?;

        for (account, signature) in [
            (state.from.as_ref(), &signed.from_signature),
            (state.to.as_ref(), &signed.to_signature),
        ] {
            let key = account
                .and_then(|a| a.address.as_ref())
                .and_then(|k| PublicKey::from_proto(k).ok())
                .ok_or_else(|| rejected("CloseChannel", "bad account address"))?;
            verify_message(state, signature, &key)
                .map_err(|_| rejected("CloseChannel", "bad state signature"))?;
        }

        let mut latest = self.closed.entry(id).or_insert(0);
        if state.sequence <= *latest {
            return Err(rejected("CloseChannel", format!("stale sequence {}", state.sequence)));
        }
        *latest = state.sequence;
        drop(latest);

        Ok(ChannelClosed {
            state: Some(signed),
        })
    }
}

// =========================================================================
// Wiring
// =========================================================================

/// An orchestrator wired to in-memory collaborators.
pub struct SettlementHarness {
    pub orchestrator: SettlementOrchestrator,
    pub escrow: Arc<MockEscrowAuthority>,
    pub balance: Arc<FixedBalance>,
    pub payment: Arc<RecordingPayment>,
    pub renter: PublicKey,
}

impl SettlementHarness {
    /// Escrow responses are signed by the advertised authority key.
    pub fn honest(balance: i64) -> Self {
        let authority = KeyPair::generate();
        let advertised = authority.public_key();
        Self::build(authority, advertised, balance)
    }

    /// Escrow responses are signed by a key other than the advertised one.
    pub fn forged(balance: i64) -> Self {
        let advertised = KeyPair::generate().public_key();
        Self::build(KeyPair::generate(), advertised, balance)
    }

    fn build(signer: KeyPair, advertised: PublicKey, balance: i64) -> Self {
        let renter_key = KeyPair::generate();
        let renter = renter_key.public_key();
        let escrow = Arc::new(MockEscrowAuthority::new(signer));
        let balance = Arc::new(FixedBalance::new(balance));
        let payment = Arc::new(RecordingPayment::default());

        let orchestrator = SettlementOrchestrator::new(
            EscrowSubmitter::new(escrow.clone(), advertised),
            balance.clone(),
            Arc::new(LocalCommitSigner::new(renter_key)),
            payment.clone(),
        );
        Self {
            orchestrator,
            escrow,
            balance,
            payment,
            renter,
        }
    }

    pub fn escrow_calls(&self) -> usize {
        self.escrow.calls.load(Ordering::SeqCst)
    }
}
