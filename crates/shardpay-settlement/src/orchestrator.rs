use std::sync::Arc;

use shardpay_core::proto::escrow::EscrowContractRequest;
use shardpay_core::proto::ledger::SignedChannelCommit;
use shardpay_core::SessionEvent;
use shardpay_ledger::new_channel_commit;

use crate::aggregator::ContractAggregator;
use crate::error::SettlementError;
use crate::escrow::EscrowSubmitter;
use crate::traits::{BalanceChecker, CommitSigner, PaymentTrigger, RenterSession};
use crate::types::{AggregatedContracts, VerifiedEscrowResult};

/// Runs one session's settlement: gate, aggregate, fund check, submit,
/// verify, pay.
pub struct SettlementOrchestrator {
    submitter: EscrowSubmitter,
    balance: Arc<dyn BalanceChecker>,
    signer: Arc<dyn CommitSigner>,
    payment: Arc<dyn PaymentTrigger>,
}

impl SettlementOrchestrator {
    pub fn new(
        submitter: EscrowSubmitter,
        balance: Arc<dyn BalanceChecker>,
        signer: Arc<dyn CommitSigner>,
        payment: Arc<dyn PaymentTrigger>,
    ) -> Self {
        Self {
            submitter,
            balance,
            signer,
            payment,
        }
    }

    /// Settle `session` exactly once.
    ///
    /// The session must accept `ToSubmit` before anything else happens; a
    /// session that already submitted fails here without side effects. Every
    /// later step returns its error as-is and nothing is rolled back.
    pub async fn submit_and_pay(
        &self,
        session: &dyn RenterSession,
        file_size: i64,
        offline_signing: bool,
    ) -> Result<VerifiedEscrowResult, SettlementError> {
        let session_id = session.session_id();

        session
            .transition(SessionEvent::ToSubmit)
            .await
            .map_err(|source| SettlementError::StateTransition {
                session_id: session_id.to_string(),
                source,
            })?;

        let aggregated = ContractAggregator::aggregate(session, session.shard_hashes()).await?;
        let total_price = aggregated.total_price;

        let available = self
            .balance
            .available_balance(session_id, offline_signing)
            .await
            .map_err(SettlementError::BalanceCheck)?;
        if available < total_price {
            tracing::warn!(session_id, available, total_price, "insufficient balance for escrow");
            return Err(SettlementError::InsufficientFunds {
                available,
                required: total_price,
            });
        }

        let request = self.build_request(session_id, aggregated, offline_signing).await?;

        let Some(amount) = request.declared_amount() else {
            tracing::error!(session_id, total_price, "escrow request amounts overflow");
            return Err(SettlementError::DeclaredAmountOverflow {
                aggregated: total_price,
            });
        };
        if amount != total_price {
            tracing::error!(session_id, amount, total_price, "escrow request amount disagrees with guard prices");
            return Err(SettlementError::AmountMismatch {
                aggregated: total_price,
                requested: amount,
            });
        }

        let verified = self.submitter.submit(session.context(), request).await?;

        self.payment
            .pay(session_id, &verified, amount, file_size, offline_signing)
            .await
            .map_err(SettlementError::Payment)?;

        tracing::info!(session_id, amount, file_size, "session settled");
        Ok(verified)
    }

    /// Escrow request: the aggregated contracts plus the renter's signed
    /// commit paying `total_price` to the escrow authority.
    async fn build_request(
        &self,
        session_id: &str,
        aggregated: AggregatedContracts,
        offline_signing: bool,
    ) -> Result<EscrowContractRequest, SettlementError> {
        let commit = new_channel_commit(
            &self.signer.payer(),
            self.submitter.authority_key(),
            aggregated.total_price,
        );
        let signature = self
            .signer
            .sign_commit(session_id, &commit, offline_signing)
            .await
            .map_err(SettlementError::Signing)?;

        Ok(EscrowContractRequest {
            contract: aggregated.contracts,
            buyer_channel: Some(SignedChannelCommit {
                channel: Some(commit),
                signature,
            }),
        })
    }
}
