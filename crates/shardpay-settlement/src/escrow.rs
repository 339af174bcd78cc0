use std::sync::Arc;

use async_trait::async_trait;
use shardpay_core::proto::escrow::{
    EscrowContractRequest, SignedSubmitContractResult, SubmitContractResult,
};
use shardpay_core::{CallContext, Connection, CoreError, RpcConfig, RpcError, ServicesConfig, TrustAnchor};
use shardpay_crypto::{verify_message, PublicKey};
use tokio::sync::OnceCell;

use crate::error::SettlementError;
use crate::traits::EscrowService;
use crate::types::VerifiedEscrowResult;

/// Submits aggregated contracts and verifies the escrow authority's answer.
pub struct EscrowSubmitter {
    service: Arc<dyn EscrowService>,
    authority_key: PublicKey,
}

impl EscrowSubmitter {
    pub fn new(service: Arc<dyn EscrowService>, authority_key: PublicKey) -> Self {
        Self {
            service,
            authority_key,
        }
    }

    /// Submitter for the escrow authority named in `services`. The
    /// connection is opened on first use and reused afterwards.
    pub fn from_config(services: &ServicesConfig, rpc: &RpcConfig) -> Result<Self, SettlementError> {
        let key_bytes = services.escrow_public_key_bytes()?;
        let authority_key = PublicKey::from_bytes(&key_bytes)
            .map_err(|e| CoreError::Config(format!("services.escrow_public_key: {e}")))?;
        let service = GrpcEscrowService::new(
            services.escrow_domain.clone(),
            services.trust_anchor()?,
            rpc.clone(),
        );
        Ok(Self::new(Arc::new(service), authority_key))
    }

    pub fn authority_key(&self) -> &PublicKey {
        &self.authority_key
    }

    /// Send `request` as one call under `ctx` and verify the signed result.
    ///
    /// A response whose signature does not verify against the authority key
    /// is discarded.
    pub async fn submit(
        &self,
        ctx: &CallContext,
        request: EscrowContractRequest,
    ) -> Result<VerifiedEscrowResult, SettlementError> {
        let contracts = request.contract.len();
        let response = self
            .service
            .submit_contracts(ctx, request)
            .await
            .map_err(|e| {
                tracing::error!(contracts, error = %e, "escrow submission failed");
                SettlementError::from(e)
            })?
            .ok_or(SettlementError::NilResponse)?;

        let SignedSubmitContractResult {
            result,
            escrow_signature,
        } = response;
        // An all-default result decodes from an empty embedded message.
        let result = result
            .filter(|r| *r != SubmitContractResult::default())
            .ok_or(SettlementError::NilResponse)?;

        if let Err(e) = verify_message(&result, &escrow_signature, &self.authority_key) {
            tracing::warn!(
                contracts,
                authority = %self.authority_key,
                "escrow response signature rejected"
            );
            return Err(SettlementError::Verification {
                reason: e.to_string(),
            });
        }

        tracing::info!(
            contracts,
            total_amount = result.total_amount,
            "escrow accepted contracts"
        );
        Ok(VerifiedEscrowResult::new(result, escrow_signature))
    }
}

/// `escrow.EscrowService` over a lazily opened, reused gRPC connection.
///
/// The connection is released when the service is dropped.
pub struct GrpcEscrowService {
    domain: String,
    trust_anchor: Option<TrustAnchor>,
    rpc: RpcConfig,
    conn: OnceCell<Connection>,
}

impl GrpcEscrowService {
    pub const SUBMIT_CONTRACTS: &'static str = "/escrow.EscrowService/SubmitContracts";

    pub fn new(domain: String, trust_anchor: Option<TrustAnchor>, rpc: RpcConfig) -> Self {
        Self {
            domain,
            trust_anchor,
            rpc,
            conn: OnceCell::new(),
        }
    }

    async fn connection(&self) -> Result<&Connection, RpcError> {
        self.conn
            .get_or_try_init(|| Connection::open(&self.domain, self.trust_anchor.as_ref(), &self.rpc))
            .await
    }
}

#[async_trait]
impl EscrowService for GrpcEscrowService {
    async fn submit_contracts(
        &self,
        ctx: &CallContext,
        request: EscrowContractRequest,
    ) -> Result<Option<SignedSubmitContractResult>, RpcError> {
        let conn = self.connection().await?;
        let response = conn
            .unary(ctx, "SubmitContracts", Self::SUBMIT_CONTRACTS, request)
            .await?;
        Ok(Some(response))
    }
}
