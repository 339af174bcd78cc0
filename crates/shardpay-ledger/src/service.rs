use async_trait::async_trait;
use shardpay_core::proto::ledger::{
    ChannelClosed, ChannelId, CreateAccountResult, PublicKey, SignedChannelCommit,
    SignedChannelState,
};
use shardpay_core::{CallContext, Connection, RpcError};

/// The ledger authority's RPC surface.
///
/// Each method is exactly one remote call. Implementations must honour the
/// cancellation and deadline carried by `ctx`.
#[async_trait]
pub trait LedgerService: Send + Sync {
    async fn create_account(
        &self,
        ctx: &CallContext,
        public_key: PublicKey,
    ) -> Result<CreateAccountResult, RpcError>;

    async fn create_channel(
        &self,
        ctx: &CallContext,
        commit: SignedChannelCommit,
    ) -> Result<ChannelId, RpcError>;

    async fn close_channel(
        &self,
        ctx: &CallContext,
        state: SignedChannelState,
    ) -> Result<ChannelClosed, RpcError>;
}

/// `ledger.Channels` over a gRPC connection.
pub struct GrpcLedgerService {
    conn: Connection,
}

impl GrpcLedgerService {
    pub const CREATE_ACCOUNT: &'static str = "/ledger.Channels/CreateAccount";
    pub const CREATE_CHANNEL: &'static str = "/ledger.Channels/CreateChannel";
    pub const CLOSE_CHANNEL: &'static str = "/ledger.Channels/CloseChannel";

    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn endpoint(&self) -> &str {
        self.conn.endpoint()
    }

    /// Release the underlying connection.
    pub fn close(&mut self) {
        self.conn.close();
    }
}

#[async_trait]
impl LedgerService for GrpcLedgerService {
    async fn create_account(
        &self,
        ctx: &CallContext,
        public_key: PublicKey,
    ) -> Result<CreateAccountResult, RpcError> {
        self.conn
            .unary(ctx, "CreateAccount", Self::CREATE_ACCOUNT, public_key)
            .await
    }

    async fn create_channel(
        &self,
        ctx: &CallContext,
        commit: SignedChannelCommit,
    ) -> Result<ChannelId, RpcError> {
        self.conn
            .unary(ctx, "CreateChannel", Self::CREATE_CHANNEL, commit)
            .await
    }

    async fn close_channel(
        &self,
        ctx: &CallContext,
        state: SignedChannelState,
    ) -> Result<ChannelClosed, RpcError> {
        self.conn
            .unary(ctx, "CloseChannel", Self::CLOSE_CHANNEL, state)
            .await
    }
}
