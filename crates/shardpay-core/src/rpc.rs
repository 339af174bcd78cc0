//! Secured RPC connections to the escrow and ledger authorities.
//!
//! A `Connection` is a scoped guard over a `tonic` channel: it is released
//! when dropped and `close` may be called any number of times. Transport
//! authentication comes from an explicit `TrustAnchor`; without one the
//! channel is plaintext and a warning is logged on every connect.

use std::path::Path;

use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

use crate::config::RpcConfig;
use crate::context::CallContext;
use crate::error::CoreError;

/// RPC failures: transport, authority status, cancellation, and deadline.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("connection to {endpoint} is closed")]
    Closed { endpoint: String },

    #[error("{method} failed ({code:?}): {message}")]
    Status {
        method: &'static str,
        code: tonic::Code,
        message: String,
    },

    #[error("{method} cancelled")]
    Cancelled { method: &'static str },

    #[error("{method} exceeded its deadline")]
    DeadlineExceeded { method: &'static str },
}

impl RpcError {
    /// Classify a status returned by a remote call.
    pub fn from_status(method: &'static str, status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::Cancelled => Self::Cancelled { method },
            tonic::Code::DeadlineExceeded => Self::DeadlineExceeded { method },
            code => Self::Status {
                method,
                code,
                message: status.message().to_string(),
            },
        }
    }

    /// Whether the authority processed the call and refused it, as opposed
    /// to the call never completing.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Status {
                code: tonic::Code::InvalidArgument
                    | tonic::Code::FailedPrecondition
                    | tonic::Code::PermissionDenied
                    | tonic::Code::AlreadyExists
                    | tonic::Code::OutOfRange,
                ..
            }
        )
    }
}

/// Root certificate used to authenticate authority endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    pem: String,
}

impl TrustAnchor {
    pub fn from_pem(pem: impl Into<String>) -> Result<Self, CoreError> {
        let pem = pem.into();
        if !pem.contains("-----BEGIN CERTIFICATE-----") {
            return Err(CoreError::TrustAnchor(
                "no PEM certificate block found".into(),
            ));
        }
        Ok(Self { pem })
    }

    pub fn from_pem_file(path: &Path) -> Result<Self, CoreError> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            CoreError::TrustAnchor(format!("read {}: {e}", path.display()))
        })?;
        Self::from_pem(pem)
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }
}

/// Open channel to one authority endpoint.
pub struct Connection {
    endpoint: String,
    channel: Option<Channel>,
}

impl Connection {
    /// Connect to `domain`, authenticating it against `trust_anchor` when present.
    pub async fn open(
        domain: &str,
        trust_anchor: Option<&TrustAnchor>,
        rpc: &RpcConfig,
    ) -> Result<Self, RpcError> {
        let (uri, endpoint) = build_endpoint(domain, trust_anchor, rpc)?;
        let channel = endpoint.connect().await.map_err(|e| RpcError::Connect {
            endpoint: uri.clone(),
            reason: e.to_string(),
        })?;
        tracing::debug!(endpoint = %uri, tls = trust_anchor.is_some(), "authority connection established");
        Ok(Self {
            endpoint: uri,
            channel: Some(channel),
        })
    }

    /// Like [`Connection::open`] but defers the handshake to the first call.
    /// Must be called from within a tokio runtime.
    pub fn open_lazy(
        domain: &str,
        trust_anchor: Option<&TrustAnchor>,
        rpc: &RpcConfig,
    ) -> Result<Self, RpcError> {
        let (uri, endpoint) = build_endpoint(domain, trust_anchor, rpc)?;
        Ok(Self {
            endpoint: uri,
            channel: Some(endpoint.connect_lazy()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_none()
    }

    /// Handle to the underlying channel. Clones share one transport.
    pub fn channel(&self) -> Result<Channel, RpcError> {
        self.channel.clone().ok_or_else(|| RpcError::Closed {
            endpoint: self.endpoint.clone(),
        })
    }

    /// Issue one unary call under `ctx`.
    ///
    /// `path` is the fully-qualified gRPC route, e.g.
    /// `/ledger.Channels/CreateAccount`.
    pub async fn unary<Req, Resp>(
        &self,
        ctx: &CallContext,
        method: &'static str,
        path: &'static str,
        request: Req,
    ) -> Result<Resp, RpcError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let channel = self.channel()?;
        ctx.run(method, async move {
            let mut grpc = tonic::client::Grpc::new(channel);
            grpc.ready().await.map_err(|e| RpcError::Status {
                method,
                code: tonic::Code::Unavailable,
                message: format!("service not ready: {e}"),
            })?;
            let codec = tonic::codec::ProstCodec::<Req, Resp>::default();
            grpc.unary(tonic::Request::new(request), PathAndQuery::from_static(path), codec)
                .await
                .map(tonic::Response::into_inner)
                .map_err(|status| RpcError::from_status(method, status))
        })
        .await
    }

    /// Release the channel. Idempotent; never fails.
    pub fn close(&mut self) {
        if self.channel.take().is_some() {
            tracing::debug!(endpoint = %self.endpoint, "authority connection closed");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_endpoint(
    domain: &str,
    trust_anchor: Option<&TrustAnchor>,
    rpc: &RpcConfig,
) -> Result<(String, Endpoint), RpcError> {
    let uri = endpoint_uri(domain, trust_anchor.is_some());
    let connect_err = |reason: String| RpcError::Connect {
        endpoint: uri.clone(),
        reason,
    };

    let mut endpoint = Endpoint::from_shared(uri.clone())
        .map_err(|e| connect_err(e.to_string()))?
        .connect_timeout(rpc.connect_timeout())
        .timeout(rpc.timeout());

    match trust_anchor {
        Some(anchor) => {
            let tls = ClientTlsConfig::new()
                .ca_certificate(Certificate::from_pem(anchor.pem()))
                .domain_name(host_of(domain));
            endpoint = endpoint
                .tls_config(tls)
                .map_err(|e| connect_err(e.to_string()))?;
        }
        None => {
            tracing::warn!(endpoint = %uri, "connecting without transport authentication");
        }
    }

    Ok((uri, endpoint))
}

/// Full URI for a configured `host:port`, keeping an explicit scheme if given.
fn endpoint_uri(domain: &str, tls: bool) -> String {
    if domain.contains("://") {
        domain.to_string()
    } else if tls {
        format!("https://{domain}")
    } else {
        format!("http://{domain}")
    }
}

fn host_of(domain: &str) -> String {
    let without_scheme = domain.split("://").last().unwrap_or(domain);
    without_scheme
        .split(['/', ':'])
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}
