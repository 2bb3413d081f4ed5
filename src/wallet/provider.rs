use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// EIP-1193 error codes the session reacts to.
pub const USER_REJECTED: i64 = 4001;
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
pub const REQUEST_PENDING: i64 = -32002;
const INTERNAL_ERROR: i64 = -32603;

/// Error returned by a wallet for one request.
#[derive(Debug, Clone, Error, PartialEq, Eq, Deserialize)]
#[error("wallet error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Request interface of an injected/EIP-1193 wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// MetaMask-like wallets support `wallet_revokePermissions`.
    fn is_metamask(&self) -> bool {
        false
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<ProviderError>,
}

/// Wallet reached over HTTP JSON-RPC (e.g. a desktop wallet's local endpoint).
pub struct HttpWalletProvider {
    client: Client,
    url: String,
    next_id: AtomicU64,
    metamask: bool,
}

impl HttpWalletProvider {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            next_id: AtomicU64::new(1),
            metamask: false,
        }
    }

    /// Mark the wallet as supporting MetaMask's permission methods.
    pub fn metamask(mut self, metamask: bool) -> Self {
        self.metamask = metamask;
        self
    }

    async fn send(&self, method: &str, params: Value) -> anyhow::Result<RpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("Wallet request {} {}", id, method);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("wallet endpoint unreachable")?;

        response
            .json::<RpcResponse>()
            .await
            .context("malformed wallet response")
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let response = self
            .send(method, params)
            .await
            .map_err(|e| ProviderError::new(INTERNAL_ERROR, format!("{:#}", e)))?;

        match (response.error, response.result) {
            (Some(error), _) => Err(error),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }

    fn is_metamask(&self) -> bool {
        self.metamask
    }
}
