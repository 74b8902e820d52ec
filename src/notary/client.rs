//! Minimal JSON-RPC client for the ledger.
//!
//! The notary needs exactly four methods — nonce, gas price, broadcast,
//! receipt — so the client speaks raw JSON-RPC 2.0 over the crate's existing
//! HTTP stack rather than pulling a full ledger SDK into the tree. All calls
//! carry a request timeout so a dead node fails fast instead of hanging the
//! confirmation wait.

use crate::error::IntakeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from a single RPC call. Internal to the notary: callers of
/// [`crate::notary::Notary`] only ever see a skipped outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// A mined transaction receipt, reduced to what the notary inspects.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    /// "0x1" for success, "0x0" for revert.
    pub status: Option<String>,
    pub block_number: Option<String>,
}

impl TxReceipt {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

/// The four ledger operations the notary performs.
///
/// A trait seam like [`crate::pipeline::render::PageRenderer`]: the
/// confirmation logic is driven against a scripted fake in tests, while
/// [`RpcClient`] is the production transport.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Pending-inclusive nonce for `address`.
    async fn transaction_count(&self, address: &str) -> Result<u64, RpcError>;

    async fn gas_price(&self) -> Result<u128, RpcError>;

    /// Broadcast a signed raw transaction; returns the transaction hash.
    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, RpcError>;

    /// `None` until the transaction is mined.
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TxReceipt>, RpcError>;
}

/// JSON-RPC 2.0 over HTTP.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Per-call request timeout; generous enough for congested public
    /// endpoints, short enough that the receipt-poll loop stays live.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

    pub fn new(url: &str) -> Result<Self, IntakeError> {
        let http = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IntakeError::InvalidConfig(format!("RPC HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, "rpc call");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RpcError::Transport(format!("HTTP {}", response.status())));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(e.to_string()))?;

        if let Some(err) = body.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }
        body.result
            .ok_or_else(|| RpcError::Malformed("neither result nor error present".into()))
    }
}

#[async_trait]
impl LedgerRpc for RpcClient {
    async fn transaction_count(&self, address: &str) -> Result<u64, RpcError> {
        let result = self
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_quantity_u64(&result)
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        let result = self.call("eth_gasPrice", json!([])).await?;
        parse_quantity_u128(&result)
    }

    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, RpcError> {
        let result = self.call("eth_sendRawTransaction", json!([raw_hex])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RpcError::Malformed("transaction hash is not a string".into()))
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TxReceipt>, RpcError> {
        let result = self
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .map_err(|e| RpcError::Malformed(format!("receipt: {e}")))
    }
}

fn parse_quantity_u64(value: &Value) -> Result<u64, RpcError> {
    let s = quantity_str(value)?;
    u64::from_str_radix(s, 16).map_err(|_| RpcError::Malformed(format!("quantity '{s}'")))
}

fn parse_quantity_u128(value: &Value) -> Result<u128, RpcError> {
    let s = quantity_str(value)?;
    u128::from_str_radix(s, 16).map_err(|_| RpcError::Malformed(format!("quantity '{s}'")))
}

fn quantity_str(value: &Value) -> Result<&str, RpcError> {
    value
        .as_str()
        .and_then(|s| s.strip_prefix("0x"))
        .ok_or_else(|| RpcError::Malformed(format!("expected 0x quantity, got {value}")))
}
