//! JSON-RPC 1.0 client for the node
//!
//! HTTP POST with Basic auth, one request per call. The client itself does
//! no retrying; the control loop decides whether a failure means waiting,
//! reconnecting or giving up.

use crate::error::{Error, Result, RpcError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blockchain tip summary from `getblockchaininfo`
#[derive(Debug, Clone, Deserialize)]
pub struct ChainInfo {
    pub chain: String,
    pub blocks: u64,
}

/// Network statistics from `getmininginfo`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiningInfo {
    #[serde(default)]
    pub networksolps: f64,
    #[serde(default)]
    pub difficulty: f64,
}

/// Wallet balances from `getwalletinfo`, in coin units
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletInfo {
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub immature_balance: f64,
}

impl WalletInfo {
    pub fn total(&self) -> f64 {
        self.balance + self.immature_balance
    }
}

/// JSON-RPC client bound to one node
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    user: String,
    password: String,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Build a client for `url` with Basic-auth credentials.
    pub fn new(url: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(RpcError::Http)?;
        Ok(Self {
            http,
            url: url.into(),
            user: user.into(),
            password: password.into(),
            request_id: AtomicU64::new(0),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let request = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, "rpc call");

        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&request)
            .send()
            .await
            .map_err(RpcError::Http)?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            if status.is_success() {
                Error::Rpc(RpcError::Http(e))
            } else {
                Error::Rpc(RpcError::Status {
                    status: status.as_u16(),
                })
            }
        })?;

        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| err.to_string());
            warn!(method, %message, "rpc error from node");
            return Err(RpcError::Server { message }.into());
        }

        match body.get("result") {
            Some(result) => Ok(result.clone()),
            None => Err(RpcError::MissingResult.into()),
        }
    }

    /// Fetch a fresh block template.
    pub async fn get_block_template(&self) -> Result<Value> {
        let params = json!([{
            "capabilities": ["coinbasetxn", "workid", "coinbase/append"]
        }]);
        self.call("getblocktemplate", params).await
    }

    /// Submit a serialized block. `Ok` carries the node's status string
    /// ("accepted" for a null reply, or a stored-but-deferred status);
    /// every other status becomes [`Error::SubmissionRejected`].
    pub async fn submit_block(&self, block_hex: &str) -> Result<String> {
        let result = self.call("submitblock", json!([block_hex])).await?;

        // null means accepted and validated; a handful of strings mean the
        // node stored the block anyway.
        match result {
            Value::Null => Ok("accepted".to_string()),
            Value::String(status) => match status.as_str() {
                "duplicate" | "inconclusive" | "duplicate-inconclusive" => Ok(status),
                _ => Err(Error::SubmissionRejected { status }),
            },
            other => Err(Error::SubmissionRejected {
                status: other.to_string(),
            }),
        }
    }

    /// Tip height and chain name.
    pub async fn get_blockchain_info(&self) -> Result<ChainInfo> {
        let result = self.call("getblockchaininfo", json!([])).await?;
        serde_json::from_value(result).map_err(|e| Error::Rpc(RpcError::Json(e)))
    }

    /// Network hashrate and difficulty for display.
    pub async fn get_mining_info(&self) -> Result<MiningInfo> {
        let result = self.call("getmininginfo", json!([])).await?;
        serde_json::from_value(result).map_err(|e| Error::Rpc(RpcError::Json(e)))
    }

    /// Wallet balances for display.
    pub async fn get_wallet_info(&self) -> Result<WalletInfo> {
        let result = self.call("getwalletinfo", json!([])).await?;
        serde_json::from_value(result).map_err(|e| Error::Rpc(RpcError::Json(e)))
    }
}
