//! JSON-RPC client for `sui_devInspectTransactionBlock`.
//!
//! Requests go through a blocking `ureq` agent on the blocking thread pool so
//! the async read path never stalls a runtime worker.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use card_reader_types::{env_var_or, SuiAddress};
use serde_json::{json, Value};
use tracing::debug;

use crate::inspect::{parse_inspect_response, InspectClient, InspectResult, ViewCall};
use crate::network::{rpc_url_for, SuiNetwork};
use crate::ptb::build_view_transaction;

const DEV_INSPECT_METHOD: &str = "sui_devInspectTransactionBlock";

/// View-call client speaking Sui JSON-RPC.
#[derive(Clone)]
pub struct JsonRpcInspectClient {
    endpoint: String,
    sender: SuiAddress,
    agent: ureq::Agent,
}

impl JsonRpcInspectClient {
    /// Default request timeout in seconds (can be overridden by env).
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default connect timeout in seconds (can be overridden by env).
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    fn default_timeouts() -> (Duration, Duration) {
        let timeout_secs = env_var_or("SUI_RPC_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS);
        let connect_secs =
            env_var_or("SUI_RPC_CONNECT_TIMEOUT_SECS", Self::DEFAULT_CONNECT_TIMEOUT_SECS);
        (
            Duration::from_secs(timeout_secs),
            Duration::from_secs(connect_secs),
        )
    }

    fn build_agent(timeout: Duration, connect_timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(connect_timeout)
            .build()
    }

    /// Create a client for mainnet.
    pub fn mainnet() -> Self {
        Self::new(rpc_url_for(SuiNetwork::Mainnet))
    }

    /// Create a client for testnet.
    pub fn testnet() -> Self {
        Self::new(rpc_url_for(SuiNetwork::Testnet))
    }

    /// Create a client with a custom endpoint.
    pub fn new(endpoint: &str) -> Self {
        let (timeout, connect_timeout) = Self::default_timeouts();
        Self::with_timeouts(endpoint, timeout, connect_timeout)
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(endpoint: &str, timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            sender: SuiAddress::zero(),
            agent: Self::build_agent(timeout, connect_timeout),
        }
    }

    /// Use a specific sender for dev-inspect. Defaults to the zero address.
    pub fn with_sender(mut self, sender: SuiAddress) -> Self {
        self.sender = sender;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the JSON-RPC request body for a view call.
    pub fn request_body(&self, call: &ViewCall) -> Result<Value> {
        let tx_bytes = build_view_transaction(call)?;
        Ok(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": DEV_INSPECT_METHOD,
            "params": [self.sender.as_str(), BASE64.encode(tx_bytes)],
        }))
    }

    fn post(&self, body: &Value) -> Result<Value> {
        let response: Value = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_json(body)
            .map_err(|e| anyhow!("JSON-RPC request failed: {}", e))?
            .into_json()
            .map_err(|e| anyhow!("Failed to parse JSON-RPC response: {}", e))?;

        if let Some(error) = response.get("error") {
            let msg = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(anyhow!("JSON-RPC error: {}", msg));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("No result in JSON-RPC response"))
    }
}

#[async_trait]
impl InspectClient for JsonRpcInspectClient {
    async fn inspect(&self, call: &ViewCall) -> Result<InspectResult> {
        let body = self.request_body(call)?;
        debug!(call = %call.target, endpoint = %self.endpoint, "dev-inspect");

        let client = self.clone();
        let result = tokio::task::spawn_blocking(move || client.post(&body))
            .await
            .context("dev-inspect task panicked")??;

        parse_inspect_response(&result)
            .with_context(|| format!("view call {} failed", call.target))
    }
}
