//! JSON-RPC client with node failover
//!
//! This module provides the client used for every Hive API call:
//! - JSON-RPC 2.0 over HTTP POST
//! - Bounded per-attempt timeout
//! - Rotation across a fixed node list on any failure
//!
//! The rotation pointer lives on the client and is never reset between calls,
//! so a node that just failed is not retried first on the next call.

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::RpcConfig;
use crate::utils::error::RpcError;

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    id: u64,
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorPayload {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Hive API client rotating across a fixed list of nodes
pub struct NodeClient {
    /// HTTP client with the per-attempt timeout applied
    client: Client,

    /// Node base URLs in failover order
    nodes: Vec<String>,

    /// Index of the node the next call starts with
    current: AtomicUsize,
}

impl NodeClient {
    /// Create a client for the given nodes
    ///
    /// # Errors
    ///
    /// Returns `RpcError::NoNodes` for an empty node list and
    /// `RpcError::Http` if the HTTP client cannot be created
    pub fn new(nodes: Vec<String>, timeout: Duration) -> Result<Self, RpcError> {
        Self::with_user_agent(
            nodes,
            timeout,
            &format!("hive-exporter/{}", env!("CARGO_PKG_VERSION")),
        )
    }

    /// Create a client from the `[rpc]` configuration section
    pub fn from_config(config: &RpcConfig) -> Result<Self, RpcError> {
        Self::with_user_agent(
            config.nodes.clone(),
            Duration::from_millis(config.timeout_ms),
            &config.user_agent,
        )
    }

    fn with_user_agent(
        nodes: Vec<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, RpcError> {
        if nodes.is_empty() {
            return Err(RpcError::NoNodes);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            nodes,
            current: AtomicUsize::new(0),
        })
    }

    /// Index of the node the next call will try first
    pub fn current_node_index(&self) -> usize {
        self.current.load(Ordering::Acquire) % self.nodes.len()
    }

    /// URL of the node the next call will try first
    pub fn current_node(&self) -> &str {
        &self.nodes[self.current_node_index()]
    }

    /// Call `method` with `params`, failing over across nodes
    ///
    /// Each configured node is tried at most once per call, starting from the
    /// current rotation position. The first successful `result` is returned.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::AllNodesExhausted` once every node has failed
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params: &params,
            id: 1,
        };

        let mut last_error = None;

        for _ in 0..self.nodes.len() {
            let index = self.current_node_index();
            let node = &self.nodes[index];

            match self.call_node(node, &request).await {
                Ok(result) => {
                    tracing::debug!(node = %node, method, "RPC call succeeded");
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(node = %node, method, error = %e, "Node failed, rotating");
                    self.advance(index);
                    last_error = Some(e);
                }
            }
        }

        Err(RpcError::AllNodesExhausted {
            attempts: self.nodes.len(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }

    /// Move the rotation pointer past `failed`, unless another call already did
    fn advance(&self, failed: usize) {
        let next = (failed + 1) % self.nodes.len();
        let _ = self
            .current
            .compare_exchange(failed, next, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Single attempt against one node
    async fn call_node(&self, node: &str, request: &RpcRequest<'_>) -> Result<Value, RpcError> {
        let response = self
            .client
            .post(node)
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(classify)?;
        let envelope: RpcResponse =
            serde_json::from_slice(&bytes).map_err(|e| RpcError::Decode(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(RpcError::Remote {
                code: error.code,
                message: error.message,
            });
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

fn classify(e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        RpcError::Timeout
    } else {
        RpcError::Http(e)
    }
}
