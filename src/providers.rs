//! Blockchain endpoints and the condition provider manager.
//!
//! Each chain a node supports maps to an ordered bag of endpoints. A leaf
//! condition asks the manager for its chain's endpoints and tries them in
//! declared order until one answers (see [`crate::calls`] for the failover
//! policy).
//!
//! The [`BlockchainEndpoint`] trait is the engine's entire view of a chain
//! client: a raw JSON-RPC invoke plus a contract-function invoke built on top
//! of it. Production endpoints wrap an Alloy HTTP provider; tests substitute
//! programmable stand-ins.

use alloy_dyn_abi::DynSolValue;
use alloy_dyn_abi::FunctionExt;
use alloy_dyn_abi::JsonAbiExt;
use alloy_json_abi::Function;
use alloy_primitives::{Address, hex};
use alloy_provider::{Provider, RootProvider};
use async_trait::async_trait;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use lingo_types::chain::ChainId;

use crate::config::ProvidersConfig;
use crate::error::EvaluationError;

/// Default bound on HTTP JSON requests made by `json-api` and `json-rpc`
/// conditions.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// An error from a single endpoint attempt. Recoverable: the caller moves on
/// to the next endpoint and only surfaces the last error on exhaustion.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct EndpointError(pub String);

impl EndpointError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The per-endpoint capabilities the engine consumes.
#[async_trait]
pub trait BlockchainEndpoint: Send + Sync {
    /// A stable identifier for logs and duplicate detection, typically the
    /// endpoint URL.
    fn label(&self) -> &str;

    /// Performs a raw JSON-RPC call and returns the `result` member.
    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, EndpointError>;

    /// Invokes a read-only contract function via `eth_call`, returning the
    /// decoded outputs.
    async fn contract_call(
        &self,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, EndpointError> {
        let calldata = function
            .abi_encode_input(args)
            .map_err(|error| EndpointError::new(format!("ABI encoding failed: {error}")))?;
        let params = serde_json::json!([
            { "to": to.to_checksum(None), "data": hex::encode_prefixed(&calldata) },
            "latest",
        ]);
        let result = self.rpc_call("eth_call", params).await?;
        let returndata = result
            .as_str()
            .ok_or_else(|| EndpointError::new("eth_call returned a non-string result"))?;
        let bytes = hex::decode(returndata)
            .map_err(|error| EndpointError::new(format!("Invalid eth_call returndata: {error}")))?;
        function
            .abi_decode_output(&bytes)
            .map_err(|error| EndpointError::new(format!("ABI decoding failed: {error}")))
    }
}

/// A production endpoint backed by an Alloy HTTP provider.
pub struct HttpEndpoint {
    label: String,
    provider: RootProvider,
}

impl HttpEndpoint {
    pub fn new(url: Url) -> Self {
        let label = url.to_string();
        let provider = RootProvider::new_http(url);
        Self { label, provider }
    }
}

#[async_trait]
impl BlockchainEndpoint for HttpEndpoint {
    fn label(&self) -> &str {
        &self.label
    }

    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, EndpointError> {
        let method: Cow<'static, str> = Cow::Owned(method.to_string());
        self.provider
            .raw_request(method, params)
            .await
            .map_err(|error| EndpointError::new(error.to_string()))
    }
}

/// Maps each chain id to its ordered endpoints.
///
/// Endpoints are tried in insertion order; duplicates (by label) are skipped
/// on insert. The manager is read-only during evaluation.
pub struct ConditionProviderManager {
    providers: HashMap<ChainId, Vec<Arc<dyn BlockchainEndpoint>>>,
    http_timeout: Duration,
}

impl Default for ConditionProviderManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionProviderManager {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Builds a manager of [`HttpEndpoint`]s from configuration.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, EvaluationError> {
        let mut manager = Self::new();
        for (chain, endpoints) in &config.0 {
            let chain: u64 = chain.parse().map_err(|_| {
                EvaluationError::InvalidCondition(lingo_types::error::InvalidCondition::new(
                    format!("'{chain}' is not a valid chain id"),
                ))
            })?;
            for endpoint in endpoints {
                manager.add_endpoint(
                    ChainId::new(chain),
                    Arc::new(HttpEndpoint::new(endpoint.http.clone())),
                );
            }
        }
        Ok(manager)
    }

    /// Overrides the HTTP request timeout used by JSON conditions.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    /// Appends an endpoint to a chain's bag, preserving insertion order and
    /// skipping endpoints already present under the same label.
    pub fn add_endpoint(&mut self, chain: ChainId, endpoint: Arc<dyn BlockchainEndpoint>) {
        let endpoints = self.providers.entry(chain).or_default();
        if endpoints.iter().any(|e| e.label() == endpoint.label()) {
            return;
        }
        endpoints.push(endpoint);
    }

    /// The ordered, non-empty endpoints for `chain`.
    pub fn web3_endpoints(
        &self,
        chain: ChainId,
    ) -> Result<&[Arc<dyn BlockchainEndpoint>], EvaluationError> {
        match self.providers.get(&chain) {
            Some(endpoints) if !endpoints.is_empty() => Ok(endpoints),
            _ => Err(EvaluationError::NoConnectionToChain(chain)),
        }
    }
}
