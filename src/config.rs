//! Provider configuration.
//!
//! The provider manager is built from a JSON document mapping chain ids to
//! ordered endpoint lists:
//!
//! ```json
//! {
//!   "137": [
//!     { "http": "https://polygon-rpc.example.com" },
//!     { "http": "https://polygon-fallback.example.com" }
//!   ],
//!   "1": [ { "http": "https://mainnet.example.com" } ]
//! }
//! ```
//!
//! Endpoint order is significant: it is the failover order during evaluation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Configuration for a single RPC endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// HTTP URL for the RPC endpoint.
    pub http: Url,
}

/// Per-chain endpoint configuration, keyed by decimal chain id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig(pub BTreeMap<String, Vec<RpcConfig>>);
