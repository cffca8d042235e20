//! The RPC condition: a raw JSON-RPC read over an allow-listed method.

use serde::{Deserialize, Serialize};

use crate::chain::{self, ChainId};
use crate::error::InvalidCondition;
use crate::return_value_test::ReturnValueTest;
use crate::value::Value;

/// The result domain of an allow-listed RPC method, used both to validate the
/// comparator value statically and to decode the wire result at evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcReturnKind {
    /// A hex-quantity result decoded to an integer (`eth_getBalance`).
    Integer,
}

/// Returns the result kind for a permitted RPC method, or `None` when the
/// method is outside the allow-list. The list is intentionally small; new
/// read-only methods are added here as they are vetted.
pub fn allowed_rpc_method(method: &str) -> Option<RpcReturnKind> {
    match method {
        "eth_getBalance" => Some(RpcReturnKind::Integer),
        _ => None,
    }
}

/// Performs a raw JSON-RPC read on `chain` and compares the result.
///
/// # Wire format
///
/// ```json
/// {
///   "conditionType": "rpc",
///   "chain": 137,
///   "method": "eth_getBalance",
///   "parameters": [":userAddress", "latest"],
///   "returnValueTest": { "comparator": ">=", "value": "10000000000000" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCondition {
    pub chain: ChainId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Value>>,
    pub return_value_test: ReturnValueTest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RpcCondition {
    /// Builds and validates an RPC condition.
    pub fn new(
        chain: ChainId,
        method: impl Into<String>,
        parameters: Option<Vec<Value>>,
        return_value_test: ReturnValueTest,
    ) -> Result<Self, InvalidCondition> {
        let condition = Self {
            chain,
            method: method.into(),
            parameters,
            return_value_test,
            name: None,
        };
        condition.validate()?;
        Ok(condition)
    }

    /// The result kind of this condition's method. Infallible on a validated
    /// condition.
    pub fn return_kind(&self) -> Option<RpcReturnKind> {
        allowed_rpc_method(&self.method)
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidCondition> {
        let Some(kind) = allowed_rpc_method(&self.method) else {
            return Err(InvalidCondition::new(format!(
                "'{}' is not a permitted RPC endpoint for condition evaluation",
                self.method
            )));
        };
        if !chain::is_permitted_chain(self.chain) {
            return Err(InvalidCondition::new(format!(
                "Chain {} is not permitted for condition evaluation",
                self.chain
            )));
        }
        match kind {
            RpcReturnKind::Integer => self.return_value_test.require_integer_value(&self.method),
        }
    }
}
