//! The JSON RPC condition: a JSON-RPC 2.0 POST against an HTTPS endpoint.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::conditions::{validate_authorization_token, validate_https_endpoint, validate_query};
use crate::error::InvalidCondition;
use crate::return_value_test::ReturnValueTest;
use crate::value::Value;

/// POSTs `{"jsonrpc": "2.0", "method": …, "params": …, "id": 1}` to the
/// endpoint, extracts the response's `result` member, optionally narrows it
/// with a single-match JSONPath query, and compares the outcome.
///
/// # Wire format
///
/// ```json
/// {
///   "conditionType": "json-rpc",
///   "endpoint": "https://math.example.com/",
///   "method": "subtract",
///   "params": [42, 23],
///   "returnValueTest": { "comparator": "==", "value": 19 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcCondition {
    pub endpoint: Url,
    pub method: String,
    /// Positional or named call parameters; defaults to an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_token: Option<String>,
    pub return_value_test: ReturnValueTest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl JsonRpcCondition {
    /// Builds and validates a JSON RPC condition.
    pub fn new(
        endpoint: Url,
        method: impl Into<String>,
        params: Option<Value>,
        query: Option<String>,
        authorization_token: Option<String>,
        return_value_test: ReturnValueTest,
    ) -> Result<Self, InvalidCondition> {
        let condition = Self {
            endpoint,
            method: method.into(),
            params,
            query,
            authorization_token,
            return_value_test,
            name: None,
        };
        condition.validate()?;
        Ok(condition)
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidCondition> {
        validate_https_endpoint(&self.endpoint)?;
        if self.method.is_empty() {
            return Err(InvalidCondition::new("Undefined method name"));
        }
        validate_authorization_token(self.authorization_token.as_deref())?;
        validate_query(self.query.as_deref())
    }
}
