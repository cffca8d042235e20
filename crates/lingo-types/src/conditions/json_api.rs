//! The JSON API condition: an HTTPS GET against a JSON endpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::conditions::{validate_authorization_token, validate_https_endpoint, validate_query};
use crate::error::InvalidCondition;
use crate::return_value_test::ReturnValueTest;
use crate::value::Value;

/// Fetches JSON over HTTPS, optionally narrows it with a single-match
/// JSONPath query, and compares the outcome.
///
/// `parameters` become URL query parameters. `authorizationToken` must be a
/// context variable; its resolved value is sent as a bearer token.
///
/// # Wire format
///
/// ```json
/// {
///   "conditionType": "json-api",
///   "endpoint": "https://api.coingecko.com/api/v3/simple/price",
///   "parameters": { "ids": "ethereum", "vs_currencies": "usd" },
///   "query": "ethereum.usd",
///   "returnValueTest": { "comparator": "==", "value": 0.0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonApiCondition {
    pub endpoint: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_token: Option<String>,
    pub return_value_test: ReturnValueTest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl JsonApiCondition {
    /// Builds and validates a JSON API condition.
    pub fn new(
        endpoint: Url,
        parameters: Option<BTreeMap<String, Value>>,
        query: Option<String>,
        authorization_token: Option<String>,
        return_value_test: ReturnValueTest,
    ) -> Result<Self, InvalidCondition> {
        let condition = Self {
            endpoint,
            parameters,
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
        validate_authorization_token(self.authorization_token.as_deref())?;
        validate_query(self.query.as_deref())
    }
}
