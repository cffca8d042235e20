//! Execution calls: the external reads performed by leaf conditions.
//!
//! Each leaf kind maps to one call here. On-chain calls (`rpc`, `contract`,
//! `time`) share the endpoint-failover fold: endpoints are tried in the
//! provider manager's declared order, per-endpoint failures are recovered by
//! moving on, and only exhaustion surfaces as
//! [`EvaluationError::RpcExecutionFailed`] carrying the latest error. Context
//! resolution happens before any endpoint is contacted, so a missing context
//! variable is fatal immediately and never retried.

pub mod contract;
pub mod http;
pub mod rpc;
pub mod time;

use alloy_primitives::U256;
use alloy_primitives::aliases::I512;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use lingo_types::value::Value;

use crate::error::EvaluationError;
use crate::providers::{BlockchainEndpoint, EndpointError};

type AttemptFuture<T> = Pin<Box<dyn Future<Output = Result<T, EndpointError>> + Send>>;

/// Tries `attempt` against each endpoint in order, returning the first
/// success. Exhaustion surfaces the latest error.
pub(crate) async fn try_endpoints<T, F>(
    endpoints: &[Arc<dyn BlockchainEndpoint>],
    label: &str,
    attempt: F,
) -> Result<T, EvaluationError>
where
    F: Fn(Arc<dyn BlockchainEndpoint>) -> AttemptFuture<T>,
{
    let mut latest_error = String::new();
    for endpoint in endpoints {
        match attempt(Arc::clone(endpoint)).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                latest_error = format!("RPC call '{label}' failed: {error}");
                tracing::warn!(
                    endpoint = endpoint.label(),
                    "{latest_error}, attempting to try next endpoint."
                );
            }
        }
    }
    Err(EvaluationError::RpcExecutionFailed(format!(
        "RPC call '{label}' failed; latest error - {latest_error}"
    )))
}

/// Parses an Ethereum hex quantity (`"0x1b4"`) into the integer domain.
pub(crate) fn parse_hex_quantity(quantity: &str) -> Result<I512, EndpointError> {
    let digits = quantity
        .strip_prefix("0x")
        .or_else(|| quantity.strip_prefix("0X"))
        .ok_or_else(|| EndpointError::new(format!("'{quantity}' is not a hex quantity")))?;
    let unsigned = U256::from_str_radix(digits, 16)
        .map_err(|error| EndpointError::new(format!("'{quantity}' is not a hex quantity: {error}")))?;
    unsigned
        .to_string()
        .parse()
        .map_err(|_| EndpointError::new(format!("'{quantity}' does not fit the integer domain")))
}

/// Converts a resolved value into transport JSON for an outgoing call. Big
/// integers travel as plain decimal strings.
pub(crate) fn transport_json(value: &Value) -> serde_json::Value {
    match value {
        Value::BigInt(i) => serde_json::Value::String(i.to_string()),
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(transport_json).collect())
        }
        Value::Object(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), transport_json(v)))
                .collect(),
        ),
        other => other.to_json(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyEndpoint {
        label: String,
        calls: AtomicUsize,
        fail_until: usize,
    }

    #[async_trait]
    impl BlockchainEndpoint for FlakyEndpoint {
        fn label(&self) -> &str {
            &self.label
        }

        async fn rpc_call(
            &self,
            _method: &str,
            _params: serde_json::Value,
        ) -> Result<serde_json::Value, EndpointError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_until {
                Err(EndpointError::new("simulated network error"))
            } else {
                Ok(serde_json::json!(self.label.clone()))
            }
        }
    }

    fn flaky(label: &str, fail_until: usize) -> Arc<FlakyEndpoint> {
        Arc::new(FlakyEndpoint {
            label: label.to_string(),
            calls: AtomicUsize::new(0),
            fail_until,
        })
    }

    async fn run(
        endpoints: &[Arc<dyn BlockchainEndpoint>],
    ) -> Result<serde_json::Value, EvaluationError> {
        try_endpoints(endpoints, "eth_getBalance", |endpoint| {
            Box::pin(async move { endpoint.rpc_call("eth_getBalance", serde_json::json!([])).await })
        })
        .await
    }

    #[tokio::test]
    async fn test_first_endpoint_success_stops_iteration() {
        let primary = flaky("primary", 0);
        let fallback = flaky("fallback", 0);
        let endpoints: Vec<Arc<dyn BlockchainEndpoint>> =
            vec![primary.clone(), fallback.clone()];
        let result = run(&endpoints).await.unwrap();
        assert_eq!(result, serde_json::json!("primary"));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failover_to_next_endpoint() {
        let primary = flaky("primary", 10);
        let fallback = flaky("fallback", 0);
        let endpoints: Vec<Arc<dyn BlockchainEndpoint>> =
            vec![primary.clone(), fallback.clone()];
        let result = run(&endpoints).await.unwrap();
        assert_eq!(result, serde_json::json!("fallback"));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_latest_error() {
        let endpoints: Vec<Arc<dyn BlockchainEndpoint>> =
            vec![flaky("primary", 10), flaky("fallback", 10)];
        let error = run(&endpoints).await.unwrap_err();
        match error {
            EvaluationError::RpcExecutionFailed(message) => {
                assert!(message.contains("eth_getBalance"));
                assert!(message.contains("simulated network error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_hex_quantity() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), I512::ZERO);
        assert_eq!(
            parse_hex_quantity("0x1b4").unwrap(),
            I512::try_from(436i64).unwrap()
        );
        assert!(parse_hex_quantity("1b4").is_err());
        assert!(parse_hex_quantity("0xzz").is_err());
    }

    #[test]
    fn test_transport_json_bigints_as_decimal_strings() {
        let value = Value::Array(vec![
            Value::BigInt("18446744073709551616".parse().unwrap()),
            Value::Int(7),
        ]);
        assert_eq!(
            transport_json(&value),
            serde_json::json!(["18446744073709551616", 7])
        );
    }
}
