//! Raw JSON-RPC reads for `rpc` conditions.

use lingo_types::conditions::{RpcCondition, RpcReturnKind};
use lingo_types::value::Value;

use crate::calls::{parse_hex_quantity, transport_json, try_endpoints};
use crate::context::{Context, resolve_any_context_variables};
use crate::error::EvaluationError;
use crate::providers::{ConditionProviderManager, EndpointError};

/// Executes the condition's allow-listed RPC method against the chain's
/// endpoints and decodes the result per the method's return kind.
pub(crate) async fn execute_rpc_call(
    condition: &RpcCondition,
    providers: &ConditionProviderManager,
    context: &Context,
) -> Result<Value, EvaluationError> {
    let mut resolved = Vec::new();
    for parameter in condition.parameters.iter().flatten() {
        resolved.push(resolve_any_context_variables(parameter, context)?);
    }
    let params = serde_json::Value::Array(resolved.iter().map(transport_json).collect());

    let endpoints = providers.web3_endpoints(condition.chain)?;
    let kind = condition
        .return_kind()
        .expect("a validated rpc condition has an allow-listed method");

    let method = condition.method.clone();
    tracing::debug!(method = %method, chain = %condition.chain, "Executing RPC call");
    let raw = try_endpoints(endpoints, &condition.method, move |endpoint| {
        let method = method.clone();
        let params = params.clone();
        Box::pin(async move { endpoint.rpc_call(&method, params).await })
    })
    .await?;

    decode_result(kind, &raw).map_err(|error| {
        EvaluationError::RpcExecutionFailed(format!(
            "RPC call '{}' failed; latest error - {error}",
            condition.method
        ))
    })
}

fn decode_result(kind: RpcReturnKind, raw: &serde_json::Value) -> Result<Value, EndpointError> {
    match kind {
        RpcReturnKind::Integer => match raw {
            serde_json::Value::String(quantity) => {
                parse_hex_quantity(quantity).map(Value::integer)
            }
            serde_json::Value::Number(n) if n.is_i64() => {
                Ok(Value::Int(n.as_i64().expect("checked i64")))
            }
            other => Err(EndpointError::new(format!(
                "expected an integer result, got {other}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_quantity_result() {
        let raw = serde_json::json!("0xde0b6b3a7640000");
        let value = decode_result(RpcReturnKind::Integer, &raw).unwrap();
        assert_eq!(value, Value::Int(1_000_000_000_000_000_000));
    }

    #[test]
    fn test_decode_plain_integer_result() {
        let raw = serde_json::json!(42);
        assert_eq!(
            decode_result(RpcReturnKind::Integer, &raw).unwrap(),
            Value::Int(42)
        );
    }

    #[test]
    fn test_decode_rejects_non_integers() {
        let raw = serde_json::json!({ "not": "an integer" });
        assert!(decode_result(RpcReturnKind::Integer, &raw).is_err());
    }
}
