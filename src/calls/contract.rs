//! Read-only contract function calls for `contract` conditions.
//!
//! Resolved parameters are coerced into ABI values by the bound function's
//! input types, the call goes through `eth_call` with the shared endpoint
//! failover, and decoded outputs come back as condition values: addresses in
//! EIP-55 checksum form, integers in the engine's integer domain, a lone
//! output unwrapped and multiple outputs as a sequence.

use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::Function;
use alloy_primitives::aliases::I512;
use alloy_primitives::{Address, B256, I256, U256, hex};
use std::str::FromStr;

use lingo_types::conditions::ContractCondition;
use lingo_types::value::Value;

use crate::calls::try_endpoints;
use crate::context::{Context, resolve_any_context_variables};
use crate::error::EvaluationError;
use crate::providers::ConditionProviderManager;

pub(crate) async fn execute_contract_call(
    condition: &ContractCondition,
    providers: &ConditionProviderManager,
    context: &Context,
) -> Result<Value, EvaluationError> {
    let function = condition.function()?;

    let mut resolved = Vec::new();
    for parameter in condition.parameters.iter().flatten() {
        resolved.push(resolve_any_context_variables(parameter, context)?);
    }
    let args = bind_arguments(&function, &resolved).map_err(|error| {
        EvaluationError::RpcExecutionFailed(format!(
            "Contract call '{}' failed; latest error - {error}",
            condition.method
        ))
    })?;

    let endpoints = providers.web3_endpoints(condition.chain)?;
    tracing::debug!(
        method = %condition.method,
        contract = %condition.contract_address,
        chain = %condition.chain,
        "Executing contract call"
    );
    let to = condition.contract_address;
    let outputs = try_endpoints(endpoints, &condition.method, move |endpoint| {
        let function = function.clone();
        let args = args.clone();
        Box::pin(async move { endpoint.contract_call(to, &function, &args).await })
    })
    .await?;

    Ok(decode_outputs(&outputs))
}

fn bind_arguments(function: &Function, resolved: &[Value]) -> Result<Vec<DynSolValue>, String> {
    if function.inputs.len() != resolved.len() {
        return Err(format!(
            "'{}' takes {} parameter(s), got {}",
            function.name,
            function.inputs.len(),
            resolved.len()
        ));
    }
    function
        .inputs
        .iter()
        .zip(resolved)
        .map(|(input, value)| {
            let ty = input
                .resolve()
                .map_err(|error| format!("unresolvable input type '{}': {error}", input.ty))?;
            coerce_value(&ty, value)
        })
        .collect()
}

/// Coerces one resolved condition value into the ABI type the function
/// expects.
fn coerce_value(ty: &DynSolType, value: &Value) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::Address => {
            let s = value
                .as_str()
                .ok_or_else(|| format!("expected an address string, got {value:?}"))?;
            Address::from_str(s)
                .map(DynSolValue::Address)
                .map_err(|_| format!("'{s}' is not a valid address"))
        }
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            _ => Err(format!("expected a boolean, got {value:?}")),
        },
        DynSolType::Uint(size) => {
            let integer = value_as_i512(value)
                .ok_or_else(|| format!("expected an unsigned integer, got {value:?}"))?;
            if integer.is_negative() {
                return Err(format!("negative value {integer} for a uint{size} input"));
            }
            U256::from_str(&integer.to_string())
                .map(|u| DynSolValue::Uint(u, *size))
                .map_err(|_| format!("{integer} does not fit uint{size}"))
        }
        DynSolType::Int(size) => {
            let integer = value_as_i512(value)
                .ok_or_else(|| format!("expected an integer, got {value:?}"))?;
            I256::from_str(&integer.to_string())
                .map(|i| DynSolValue::Int(i, *size))
                .map_err(|_| format!("{integer} does not fit int{size}"))
        }
        DynSolType::String => value
            .as_str()
            .map(|s| DynSolValue::String(s.to_string()))
            .ok_or_else(|| format!("expected a string, got {value:?}")),
        DynSolType::Bytes => {
            let s = value
                .as_str()
                .ok_or_else(|| format!("expected a hex string, got {value:?}"))?;
            hex::decode(s)
                .map(|b| DynSolValue::Bytes(b))
                .map_err(|_| format!("'{s}' is not hex-encoded bytes"))
        }
        DynSolType::FixedBytes(len) => {
            let s = value
                .as_str()
                .ok_or_else(|| format!("expected a hex string, got {value:?}"))?;
            let bytes = hex::decode(s).map_err(|_| format!("'{s}' is not hex-encoded bytes"))?;
            if bytes.len() != *len {
                return Err(format!("expected {len} bytes, got {}", bytes.len()));
            }
            let mut word = B256::ZERO;
            word[..*len].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(word, *len))
        }
        DynSolType::Array(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_value(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Array),
            _ => Err(format!("expected a sequence, got {value:?}")),
        },
        DynSolType::FixedArray(inner, len) => match value {
            Value::Array(items) if items.len() == *len => items
                .iter()
                .map(|item| coerce_value(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray),
            _ => Err(format!("expected a sequence of length {len}, got {value:?}")),
        },
        DynSolType::Tuple(types) => match value {
            Value::Array(items) if items.len() == types.len() => types
                .iter()
                .zip(items)
                .map(|(ty, item)| coerce_value(ty, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple),
            _ => Err(format!("expected a tuple of {} values, got {value:?}", types.len())),
        },
        other => Err(format!("unsupported ABI input type '{other}'")),
    }
}

fn value_as_i512(value: &Value) -> Option<I512> {
    match value {
        Value::Int(i) => Some(I512::try_from(*i).expect("i64 fits in 512 bits")),
        Value::BigInt(i) => Some(*i),
        Value::String(s) => {
            let digits = s.strip_suffix('n').unwrap_or(s);
            let unsigned = digits.strip_prefix('-').unwrap_or(digits);
            if !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit()) {
                digits.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Decodes call outputs into condition values; a lone output is unwrapped.
fn decode_outputs(outputs: &[DynSolValue]) -> Value {
    match outputs {
        [single] => sol_value_to_value(single),
        many => Value::Array(many.iter().map(sol_value_to_value).collect()),
    }
}

fn sol_value_to_value(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Uint(u, _) => Value::integer(
            u.to_string().parse().expect("uint256 fits in 512 bits"),
        ),
        DynSolValue::Int(i, _) => Value::integer(
            i.to_string().parse().expect("int256 fits in 512 bits"),
        ),
        DynSolValue::Address(address) => Value::String(address.to_checksum(None)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(hex::encode_prefixed(bytes)),
        DynSolValue::FixedBytes(word, len) => Value::String(hex::encode_prefixed(&word[..*len])),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(sol_value_to_value).collect())
        }
        DynSolValue::CustomStruct { tuple, .. } => {
            Value::Array(tuple.iter().map(sol_value_to_value).collect())
        }
        DynSolValue::Function(f) => Value::String(hex::encode_prefixed(f.as_slice())),
    }
}
