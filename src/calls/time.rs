//! Block-timestamp reads for `time` conditions.

use lingo_types::chain::ChainId;
use lingo_types::conditions::BLOCKTIME_METHOD;
use lingo_types::value::Value;

use crate::calls::{parse_hex_quantity, try_endpoints};
use crate::error::EvaluationError;
use crate::providers::{ConditionProviderManager, EndpointError};

/// Reads the latest block timestamp of `chain` as an integer, with the usual
/// endpoint failover.
pub(crate) async fn execute_time_call(
    providers: &ConditionProviderManager,
    chain: ChainId,
) -> Result<Value, EvaluationError> {
    let endpoints = providers.web3_endpoints(chain)?;
    tracing::debug!(%chain, "Reading latest block timestamp");
    let timestamp = try_endpoints(endpoints, BLOCKTIME_METHOD, |endpoint| {
        Box::pin(async move {
            let block = endpoint
                .rpc_call("eth_getBlockByNumber", serde_json::json!(["latest", false]))
                .await?;
            let quantity = block
                .get("timestamp")
                .and_then(|t| t.as_str())
                .ok_or_else(|| EndpointError::new("block response has no timestamp"))?;
            parse_hex_quantity(quantity)
        })
    })
    .await?;
    Ok(Value::integer(timestamp))
}
