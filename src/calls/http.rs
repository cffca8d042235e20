//! HTTPS JSON requests for `json-api` and `json-rpc` conditions.

use reqwest::header::AUTHORIZATION;
use std::sync::LazyLock;
use url::Url;

use lingo_types::conditions::{JsonApiCondition, JsonRpcCondition, normalize_query};
use lingo_types::value::Value;

use crate::calls::transport_json;
use crate::context::{Context, get_context_value, substitute_into_string};
use crate::error::EvaluationError;
use crate::providers::ConditionProviderManager;

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(reqwest::Client::new);

/// Executes a `json-api` condition: an HTTPS GET with query parameters and an
/// optional bearer token, narrowed by an optional JSONPath query.
pub(crate) async fn execute_json_api_call(
    condition: &JsonApiCondition,
    providers: &ConditionProviderManager,
    context: &Context,
) -> Result<Value, EvaluationError> {
    let endpoint = resolve_endpoint(condition.endpoint.as_str(), context)?;

    let mut request = HTTP_CLIENT
        .get(endpoint.clone())
        .timeout(providers.http_timeout());
    if let Some(parameters) = &condition.parameters {
        let mut pairs = Vec::with_capacity(parameters.len());
        for (key, value) in parameters {
            let resolved = crate::context::resolve_any_context_variables(value, context)?;
            pairs.push((key.clone(), resolved.to_string()));
        }
        request = request.query(&pairs);
    }
    request = authorize(request, condition.authorization_token.as_deref(), context)?;

    tracing::debug!(endpoint = %endpoint, "Fetching JSON API condition");
    let data = fetch_json(request, endpoint.as_str()).await?;
    let outcome = match &condition.query {
        Some(query) => apply_query(&data, query, context)?,
        None => data,
    };
    Ok(Value::from(outcome))
}

/// Executes a `json-rpc` condition: a JSON-RPC 2.0 POST, error checking, and
/// `result` extraction, narrowed by an optional JSONPath query.
pub(crate) async fn execute_json_rpc_call(
    condition: &JsonRpcCondition,
    providers: &ConditionProviderManager,
    context: &Context,
) -> Result<Value, EvaluationError> {
    let endpoint = resolve_endpoint(condition.endpoint.as_str(), context)?;

    let params = match &condition.params {
        Some(params) => {
            let resolved = crate::context::resolve_any_context_variables(params, context)?;
            transport_json(&resolved)
        }
        None => serde_json::json!([]),
    };
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": condition.method,
        "params": params,
        "id": 1,
    });

    let mut request = HTTP_CLIENT
        .post(endpoint.clone())
        .timeout(providers.http_timeout())
        .json(&body);
    request = authorize(request, condition.authorization_token.as_deref(), context)?;

    tracing::debug!(endpoint = %endpoint, method = %condition.method, "Posting JSON RPC condition");
    let data = fetch_json(request, endpoint.as_str()).await?;

    if let Some(error) = data.get("error") {
        let code = error.get("code").cloned().unwrap_or(serde_json::Value::Null);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default();
        return Err(EvaluationError::JsonRequestFailed(format!(
            "JSON RPC request failed with error in response: code={code}, msg={message}"
        )));
    }
    let result = data.get("result").ok_or_else(|| {
        EvaluationError::JsonRequestFailed(format!(
            "Malformed JSON RPC response, no 'result' field - data={data}"
        ))
    })?;

    let outcome = match &condition.query {
        Some(query) => apply_query(result, query, context)?,
        None => result.clone(),
    };
    Ok(Value::from(outcome))
}

/// Substitutes context variables into the endpoint and re-validates the
/// result as an absolute URL.
fn resolve_endpoint(endpoint: &str, context: &Context) -> Result<Url, EvaluationError> {
    let resolved = substitute_into_string(endpoint, context)?;
    Url::parse(&resolved).map_err(|error| {
        EvaluationError::JsonRequestFailed(format!(
            "Resolved endpoint '{resolved}' is not a valid URL: {error}"
        ))
    })
}

/// Attaches `Authorization: Bearer <token>` when the condition carries an
/// authorization-token context variable.
fn authorize(
    request: reqwest::RequestBuilder,
    token: Option<&str>,
    context: &Context,
) -> Result<reqwest::RequestBuilder, EvaluationError> {
    let Some(token) = token else {
        return Ok(request);
    };
    let resolved = get_context_value(token, context)?;
    Ok(request.header(AUTHORIZATION, format!("Bearer {resolved}")))
}

async fn fetch_json(
    request: reqwest::RequestBuilder,
    endpoint: &str,
) -> Result<serde_json::Value, EvaluationError> {
    let response = request.send().await.map_err(|error| {
        EvaluationError::JsonRequestFailed(format!(
            "Failed to fetch from endpoint {endpoint}: {error}"
        ))
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(EvaluationError::JsonRequestFailed(format!(
            "Failed to fetch from endpoint {endpoint}; status code {status}"
        )));
    }
    response.json().await.map_err(|_| {
        EvaluationError::JsonRequestFailed(format!(
            "Failed to extract JSON response from {endpoint}"
        ))
    })
}

/// Applies a single-match JSONPath query. Zero matches or several are both
/// ambiguous.
fn apply_query(
    data: &serde_json::Value,
    query: &str,
    context: &Context,
) -> Result<serde_json::Value, EvaluationError> {
    let resolved = substitute_into_string(query, context)?;
    let normalized = normalize_query(&resolved);
    let matches = jsonpath_lib::select(data, &normalized).map_err(|error| {
        EvaluationError::JsonRequestFailed(format!(
            "Invalid JSONPath query '{resolved}': {error:?}"
        ))
    })?;
    match matches.as_slice() {
        [single] => Ok((*single).clone()),
        other => Err(EvaluationError::JsonRequestFailed(format!(
            "Ambiguous JSONPath query '{resolved}': {} results found",
            other.len()
        ))),
    }
}
