//! The condition AST.
//!
//! A condition is either a *leaf* performing one external read (`time`,
//! `rpc`, `contract`, `json-api`, `json-rpc`) or a *multi-condition*
//! combining children (`compound`, `sequential`). The wire format tags every
//! node with `conditionType`, and [`Condition`] dispatches on that tag.
//!
//! Construction and deserialization share the same validation: a tree built
//! programmatically through the variant constructors and a tree decoded from
//! JSON satisfy identical invariants. Multi-condition nesting is bounded at
//! [`MAX_MULTI_CONDITION_DEPTH`] levels, and `and`/`or`/`sequential` fan-out
//! at [`MAX_MULTI_CONDITION_PARTS`] children.

pub mod compound;
pub mod contract;
pub mod json_api;
pub mod json_rpc;
pub mod rpc;
pub mod sequential;
pub mod time;

pub use compound::{CompoundCondition, CompoundOperator};
pub use contract::ContractCondition;
pub use json_api::JsonApiCondition;
pub use json_rpc::JsonRpcCondition;
pub use rpc::{RpcCondition, RpcReturnKind, allowed_rpc_method};
pub use sequential::{ConditionVariable, SequentialCondition};
pub use time::{BLOCKTIME_METHOD, TimeCondition};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

use crate::context::{
    collect_context_variables, is_context_variable, string_context_tokens,
};
use crate::error::{InvalidCondition, InvalidConditionLingo};

/// The maximum fan-out of `and`/`or` operands and sequential variables.
pub const MAX_MULTI_CONDITION_PARTS: usize = 5;

/// The maximum nesting depth of multi-conditions (compound or sequential).
pub const MAX_MULTI_CONDITION_DEPTH: usize = 2;

/// An access-control condition, tagged on the wire by `conditionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "conditionType")]
pub enum Condition {
    #[serde(rename = "time")]
    Time(TimeCondition),
    #[serde(rename = "rpc")]
    Rpc(RpcCondition),
    #[serde(rename = "contract")]
    Contract(ContractCondition),
    #[serde(rename = "json-api")]
    JsonApi(JsonApiCondition),
    #[serde(rename = "json-rpc")]
    JsonRpc(JsonRpcCondition),
    #[serde(rename = "compound")]
    Compound(CompoundCondition),
    #[serde(rename = "sequential")]
    Sequential(SequentialCondition),
}

impl Condition {
    /// Decodes and validates a condition from JSON.
    pub fn from_json(json: &str) -> Result<Self, InvalidConditionLingo> {
        let condition: Condition = serde_json::from_str(json)?;
        condition.validate()?;
        Ok(condition)
    }

    /// Serializes this condition to JSON.
    pub fn to_json(&self) -> Result<String, InvalidConditionLingo> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validates the whole tree: per-node schema checks plus the global
    /// nesting bound.
    pub fn validate(&self) -> Result<(), InvalidCondition> {
        self.validate_node()?;
        self.validate_depth()
    }

    /// Per-node schema checks, recursing through multi-conditions.
    pub(crate) fn validate_node(&self) -> Result<(), InvalidCondition> {
        match self {
            Condition::Time(c) => c.validate(),
            Condition::Rpc(c) => c.validate(),
            Condition::Contract(c) => c.validate(),
            Condition::JsonApi(c) => c.validate(),
            Condition::JsonRpc(c) => c.validate(),
            Condition::Compound(c) => c.validate(),
            Condition::Sequential(c) => c.validate(),
        }
    }

    pub(crate) fn validate_depth(&self) -> Result<(), InvalidCondition> {
        if self.multi_condition_depth() > MAX_MULTI_CONDITION_DEPTH {
            return Err(InvalidCondition::new(format!(
                "Only {MAX_MULTI_CONDITION_DEPTH} nested levels of multi-conditions are allowed"
            )));
        }
        Ok(())
    }

    /// The number of multi-condition levels on the deepest path of this tree.
    fn multi_condition_depth(&self) -> usize {
        match self {
            Condition::Compound(c) => {
                1 + c
                    .operands
                    .iter()
                    .map(Condition::multi_condition_depth)
                    .max()
                    .unwrap_or(0)
            }
            Condition::Sequential(c) => {
                1 + c
                    .condition_variables
                    .iter()
                    .map(|v| v.condition.multi_condition_depth())
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Collects every context variable the tree references, excluding names
    /// bound by sequential steps for the positions that can see them.
    pub fn context_requirements(&self) -> BTreeSet<String> {
        let mut required = BTreeSet::new();
        self.collect_requirements(&BTreeSet::new(), &mut required);
        required
    }

    fn collect_requirements(&self, bound: &BTreeSet<String>, out: &mut BTreeSet<String>) {
        let mut referenced = BTreeSet::new();
        match self {
            Condition::Time(c) => {
                collect_context_variables(&c.return_value_test.value, &mut referenced);
            }
            Condition::Rpc(c) => {
                for parameter in c.parameters.iter().flatten() {
                    collect_context_variables(parameter, &mut referenced);
                }
                collect_context_variables(&c.return_value_test.value, &mut referenced);
            }
            Condition::Contract(c) => {
                for parameter in c.parameters.iter().flatten() {
                    collect_context_variables(parameter, &mut referenced);
                }
                collect_context_variables(&c.return_value_test.value, &mut referenced);
            }
            Condition::JsonApi(c) => {
                collect_string_tokens(c.endpoint.as_str(), &mut referenced);
                for value in c.parameters.iter().flatten().map(|(_, v)| v) {
                    collect_context_variables(value, &mut referenced);
                }
                if let Some(query) = &c.query {
                    collect_string_tokens(query, &mut referenced);
                }
                if let Some(token) = &c.authorization_token {
                    referenced.insert(token.clone());
                }
                collect_context_variables(&c.return_value_test.value, &mut referenced);
            }
            Condition::JsonRpc(c) => {
                collect_string_tokens(c.endpoint.as_str(), &mut referenced);
                if let Some(params) = &c.params {
                    collect_context_variables(params, &mut referenced);
                }
                if let Some(query) = &c.query {
                    collect_string_tokens(query, &mut referenced);
                }
                if let Some(token) = &c.authorization_token {
                    referenced.insert(token.clone());
                }
                collect_context_variables(&c.return_value_test.value, &mut referenced);
            }
            Condition::Compound(c) => {
                for operand in &c.operands {
                    operand.collect_requirements(bound, out);
                }
                return;
            }
            Condition::Sequential(c) => {
                let mut bound = bound.clone();
                for variable in &c.condition_variables {
                    variable.condition.collect_requirements(&bound, out);
                    bound.insert(variable.context_token());
                }
                return;
            }
        }
        for name in referenced {
            if !bound.contains(&name) {
                out.insert(name);
            }
        }
    }
}

pub(crate) fn validate_https_endpoint(endpoint: &Url) -> Result<(), InvalidCondition> {
    if endpoint.scheme() != "https" {
        return Err(InvalidCondition::new(format!(
            "Not a valid URL: '{endpoint}'; only https endpoints are permitted"
        )));
    }
    Ok(())
}

pub(crate) fn validate_authorization_token(token: Option<&str>) -> Result<(), InvalidCondition> {
    if let Some(token) = token
        && !is_context_variable(token)
    {
        return Err(InvalidCondition::new(format!(
            "Invalid value for authorization token; expected a context variable, but got '{token}'"
        )));
    }
    Ok(())
}

/// Validates a JSONPath query's syntax. Queries containing context variables
/// only become syntactically checkable after substitution, so they pass here
/// and are checked at evaluation time instead.
pub(crate) fn validate_query(query: Option<&str>) -> Result<(), InvalidCondition> {
    let Some(query) = query else { return Ok(()) };
    if string_context_tokens(query).next().is_some() {
        return Ok(());
    }
    let normalized = normalize_query(query);
    // parse the path by running it over an empty document
    jsonpath_lib::select(&serde_json::Value::Null, &normalized)
        .map(|_| ())
        .map_err(|error| {
            InvalidCondition::new(format!("Invalid JSONPath query '{query}': {error:?}"))
        })
}

/// Accepts the shorthand `ethereum.usd` form by anchoring it at the document
/// root.
pub fn normalize_query(query: &str) -> String {
    if query.starts_with('$') {
        query.to_string()
    } else {
        format!("$.{query}")
    }
}

fn collect_string_tokens(text: &str, out: &mut BTreeSet<String>) {
    for (_, token) in string_context_tokens(text) {
        out.insert(token.to_string());
    }
}
