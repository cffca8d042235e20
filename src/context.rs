//! Context-variable resolution.
//!
//! The caller supplies a [`Context`]: a map from `:name` tokens to values.
//! Before a leaf executes, its parameters and its return-value test are walked
//! and every context-variable occurrence is replaced:
//!
//! - A string that *is* a token resolves to the bound value, keeping its type.
//! - Tokens *inside* strings substitute textually. Token matches are maximal,
//!   so `:id` never shadows `:idLong`, and substitution is single-pass: a
//!   resolved value is never re-scanned.
//! - Values bound as `"<digits>n"` big-int sigil strings resolve to integers.
//!
//! The reserved variables `:userAddress` and `:userAddressEIP4361` are not
//! plain values but authenticated claims; resolving them verifies the claim's
//! signature (see [`crate::auth`]).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use lingo_types::context::{is_context_variable, is_reserved_context_variable, string_context_tokens};
use lingo_types::value::Value;

use crate::auth;
use crate::error::EvaluationError;

/// A big-int sigil string: decimal digits with a trailing `n`.
static BIG_INT_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+n$").expect("big-int sigil pattern compiles"));

/// The caller-supplied evaluation context.
///
/// The engine never mutates a caller's context: sequential conditions bind
/// their step results into scoped copies created with [`Context::with_binding`],
/// so concurrent evaluations over one base context stay sound.
#[derive(Debug, Clone, Default)]
pub struct Context {
    entries: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a JSON object keyed by `:name` tokens.
    pub fn from_json(json: serde_json::Value) -> Result<Self, EvaluationError> {
        let serde_json::Value::Object(entries) = json else {
            return Err(EvaluationError::InvalidContextVariableData(
                "context must be a JSON object".to_string(),
            ));
        };
        let mut context = Context::new();
        for (name, value) in entries {
            if !is_context_variable(&name) {
                return Err(EvaluationError::InvalidContextVariableData(format!(
                    "'{name}' is not a valid context variable name"
                )));
            }
            context.entries.insert(name, Value::from(value));
        }
        Ok(context)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns a scoped copy with `name` bound to `value`. The receiver is
    /// untouched.
    pub fn with_binding(&self, name: impl Into<String>, value: Value) -> Context {
        let mut child = self.clone();
        child.entries.insert(name.into(), value);
        child
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Context {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Resolves one context variable by name. Reserved variables route through
/// auth-message verification; everything else is looked up directly. Values
/// bound as big-int sigil strings come back as integers.
pub fn get_context_value(name: &str, context: &Context) -> Result<Value, EvaluationError> {
    if is_reserved_context_variable(name) {
        return auth::resolve_user_address(name, context).map(Value::String);
    }
    let value = context
        .get(name)
        .cloned()
        .ok_or_else(|| EvaluationError::MissingContextVariable(name.to_string()))?;
    Ok(strip_big_int_sigil(value))
}

fn strip_big_int_sigil(value: Value) -> Value {
    if let Value::String(s) = &value
        && BIG_INT_STRING.is_match(s)
    {
        if let Ok(integer) = s[..s.len() - 1].parse() {
            return Value::integer(integer);
        }
    }
    value
}

/// Walks `value` and replaces every context-variable occurrence from
/// `context`. Unbound references fail with
/// [`EvaluationError::MissingContextVariable`].
pub fn resolve_any_context_variables(
    value: &Value,
    context: &Context,
) -> Result<Value, EvaluationError> {
    match value {
        Value::String(s) => resolve_string(s, context),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_any_context_variables(item, context))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(entries) => entries
            .iter()
            .map(|(key, item)| {
                resolve_any_context_variables(item, context).map(|v| (key.clone(), v))
            })
            .collect::<Result<_, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// Resolves a string slot, and its convenience twin for string fields such as
/// endpoints and queries.
fn resolve_string(s: &str, context: &Context) -> Result<Value, EvaluationError> {
    if is_context_variable(s) {
        return get_context_value(s, context);
    }
    substitute_into_string(s, context).map(Value::String)
}

/// Substitutes every embedded token of `text` in a single pass over the
/// original string.
pub fn substitute_into_string(text: &str, context: &Context) -> Result<String, EvaluationError> {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, token) in string_context_tokens(text) {
        out.push_str(&text[cursor..range.start]);
        let value = get_context_value(token, context)?;
        out.push_str(&value.to_string());
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::aliases::I512;
    use std::str::FromStr;

    const UINT256_MAX: &str =
        "115792089237316195423570985008687907853269984665640564039457584007913129639935";
    const INT256_MIN: &str =
        "-57896044618658097711785492504343953926634992332820282019728792003956564819968";

    fn context() -> Context {
        Context::from_iter([
            (":foo", Value::Int(1234)),
            (":bar", Value::String("'BAR'".into())),
        ])
    }

    #[test]
    fn test_resolve_plain_values() {
        let ctx = context();
        let cases = [
            (Value::Array(vec![]), Value::Array(vec![])),
            (Value::Int(42), Value::Int(42)),
            (Value::Bool(true), Value::Bool(true)),
            (Value::String("'bar'".into()), Value::String("'bar'".into())),
            (Value::String(":foo".into()), Value::Int(1234)),
        ];
        for (input, expected) in cases {
            assert_eq!(resolve_any_context_variables(&input, &ctx).unwrap(), expected);
        }
    }

    #[test]
    fn test_resolve_nested_structures() {
        let ctx = context();
        let input = Value::Array(vec![
            Value::String(":foo".into()),
            Value::String(":foo".into()),
            Value::Int(5),
            Value::Array(vec![Value::Int(99), Value::Array(vec![Value::String(":bar".into())])]),
        ]);
        let expected = Value::Array(vec![
            Value::Int(1234),
            Value::Int(1234),
            Value::Int(5),
            Value::Array(vec![
                Value::Int(99),
                Value::Array(vec![Value::String("'BAR'".into())]),
            ]),
        ]);
        assert_eq!(resolve_any_context_variables(&input, &ctx).unwrap(), expected);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let ctx = context();
        let input = Value::Array(vec![Value::String(":foo".into()), Value::Int(7)]);
        let once = resolve_any_context_variables(&input, &ctx).unwrap();
        let twice = resolve_any_context_variables(&once, &ctx).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_context_variable() {
        let ctx = context();
        let result = resolve_any_context_variables(&Value::String(":unknown".into()), &ctx);
        assert!(matches!(
            result,
            Err(EvaluationError::MissingContextVariable(name)) if name == ":unknown"
        ));
    }

    #[test]
    fn test_big_int_sigil_resolution() {
        let ctx = Context::from_iter([
            (":foo", Value::String(format!("{UINT256_MAX}n"))),
            (":bar", Value::String(format!("{INT256_MIN}n"))),
        ]);
        let input = Value::Array(vec![
            Value::String(":foo".into()),
            Value::Int(12),
            Value::String(":bar".into()),
            Value::String("5555555555".into()),
            Value::String("endWith_n".into()),
        ]);
        let resolved = resolve_any_context_variables(&input, &ctx).unwrap();
        assert_eq!(
            resolved,
            Value::Array(vec![
                Value::BigInt(I512::from_str(UINT256_MAX).unwrap()),
                Value::Int(12),
                Value::BigInt(I512::from_str(INT256_MIN).unwrap()),
                // literals without the sigil stay strings
                Value::String("5555555555".into()),
                Value::String("endWith_n".into()),
            ])
        );
    }

    #[test]
    fn test_substitution_inside_strings() {
        let ctx = Context::from_iter([
            (":foo", Value::Int(1234)),
            (":bar", Value::String("BAR".into())),
        ]);
        let cases = [
            (
                "https://api.github.com/user/:foo/:bar",
                "https://api.github.com/user/1234/BAR",
            ),
            (
                "The cost of :bar is $:foo; $:foo is too expensive for :bar",
                "The cost of BAR is $1234; $1234 is too expensive for BAR",
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(
                resolve_any_context_variables(&Value::String(input.into()), &ctx).unwrap(),
                Value::String(expected.into())
            );
        }
    }

    #[test]
    fn test_substitution_inside_graphql_query() {
        let ctx = Context::from_iter([
            (":foo", Value::Int(1234)),
            (":bar", Value::String("BAR".into())),
        ]);
        let query = r#"{ organization(login: ":bar") { teams(first: :foo, userLogins: [":bar"]) { totalCount } } }"#;
        let expected = r#"{ organization(login: "BAR") { teams(first: 1234, userLogins: ["BAR"]) { totalCount } } }"#;
        assert_eq!(
            substitute_into_string(query, &ctx).unwrap(),
            expected
        );
    }

    #[test]
    fn test_substitution_inside_mappings() {
        let ctx = Context::from_iter([
            (":foo", Value::Int(1234)),
            (":bar", Value::String("BAR".into())),
        ]);
        let input = Value::Object(
            [
                ("book_name".to_string(), Value::String(":bar".into())),
                ("price".to_string(), Value::String("$:foo".into())),
                (
                    "description".to_string(),
                    Value::String(":bar is a book about foo and bar.".into()),
                ),
            ]
            .into_iter()
            .collect(),
        );
        let expected = Value::Object(
            [
                ("book_name".to_string(), Value::String("BAR".into())),
                ("price".to_string(), Value::String("$1234".into())),
                (
                    "description".to_string(),
                    Value::String("BAR is a book about foo and bar.".into()),
                ),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(resolve_any_context_variables(&input, &ctx).unwrap(), expected);
    }

    #[test]
    fn test_longest_token_wins() {
        let ctx = Context::from_iter([
            (":id", Value::Int(1)),
            (":idLong", Value::Int(2)),
        ]);
        assert_eq!(
            substitute_into_string("https://h/:id/:idLong", &ctx).unwrap(),
            "https://h/1/2"
        );
    }

    #[test]
    fn test_with_binding_leaves_parent_untouched() {
        let base = context();
        let child = base.with_binding(":balance", Value::Int(42));
        assert!(child.contains(":balance"));
        assert!(!base.contains(":balance"));
    }

    #[test]
    fn test_context_from_json_validates_keys() {
        let json = serde_json::json!({ "noColon": 1 });
        assert!(Context::from_json(json).is_err());
        let json = serde_json::json!({ ":ok": 1 });
        assert!(Context::from_json(json).is_ok());
    }
}
