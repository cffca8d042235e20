//! Context-variable token grammar.
//!
//! A context variable is a `:`-prefixed identifier (`:userAddress`, `:balance`)
//! standing for a slot filled in at evaluation time from the caller-supplied
//! context. Tokens may appear as whole values or embedded inside strings
//! (`"https://api.example.com/v3/:userAddress"`).
//!
//! Two variables are *reserved*: they name authenticated claims that the
//! engine verifies itself rather than plain caller data.

use regex::Regex;
use std::sync::LazyLock;

use crate::value::Value;

/// The generic authenticated user-address slot. Accepts EIP-712 and EIP-4361
/// auth messages; the EIP-712 path is kept for backward compatibility.
pub const USER_ADDRESS_CONTEXT: &str = ":userAddress";

/// The strict user-address slot: EIP-4361 (Sign-In With Ethereum) only.
pub const USER_ADDRESS_EIP4361_CONTEXT: &str = ":userAddressEIP4361";

/// Context variables the engine resolves itself. Everything else must be
/// supplied by the caller.
pub const RESERVED_CONTEXT_VARIABLES: &[&str] =
    &[USER_ADDRESS_CONTEXT, USER_ADDRESS_EIP4361_CONTEXT];

/// Matches a string that is exactly one context-variable token.
static CONTEXT_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:[a-zA-Z_][a-zA-Z0-9_]*$").expect("context variable pattern compiles")
});

/// Finds context-variable tokens embedded in larger strings. Matches are
/// maximal, so `:id` never shadows `:idLong`.
static CONTEXT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":[a-zA-Z_][a-zA-Z0-9_]*").expect("context token pattern compiles"));

/// Returns true when `candidate` is exactly a context-variable token.
pub fn is_context_variable(candidate: &str) -> bool {
    CONTEXT_VARIABLE.is_match(candidate)
}

/// Returns true for the reserved, engine-verified variables.
pub fn is_reserved_context_variable(name: &str) -> bool {
    RESERVED_CONTEXT_VARIABLES.contains(&name)
}

/// Iterates over the context-variable tokens embedded in `text`, in order of
/// appearance, as `(byte_range, token)` pairs.
pub fn string_context_tokens(text: &str) -> impl Iterator<Item = (std::ops::Range<usize>, &str)> {
    CONTEXT_TOKEN
        .find_iter(text)
        .map(|m| (m.range(), m.as_str()))
}

/// Collects every context variable referenced by `value`, recursing through
/// sequences and mappings and scanning string contents for embedded tokens.
pub fn collect_context_variables(value: &Value, out: &mut std::collections::BTreeSet<String>) {
    match value {
        Value::String(s) => {
            if is_context_variable(s) {
                out.insert(s.clone());
            } else {
                for (_, token) in string_context_tokens(s) {
                    out.insert(token.to_string());
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_context_variables(item, out);
            }
        }
        Value::Object(entries) => {
            for item in entries.values() {
                collect_context_variables(item, out);
            }
        }
        _ => {}
    }
}
