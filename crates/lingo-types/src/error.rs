//! Static (construction-time) errors.
//!
//! Schema validation happens when a condition is constructed or deserialized;
//! once a tree validates, none of these errors can surface during evaluation.

/// A condition failed schema validation: a bad URL scheme, a method outside
/// the allow-list, an ABI/method mismatch, an operand arity violation,
/// excessive nesting, and so on.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid condition: {0}")]
pub struct InvalidCondition(pub String);

impl InvalidCondition {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A Lingo document failed to decode: malformed JSON, an unknown
/// `conditionType`, an unsupported version, or an invalid condition inside.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid condition lingo: {0}")]
pub struct InvalidConditionLingo(pub String);

impl InvalidConditionLingo {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<InvalidCondition> for InvalidConditionLingo {
    fn from(error: InvalidCondition) -> Self {
        InvalidConditionLingo(error.0)
    }
}

impl From<serde_json::Error> for InvalidConditionLingo {
    fn from(error: serde_json::Error) -> Self {
        InvalidConditionLingo(error.to_string())
    }
}
