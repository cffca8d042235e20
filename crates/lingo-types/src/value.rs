//! The condition value model.
//!
//! Conditions, their parameters, and their comparator targets all carry values
//! drawn from a JSON-shaped tree: null, booleans, integers, floats, strings,
//! sequences, and string-keyed mappings. Two departures from plain JSON matter
//! for condition evaluation:
//!
//! - **Big integers.** On-chain quantities routinely exceed 64 bits. In
//!   transport they are written as decimal strings with a trailing `n` sigil
//!   (`"115792…935n"`); in memory they are [`Value::BigInt`], backed by a
//!   512-bit signed integer wide enough for both `uint256` and `int256`.
//! - **Loose numeric comparison.** The comparator treats `Int`, `BigInt`,
//!   `Float`, and decimal strings as one numeric domain, so a contract
//!   returning `uint256` compares cleanly against a JSON `7` or a `"7"`.
//!
//! # Serialization
//!
//! ```
//! use lingo_types::value::Value;
//!
//! let value: Value = serde_json::from_str("[1, \"two\", true]").unwrap();
//! assert_eq!(
//!     value,
//!     Value::Array(vec![Value::Int(1), Value::String("two".into()), Value::Bool(true)])
//! );
//! ```

use alloy_primitives::aliases::I512;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A value appearing in a condition: a parameter, a comparator target, or a
/// call result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer. JSON integer literals land here.
    Int(i64),
    /// An integer wider than 64 bits, produced by big-int sigil resolution or
    /// by decoding on-chain quantities.
    BigInt(I512),
    /// A double-precision float.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered sequence.
    Array(Vec<Value>),
    /// A string-keyed mapping.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the string slice if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true when this value is a string.
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Builds a [`Value`] from an `i64`.
    pub fn int(i: i64) -> Self {
        Value::Int(i)
    }

    /// Builds a [`Value::BigInt`] from a 512-bit integer, collapsing to
    /// [`Value::Int`] when the quantity fits in 64 bits.
    pub fn integer(i: I512) -> Self {
        match i64::try_from(i) {
            Ok(small) => Value::Int(small),
            Err(_) => Value::BigInt(i),
        }
    }

    /// Converts into the equivalent `serde_json` tree. Big integers become
    /// their sigil string form (`"<digits>n"`), since JSON numbers cannot
    /// carry them losslessly.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::BigInt(i) => serde_json::Value::String(format!("{i}n")),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Numeric view of this value, if it has one. Decimal strings, with or
    /// without the big-int sigil, count as numeric.
    pub(crate) fn numeric(&self) -> Option<Numeric> {
        match self {
            Value::Int(i) => Some(Numeric::Int(
                I512::try_from(*i).expect("i64 fits in 512 bits"),
            )),
            Value::BigInt(i) => Some(Numeric::Int(*i)),
            Value::Float(f) => Some(Numeric::Float(*f)),
            Value::String(s) => numeric_string(s),
            _ => None,
        }
    }

    /// Equality across the numeric domain; structural equality elsewhere.
    pub(crate) fn loose_eq(&self, other: &Value) -> bool {
        if let (Some(lhs), Some(rhs)) = (self.numeric(), other.numeric()) {
            return lhs.partial_cmp(&rhs) == Some(std::cmp::Ordering::Equal);
        }
        match (self, other) {
            (Value::Array(lhs), Value::Array(rhs)) => {
                lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(l, r)| l.loose_eq(r))
            }
            (Value::Object(lhs), Value::Object(rhs)) => {
                lhs.len() == rhs.len()
                    && lhs
                        .iter()
                        .zip(rhs)
                        .all(|((lk, lv), (rk, rv))| lk == rk && lv.loose_eq(rv))
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    /// Renders the value the way it substitutes into strings: bare strings
    /// without quotes, numbers in decimal, everything else as compact JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::BigInt(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
            other => f.write_str(&other.to_json().to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::BigInt(I512::try_from(u).expect("u64 fits in 512 bits"))
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(json))
    }
}

/// A value projected into the numeric comparison domain.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Numeric {
    Int(I512),
    Float(f64),
}

impl Numeric {
    fn as_f64(&self) -> f64 {
        match self {
            Numeric::Int(i) => i.to_string().parse().unwrap_or(f64::NAN),
            Numeric::Float(f) => *f,
        }
    }

    pub(crate) fn partial_cmp(&self, other: &Numeric) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Numeric::Int(lhs), Numeric::Int(rhs)) => Some(lhs.cmp(rhs)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

/// Parses a decimal string, with an optional trailing big-int sigil, into the
/// numeric domain. Hex strings and free-form text are not numeric.
fn numeric_string(s: &str) -> Option<Numeric> {
    let digits = s.strip_suffix('n').unwrap_or(s);
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if unsigned.is_empty() {
        return None;
    }
    if unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return digits.parse::<I512>().ok().map(Numeric::Int);
    }
    // A plain decimal float such as "0.25"; anything fancier stays a string.
    if let Some((whole, frac)) = unsigned.split_once('.') {
        let plain = !whole.is_empty()
            && !frac.is_empty()
            && whole.bytes().all(|b| b.is_ascii_digit())
            && frac.bytes().all(|b| b.is_ascii_digit());
        if plain {
            return s.parse::<f64>().ok().map(Numeric::Float);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const UINT256_MAX: &str =
        "115792089237316195423570985008687907853269984665640564039457584007913129639935";

    #[test]
    fn test_deserialize_json_scalars() {
        assert_eq!(serde_json::from_str::<Value>("null").unwrap(), Value::Null);
        assert_eq!(
            serde_json::from_str::<Value>("true").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(serde_json::from_str::<Value>("42").unwrap(), Value::Int(42));
        assert_eq!(
            serde_json::from_str::<Value>("4.5").unwrap(),
            Value::Float(4.5)
        );
        assert_eq!(
            serde_json::from_str::<Value>("\"taco\"").unwrap(),
            Value::String("taco".into())
        );
    }

    #[test]
    fn test_u64_overflowing_i64_becomes_bigint() {
        let value: Value = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(
            value,
            Value::BigInt(I512::from_str("18446744073709551615").unwrap())
        );
    }

    #[test]
    fn test_bigint_serializes_with_sigil() {
        let big = Value::BigInt(I512::from_str(UINT256_MAX).unwrap());
        let json = serde_json::to_string(&big).unwrap();
        assert_eq!(json, format!("\"{UINT256_MAX}n\""));
    }

    #[test]
    fn test_integer_collapses_small_values() {
        assert_eq!(Value::integer(I512::try_from(7i64).unwrap()), Value::Int(7));
        let wide = I512::from_str(UINT256_MAX).unwrap();
        assert_eq!(Value::integer(wide), Value::BigInt(wide));
    }

    #[test]
    fn test_loose_eq_across_numeric_kinds() {
        assert!(Value::Int(5).loose_eq(&Value::Float(5.0)));
        assert!(Value::Int(5).loose_eq(&Value::String("5".into())));
        assert!(
            Value::BigInt(I512::from_str(UINT256_MAX).unwrap())
                .loose_eq(&Value::String(format!("{UINT256_MAX}n")))
        );
        assert!(!Value::Int(5).loose_eq(&Value::String("banana".into())));
        assert!(!Value::Int(5).loose_eq(&Value::Bool(true)));
    }

    #[test]
    fn test_loose_eq_recurses_into_sequences() {
        let lhs = Value::Array(vec![Value::Int(1), Value::Float(2.0)]);
        let rhs = Value::Array(vec![Value::Float(1.0), Value::Int(2)]);
        assert!(lhs.loose_eq(&rhs));
    }

    #[test]
    fn test_display_matches_substitution_form() {
        assert_eq!(Value::Int(1234).to_string(), "1234");
        assert_eq!(Value::String("BAR".into()).to_string(), "BAR");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_numeric_rejects_hex_and_text() {
        assert!(Value::String("0x1234".into()).numeric().is_none());
        assert!(Value::String("endWith_n".into()).numeric().is_none());
        assert!(Value::String("".into()).numeric().is_none());
        assert!(Value::String("1e5".into()).numeric().is_none());
    }

    #[test]
    fn test_round_trip_structure() {
        let json = r#"{"a": [1, 2.5, "x"], "b": {"c": null}}"#;
        let value: Value = serde_json::from_str(json).unwrap();
        let back: Value = serde_json::from_str(&serde_json::to_string(&value).unwrap()).unwrap();
        assert_eq!(value, back);
    }
}
