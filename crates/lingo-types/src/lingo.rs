//! The versioned Lingo document: the top-level wire format.
//!
//! A Lingo document wraps exactly one condition together with the version of
//! the condition language it was written in:
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "condition": { "conditionType": "time", … }
//! }
//! ```
//!
//! Documents are accepted when their major version matches the engine's;
//! minor and patch differences are tolerated.

use serde::{Deserialize, Serialize};

use crate::conditions::Condition;
use crate::error::{InvalidCondition, InvalidConditionLingo};

/// The condition-language version this engine speaks.
pub const CONDITION_LINGO_VERSION: &str = "1.0.0";

/// A versioned root document wrapping a single condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionLingo {
    pub version: String,
    pub condition: Condition,
}

impl ConditionLingo {
    /// Wraps a validated condition at the current language version.
    pub fn new(condition: Condition) -> Result<Self, InvalidCondition> {
        condition.validate()?;
        Ok(Self {
            version: CONDITION_LINGO_VERSION.to_string(),
            condition,
        })
    }

    /// Decodes and validates a Lingo document from JSON.
    pub fn from_json(json: &str) -> Result<Self, InvalidConditionLingo> {
        let lingo: ConditionLingo = serde_json::from_str(json)?;
        check_version_compatibility(&lingo.version)?;
        lingo.condition.validate()?;
        Ok(lingo)
    }

    /// Serializes this document to JSON.
    pub fn to_json(&self) -> Result<String, InvalidConditionLingo> {
        Ok(serde_json::to_string(self)?)
    }
}

fn check_version_compatibility(version: &str) -> Result<(), InvalidConditionLingo> {
    let major = version
        .split('.')
        .next()
        .and_then(|part| part.parse::<u64>().ok())
        .ok_or_else(|| {
            InvalidConditionLingo::new(format!("Invalid condition lingo version '{version}'"))
        })?;
    let supported_major: u64 = CONDITION_LINGO_VERSION
        .split('.')
        .next()
        .and_then(|part| part.parse().ok())
        .expect("the engine version constant is well formed");
    if major != supported_major {
        return Err(InvalidConditionLingo::new(format!(
            "Version {version} is not compatible with supported version {CONDITION_LINGO_VERSION}"
        )));
    }
    Ok(())
}
