//! The time condition: a comparison against the latest block timestamp.

use serde::{Deserialize, Serialize};

use crate::chain::{self, ChainId};
use crate::error::InvalidCondition;
use crate::return_value_test::ReturnValueTest;

/// The only method a time condition may carry.
pub const BLOCKTIME_METHOD: &str = "blocktime";

/// Compares the latest block timestamp of `chain` against the return-value
/// test.
///
/// # Wire format
///
/// ```json
/// {
///   "conditionType": "time",
///   "chain": 137,
///   "method": "blocktime",
///   "returnValueTest": { "comparator": ">", "value": 0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeCondition {
    pub chain: ChainId,
    pub method: String,
    pub return_value_test: ReturnValueTest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TimeCondition {
    /// Builds and validates a time condition.
    pub fn new(chain: ChainId, return_value_test: ReturnValueTest) -> Result<Self, InvalidCondition> {
        let condition = Self {
            chain,
            method: BLOCKTIME_METHOD.to_string(),
            return_value_test,
            name: None,
        };
        condition.validate()?;
        Ok(condition)
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidCondition> {
        if self.method != BLOCKTIME_METHOD {
            return Err(InvalidCondition::new(format!(
                "'{}' is not a valid method for a time condition; only '{BLOCKTIME_METHOD}' is permitted",
                self.method
            )));
        }
        if !chain::is_permitted_chain(self.chain) {
            return Err(InvalidCondition::new(format!(
                "Chain {} is not permitted for condition evaluation",
                self.chain
            )));
        }
        self.return_value_test.require_integer_value(&self.method)
    }
}
