//! Compound conditions: boolean combinators over child conditions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conditions::{Condition, MAX_MULTI_CONDITION_PARTS};
use crate::error::InvalidCondition;

/// The boolean operator of a compound condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundOperator {
    And,
    Or,
    Not,
}

impl fmt::Display for CompoundOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompoundOperator::And => "and",
            CompoundOperator::Or => "or",
            CompoundOperator::Not => "not",
        };
        f.write_str(s)
    }
}

/// A boolean combinator: `and`/`or` over 2 to [`MAX_MULTI_CONDITION_PARTS`]
/// operands, or a unary `not`. Operand order is preserved from the serialized
/// form and drives short-circuit evaluation.
///
/// # Wire format
///
/// ```json
/// {
///   "conditionType": "compound",
///   "operator": "and",
///   "operands": [ { "conditionType": "time", … }, { "conditionType": "rpc", … } ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundCondition {
    pub operator: CompoundOperator,
    pub operands: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CompoundCondition {
    /// Builds and validates a compound condition.
    pub fn new(
        operator: CompoundOperator,
        operands: Vec<Condition>,
    ) -> Result<Self, InvalidCondition> {
        let condition = Self {
            operator,
            operands,
            name: None,
        };
        condition.validate()?;
        condition.validate_depth_from_root()?;
        Ok(condition)
    }

    /// `and` over the given operands.
    pub fn and(operands: Vec<Condition>) -> Result<Self, InvalidCondition> {
        Self::new(CompoundOperator::And, operands)
    }

    /// `or` over the given operands.
    pub fn or(operands: Vec<Condition>) -> Result<Self, InvalidCondition> {
        Self::new(CompoundOperator::Or, operands)
    }

    /// `not` over a single operand.
    pub fn not(operand: Condition) -> Result<Self, InvalidCondition> {
        Self::new(CompoundOperator::Not, vec![operand])
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidCondition> {
        let arity = self.operands.len();
        match self.operator {
            CompoundOperator::Not => {
                if arity != 1 {
                    return Err(InvalidCondition::new(format!(
                        "The 'not' operator requires exactly one operand, got {arity}"
                    )));
                }
            }
            CompoundOperator::And | CompoundOperator::Or => {
                if !(2..=MAX_MULTI_CONDITION_PARTS).contains(&arity) {
                    return Err(InvalidCondition::new(format!(
                        "The '{}' operator requires 2 to {MAX_MULTI_CONDITION_PARTS} operands, got {arity}",
                        self.operator
                    )));
                }
            }
        }
        for operand in &self.operands {
            operand.validate_node()?;
        }
        Ok(())
    }

    fn validate_depth_from_root(&self) -> Result<(), InvalidCondition> {
        Condition::Compound(self.clone()).validate_depth()
    }
}
