//! Sequential conditions: ordered evaluation with variable binding.

use serde::{Deserialize, Serialize};

use crate::conditions::{Condition, MAX_MULTI_CONDITION_PARTS};
use crate::context;
use crate::error::InvalidCondition;

/// One step of a sequential condition: the condition to evaluate and the name
/// its result is bound to. Later steps reference the result as `:varName`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionVariable {
    pub var_name: String,
    pub condition: Condition,
}

impl ConditionVariable {
    pub fn new(var_name: impl Into<String>, condition: Condition) -> Result<Self, InvalidCondition> {
        let variable = Self {
            var_name: var_name.into(),
            condition,
        };
        variable.validate()?;
        Ok(variable)
    }

    /// The context-variable token this step binds, colon included.
    pub fn context_token(&self) -> String {
        format!(":{}", self.var_name)
    }

    fn validate(&self) -> Result<(), InvalidCondition> {
        let token = self.context_token();
        if !context::is_context_variable(&token) {
            return Err(InvalidCondition::new(format!(
                "'{}' is not a valid variable name",
                self.var_name
            )));
        }
        if context::is_reserved_context_variable(&token) {
            return Err(InvalidCondition::new(format!(
                "'{}' is a reserved context variable and cannot be rebound",
                self.var_name
            )));
        }
        Ok(())
    }
}

/// An ordered list of named condition steps. Each step's result becomes a
/// context variable visible to strictly later steps; evaluation short-circuits
/// on the first unsatisfied step.
///
/// # Wire format
///
/// ```json
/// {
///   "conditionType": "sequential",
///   "conditionVariables": [
///     { "varName": "balance", "condition": { "conditionType": "rpc", … } },
///     { "varName": "check", "condition": { "conditionType": "contract", … } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialCondition {
    pub condition_variables: Vec<ConditionVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SequentialCondition {
    /// Builds and validates a sequential condition.
    pub fn new(condition_variables: Vec<ConditionVariable>) -> Result<Self, InvalidCondition> {
        let condition = Self {
            condition_variables,
            name: None,
        };
        condition.validate()?;
        Condition::Sequential(condition.clone()).validate_depth()?;
        Ok(condition)
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidCondition> {
        let count = self.condition_variables.len();
        if count == 0 {
            return Err(InvalidCondition::new(
                "A sequential condition requires at least one condition variable",
            ));
        }
        if count > MAX_MULTI_CONDITION_PARTS {
            return Err(InvalidCondition::new(format!(
                "At most {MAX_MULTI_CONDITION_PARTS} condition variables are allowed, got {count}"
            )));
        }
        let mut seen = std::collections::BTreeSet::new();
        for variable in &self.condition_variables {
            variable.validate()?;
            if !seen.insert(variable.var_name.as_str()) {
                return Err(InvalidCondition::new(format!(
                    "Duplicate variable name '{}'",
                    variable.var_name
                )));
            }
            variable.condition.validate_node()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;
    use crate::conditions::time::TimeCondition;
    use crate::return_value_test::{Comparator, ReturnValueTest};

    fn time_condition() -> Condition {
        Condition::Time(
            TimeCondition::new(ChainId::new(137), ReturnValueTest::new(Comparator::Greater, 0i64))
                .unwrap(),
        )
    }

    fn variable(name: &str) -> ConditionVariable {
        ConditionVariable::new(name, time_condition()).unwrap()
    }

    #[test]
    fn test_sequential_condition_construction() {
        let condition =
            SequentialCondition::new(vec![variable("a"), variable("b")]).unwrap();
        assert_eq!(condition.condition_variables.len(), 2);
        assert_eq!(condition.condition_variables[0].context_token(), ":a");
    }

    #[test]
    fn test_at_most_five_steps() {
        let steps: Vec<ConditionVariable> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|n| variable(n))
            .collect();
        assert!(SequentialCondition::new(steps[..5].to_vec()).is_ok());
        assert!(SequentialCondition::new(steps).is_err());
        assert!(SequentialCondition::new(vec![]).is_err());
    }

    #[test]
    fn test_duplicate_variable_names_rejected() {
        let result = SequentialCondition::new(vec![variable("a"), variable("a")]);
        assert!(result.unwrap_err().to_string().contains("Duplicate"));
    }

    #[test]
    fn test_invalid_variable_name_rejected() {
        assert!(ConditionVariable::new("3bad", time_condition()).is_err());
        assert!(ConditionVariable::new("", time_condition()).is_err());
        assert!(ConditionVariable::new("with space", time_condition()).is_err());
    }

    #[test]
    fn test_reserved_names_cannot_be_rebound() {
        let result = ConditionVariable::new("userAddress", time_condition());
        assert!(result.unwrap_err().to_string().contains("reserved"));
    }

    #[test]
    fn test_schema_round_trip() {
        let condition =
            SequentialCondition::new(vec![variable("balance"), variable("check")]).unwrap();
        let wrapped = Condition::Sequential(condition);
        let json = serde_json::to_string(&wrapped).unwrap();
        assert!(json.contains("\"conditionVariables\""));
        assert!(json.contains("\"varName\":\"balance\""));
        let back = Condition::from_json(&json).unwrap();
        assert_eq!(back, wrapped);
    }
}
