//! Condition evaluation.
//!
//! The entry point is [`Verify`]: every condition evaluates to a
//! `(bool, Value)` pair, the boolean deciding whether the gated share is
//! released and the value exposing what the underlying reads observed.
//!
//! Leaf evaluation proceeds in a fixed order: resolve the return-value test
//! against the context, align it with the call's ABI, execute the external
//! read (with endpoint failover), select the indexed element when requested,
//! and apply the comparator. Compound conditions short-circuit left to right;
//! sequential conditions bind each step's result into a scoped child context
//! visible to strictly later steps.
//!
//! Errors abort the evaluation of the enclosing tree: a failed leaf is an
//! error, never `false`.

use async_trait::async_trait;

use lingo_types::conditions::{
    CompoundCondition, CompoundOperator, Condition, SequentialCondition,
};
use lingo_types::context::is_reserved_context_variable;
use lingo_types::lingo::ConditionLingo;
use lingo_types::return_value_test::ReturnValueTest;
use lingo_types::value::Value;

use crate::calls;
use crate::context::{Context, resolve_any_context_variables};
use crate::error::EvaluationError;
use crate::providers::ConditionProviderManager;

/// Evaluation of a condition against providers and a caller-supplied context.
#[async_trait]
pub trait Verify {
    /// Returns whether the condition is satisfied, together with the observed
    /// value(s).
    async fn verify(
        &self,
        providers: &ConditionProviderManager,
        context: &Context,
    ) -> Result<(bool, Value), EvaluationError>;
}

#[async_trait]
impl Verify for Condition {
    async fn verify(
        &self,
        providers: &ConditionProviderManager,
        context: &Context,
    ) -> Result<(bool, Value), EvaluationError> {
        match self {
            Condition::Time(condition) => {
                let test = resolve_return_value_test(&condition.return_value_test, context)?;
                let result = calls::time::execute_time_call(providers, condition.chain).await?;
                finish_leaf(&test, result)
            }
            Condition::Rpc(condition) => {
                let test = resolve_return_value_test(&condition.return_value_test, context)?;
                let result = calls::rpc::execute_rpc_call(condition, providers, context).await?;
                finish_leaf(&test, result)
            }
            Condition::Contract(condition) => {
                let test = resolve_return_value_test(&condition.return_value_test, context)?;
                let test = condition.align_return_value_test(test)?;
                let result =
                    calls::contract::execute_contract_call(condition, providers, context).await?;
                finish_leaf(&test, result)
            }
            Condition::JsonApi(condition) => {
                let test = resolve_return_value_test(&condition.return_value_test, context)?;
                let result =
                    calls::http::execute_json_api_call(condition, providers, context).await?;
                finish_leaf(&test, result)
            }
            Condition::JsonRpc(condition) => {
                let test = resolve_return_value_test(&condition.return_value_test, context)?;
                let result =
                    calls::http::execute_json_rpc_call(condition, providers, context).await?;
                finish_leaf(&test, result)
            }
            Condition::Compound(condition) => condition.verify(providers, context).await,
            Condition::Sequential(condition) => condition.verify(providers, context).await,
        }
    }
}

#[async_trait]
impl Verify for CompoundCondition {
    async fn verify(
        &self,
        providers: &ConditionProviderManager,
        context: &Context,
    ) -> Result<(bool, Value), EvaluationError> {
        match self.operator {
            CompoundOperator::Not => {
                let operand = self
                    .operands
                    .first()
                    .expect("a validated 'not' condition has one operand");
                let (satisfied, value) = operand.verify(providers, context).await?;
                Ok((!satisfied, value))
            }
            CompoundOperator::And => {
                let mut values = Vec::with_capacity(self.operands.len());
                for operand in &self.operands {
                    let (satisfied, value) = operand.verify(providers, context).await?;
                    values.push(value);
                    if !satisfied {
                        return Ok((false, Value::Array(values)));
                    }
                }
                Ok((true, Value::Array(values)))
            }
            CompoundOperator::Or => {
                let mut values = Vec::with_capacity(self.operands.len());
                for operand in &self.operands {
                    let (satisfied, value) = operand.verify(providers, context).await?;
                    values.push(value);
                    if satisfied {
                        return Ok((true, Value::Array(values)));
                    }
                }
                Ok((false, Value::Array(values)))
            }
        }
    }
}

#[async_trait]
impl Verify for SequentialCondition {
    async fn verify(
        &self,
        providers: &ConditionProviderManager,
        context: &Context,
    ) -> Result<(bool, Value), EvaluationError> {
        let mut values = Vec::with_capacity(self.condition_variables.len());
        let mut scoped = context.clone();
        for variable in &self.condition_variables {
            let (satisfied, value) = variable.condition.verify(providers, &scoped).await?;
            values.push(value.clone());
            if !satisfied {
                return Ok((false, Value::Array(values)));
            }
            scoped = scoped.with_binding(variable.context_token(), value);
        }
        Ok((true, Value::Array(values)))
    }
}

#[async_trait]
impl Verify for ConditionLingo {
    /// Evaluates the document's condition, first checking that every
    /// non-reserved context variable the tree references is present.
    async fn verify(
        &self,
        providers: &ConditionProviderManager,
        context: &Context,
    ) -> Result<(bool, Value), EvaluationError> {
        ensure_context_is_complete(&self.condition, context)?;
        self.condition.verify(providers, context).await
    }
}

/// Checks the tree's context requirements up front so a missing variable
/// fails before any network traffic.
pub fn ensure_context_is_complete(
    condition: &Condition,
    context: &Context,
) -> Result<(), EvaluationError> {
    for name in condition.context_requirements() {
        if is_reserved_context_variable(&name) {
            continue;
        }
        if !context.contains(&name) {
            return Err(EvaluationError::MissingContextVariable(name));
        }
    }
    Ok(())
}

/// Resolves a return-value test's expected value against the context.
fn resolve_return_value_test(
    test: &ReturnValueTest,
    context: &Context,
) -> Result<ReturnValueTest, EvaluationError> {
    Ok(ReturnValueTest {
        comparator: test.comparator,
        value: resolve_any_context_variables(&test.value, context)?,
        index: test.index,
    })
}

fn finish_leaf(
    test: &ReturnValueTest,
    result: Value,
) -> Result<(bool, Value), EvaluationError> {
    let satisfied = test.eval(&result).map_err(|error| {
        EvaluationError::RpcExecutionFailed(format!("Return value test failed: {error}"))
    })?;
    tracing::debug!(%satisfied, "Condition leaf evaluated");
    Ok((satisfied, result))
}
