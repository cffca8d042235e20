//! The contract condition: a read-only contract function call.

use alloy_json_abi::Function;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::abi::{
    self, StandardContractType, checksum_address, get_contract_function,
    validate_expected_return_type,
};
use crate::chain::{self, ChainId};
use crate::error::InvalidCondition;
use crate::return_value_test::ReturnValueTest;
use crate::value::Value;

/// Calls a read-only contract function and compares the result.
///
/// Exactly one of `standardContractType` and `functionAbi` binds the method:
/// either the method is resolved in an embedded standard interface, or the
/// caller ships the full function ABI. The contract address is stored, and
/// re-serialized, in EIP-55 checksum form.
///
/// # Wire format
///
/// ```json
/// {
///   "conditionType": "contract",
///   "chain": 137,
///   "contractAddress": "0x5ce9454909639D2D17A3F753ce7d93fa0b9aB12E",
///   "standardContractType": "ERC721",
///   "method": "balanceOf",
///   "parameters": [":userAddress"],
///   "returnValueTest": { "comparator": ">", "value": 0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCondition {
    pub chain: ChainId,
    #[serde(with = "checksum_address")]
    pub contract_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_contract_type: Option<StandardContractType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_abi: Option<Function>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Value>>,
    pub return_value_test: ReturnValueTest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Builder-ish constructors mirroring the two ways of binding a method.
impl ContractCondition {
    pub fn from_standard(
        chain: ChainId,
        contract_address: Address,
        standard_contract_type: StandardContractType,
        method: impl Into<String>,
        parameters: Option<Vec<Value>>,
        return_value_test: ReturnValueTest,
    ) -> Result<Self, InvalidCondition> {
        let condition = Self {
            chain,
            contract_address,
            standard_contract_type: Some(standard_contract_type),
            function_abi: None,
            method: method.into(),
            parameters,
            return_value_test,
            name: None,
        };
        condition.validate()?;
        Ok(condition)
    }

    pub fn from_function_abi(
        chain: ChainId,
        contract_address: Address,
        function_abi: Function,
        parameters: Option<Vec<Value>>,
        return_value_test: ReturnValueTest,
    ) -> Result<Self, InvalidCondition> {
        let method = function_abi.name.clone();
        let condition = Self {
            chain,
            contract_address,
            standard_contract_type: None,
            function_abi: Some(function_abi),
            method,
            parameters,
            return_value_test,
            name: None,
        };
        condition.validate()?;
        Ok(condition)
    }

    /// Resolves the bound contract function. Infallible on a validated
    /// condition.
    pub fn function(&self) -> Result<Function, InvalidCondition> {
        get_contract_function(
            self.standard_contract_type,
            self.function_abi.as_ref(),
            &self.method,
        )
    }

    /// Aligns a resolved return-value test with the bound function's output
    /// type.
    pub fn align_return_value_test(
        &self,
        test: ReturnValueTest,
    ) -> Result<ReturnValueTest, InvalidCondition> {
        let function = self.function()?;
        abi::align_comparator_value_with_abi(&function, test)
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidCondition> {
        if !chain::is_permitted_chain(self.chain) {
            return Err(InvalidCondition::new(format!(
                "Chain {} is not permitted for condition evaluation",
                self.chain
            )));
        }
        if self.standard_contract_type.is_some() == self.function_abi.is_some() {
            return Err(InvalidCondition::new(format!(
                "Provide a standard contract type or function ABI; got ({:?}, {:?})",
                self.standard_contract_type,
                self.function_abi.as_ref().map(|f| f.name.as_str())
            )));
        }
        let function = self.function()?;
        let expected_inputs = function.inputs.len();
        let supplied = self.parameters.as_ref().map(Vec::len).unwrap_or(0);
        if expected_inputs != supplied {
            return Err(InvalidCondition::new(format!(
                "'{}' takes {expected_inputs} parameter(s), got {supplied}",
                self.method
            )));
        }
        validate_expected_return_type(&function, &self.return_value_test)
    }
}
