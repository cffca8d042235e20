//! Contract ABIs for contract conditions.
//!
//! A contract condition binds its `method` either to one of the embedded
//! standard ABIs (`standardContractType`) or to an explicit `functionAbi`
//! supplied on the wire. Only read-only functions (`view`/`pure`) are
//! permitted; conditions never carry transaction semantics.
//!
//! This module also hosts the ABI-alignment hook: once a return-value test is
//! resolved, its comparand is normalized to the function's output type, so an
//! `address` output compares against an EIP-55 checksummed string and a
//! `uint256` output compares against an integer even when the expected value
//! arrived as a decimal string.

use alloy_json_abi::{Function, JsonAbi, Param, StateMutability};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::InvalidCondition;
use crate::return_value_test::ReturnValueTest;
use crate::value::Value;

/// The standard contract interfaces with embedded read-only ABIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardContractType {
    ERC20,
    ERC721,
    ERC1155,
}

const ERC20_ABI_JSON: &str = r#"[
  {"type": "function", "name": "balanceOf", "stateMutability": "view",
   "inputs": [{"name": "account", "type": "address"}],
   "outputs": [{"name": "", "type": "uint256"}]},
  {"type": "function", "name": "allowance", "stateMutability": "view",
   "inputs": [{"name": "owner", "type": "address"}, {"name": "spender", "type": "address"}],
   "outputs": [{"name": "", "type": "uint256"}]},
  {"type": "function", "name": "totalSupply", "stateMutability": "view",
   "inputs": [],
   "outputs": [{"name": "", "type": "uint256"}]},
  {"type": "function", "name": "decimals", "stateMutability": "view",
   "inputs": [],
   "outputs": [{"name": "", "type": "uint8"}]},
  {"type": "function", "name": "symbol", "stateMutability": "view",
   "inputs": [],
   "outputs": [{"name": "", "type": "string"}]},
  {"type": "function", "name": "name", "stateMutability": "view",
   "inputs": [],
   "outputs": [{"name": "", "type": "string"}]}
]"#;

const ERC721_ABI_JSON: &str = r#"[
  {"type": "function", "name": "balanceOf", "stateMutability": "view",
   "inputs": [{"name": "owner", "type": "address"}],
   "outputs": [{"name": "", "type": "uint256"}]},
  {"type": "function", "name": "ownerOf", "stateMutability": "view",
   "inputs": [{"name": "tokenId", "type": "uint256"}],
   "outputs": [{"name": "", "type": "address"}]},
  {"type": "function", "name": "getApproved", "stateMutability": "view",
   "inputs": [{"name": "tokenId", "type": "uint256"}],
   "outputs": [{"name": "", "type": "address"}]},
  {"type": "function", "name": "isApprovedForAll", "stateMutability": "view",
   "inputs": [{"name": "owner", "type": "address"}, {"name": "operator", "type": "address"}],
   "outputs": [{"name": "", "type": "bool"}]}
]"#;

const ERC1155_ABI_JSON: &str = r#"[
  {"type": "function", "name": "balanceOf", "stateMutability": "view",
   "inputs": [{"name": "account", "type": "address"}, {"name": "id", "type": "uint256"}],
   "outputs": [{"name": "", "type": "uint256"}]},
  {"type": "function", "name": "balanceOfBatch", "stateMutability": "view",
   "inputs": [{"name": "accounts", "type": "address[]"}, {"name": "ids", "type": "uint256[]"}],
   "outputs": [{"name": "", "type": "uint256[]"}]},
  {"type": "function", "name": "isApprovedForAll", "stateMutability": "view",
   "inputs": [{"name": "account", "type": "address"}, {"name": "operator", "type": "address"}],
   "outputs": [{"name": "", "type": "bool"}]}
]"#;

static ERC20_ABI: LazyLock<JsonAbi> =
    LazyLock::new(|| serde_json::from_str(ERC20_ABI_JSON).expect("embedded ERC20 ABI parses"));
static ERC721_ABI: LazyLock<JsonAbi> =
    LazyLock::new(|| serde_json::from_str(ERC721_ABI_JSON).expect("embedded ERC721 ABI parses"));
static ERC1155_ABI: LazyLock<JsonAbi> =
    LazyLock::new(|| serde_json::from_str(ERC1155_ABI_JSON).expect("embedded ERC1155 ABI parses"));

impl StandardContractType {
    /// The embedded read-only ABI for this standard interface.
    pub fn abi(&self) -> &'static JsonAbi {
        match self {
            StandardContractType::ERC20 => &ERC20_ABI,
            StandardContractType::ERC721 => &ERC721_ABI,
            StandardContractType::ERC1155 => &ERC1155_ABI,
        }
    }

    /// Looks up `method` in this interface.
    pub fn function(&self, method: &str) -> Option<&'static Function> {
        self.abi().function(method).and_then(|fns| fns.first())
    }
}

/// Validates an explicit function ABI against the condition's `method`.
pub fn validate_function_abi(function: &Function, method: &str) -> Result<(), InvalidCondition> {
    if function.name != method {
        return Err(InvalidCondition::new(format!(
            "Invalid ABI: name '{}' does not match method '{}'",
            function.name, method
        )));
    }
    if !matches!(
        function.state_mutability,
        StateMutability::Pure | StateMutability::View
    ) {
        return Err(InvalidCondition::new(format!(
            "Invalid ABI: only view and pure functions are permitted, '{}' is not",
            function.name
        )));
    }
    if function.outputs.is_empty() {
        return Err(InvalidCondition::new(format!(
            "Invalid ABI: no outputs defined for method '{}'",
            function.name
        )));
    }
    Ok(())
}

/// Resolves the contract function for a condition: either from the standard
/// interface or from the explicit ABI. Exactly one source must be provided;
/// the caller enforces that.
pub fn get_contract_function(
    standard_contract_type: Option<StandardContractType>,
    function_abi: Option<&Function>,
    method: &str,
) -> Result<Function, InvalidCondition> {
    match (standard_contract_type, function_abi) {
        (Some(standard), None) => standard.function(method).cloned().ok_or_else(|| {
            InvalidCondition::new(format!(
                "'{method}' is not a function of {standard:?}"
            ))
        }),
        (None, Some(function)) => {
            validate_function_abi(function, method)?;
            Ok(function.clone())
        }
        _ => Err(InvalidCondition::new(format!(
            "Provide a standard contract type or function ABI for '{method}', not both or neither"
        ))),
    }
}

/// Selects the output parameter a return-value test observes: the sole output
/// when there is one, or the indexed output of a tuple-typed result.
fn observed_output<'f>(function: &'f Function, index: Option<usize>) -> Option<&'f Param> {
    match (function.outputs.len(), index) {
        (1, None) => function.outputs.first(),
        (n, Some(i)) if i < n => function.outputs.get(i),
        _ => None,
    }
}

/// Statically checks a return-value test's expected value against the
/// function's output type. Context variables are checked at evaluation time
/// instead.
pub fn validate_expected_return_type(
    function: &Function,
    test: &ReturnValueTest,
) -> Result<(), InvalidCondition> {
    if test.is_context_sensitive() {
        return Ok(());
    }
    let Some(output) = observed_output(function, test.index) else {
        return Ok(());
    };
    let ty = output.ty.as_str();
    if ty.starts_with("uint") || ty.starts_with("int") {
        if ty.ends_with(']') {
            return Ok(());
        }
        return test.require_integer_value(&function.name);
    }
    match ty {
        "address" => {
            let Some(s) = test.value.as_str() else {
                return Err(InvalidCondition::new(format!(
                    "Return value comparison for '{}' output should be an address string",
                    function.name
                )));
            };
            Address::from_str(s).map(|_| ()).map_err(|_| {
                InvalidCondition::new(format!("'{s}' is not a valid address"))
            })
        }
        "bool" => match test.value {
            Value::Bool(_) => Ok(()),
            _ => Err(InvalidCondition::new(format!(
                "Return value comparison for '{}' output should be a boolean",
                function.name
            ))),
        },
        _ => Ok(()),
    }
}

/// Aligns a resolved comparand with the function's output type: addresses are
/// checksum-normalized, integer outputs coerce decimal strings to integers.
pub fn align_comparator_value_with_abi(
    function: &Function,
    test: ReturnValueTest,
) -> Result<ReturnValueTest, InvalidCondition> {
    let Some(output) = observed_output(function, test.index) else {
        return Ok(test);
    };
    let aligned = align_value(&output.ty, test.value)?;
    Ok(ReturnValueTest {
        comparator: test.comparator,
        value: aligned,
        index: test.index,
    })
}

fn align_value(ty: &str, value: Value) -> Result<Value, InvalidCondition> {
    if (ty.starts_with("uint") || ty.starts_with("int")) && !ty.ends_with(']') {
        if let Value::String(s) = &value {
            let digits = s.strip_suffix('n').unwrap_or(s);
            return digits
                .parse::<alloy_primitives::aliases::I512>()
                .map(Value::integer)
                .map_err(|_| {
                    InvalidCondition::new(format!("'{s}' is not an integer for a {ty} output"))
                });
        }
        return Ok(value);
    }
    match ty {
        "address" => match value.as_str() {
            Some(s) => {
                let address = Address::from_str(s).map_err(|_| {
                    InvalidCondition::new(format!("'{s}' is not a valid address"))
                })?;
                Ok(Value::String(address.to_checksum(None)))
            }
            None => Ok(value),
        },
        "bool" => match value.as_str() {
            Some("true") => Ok(Value::Bool(true)),
            Some("false") => Ok(Value::Bool(false)),
            _ => Ok(value),
        },
        _ => Ok(value),
    }
}

/// Serde adapter storing contract addresses checksummed on the wire.
pub mod checksum_address {
    use alloy_primitives::Address;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&address.to_checksum(None))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(|error| {
            serde::de::Error::custom(format!("Invalid contract address '{s}': {error}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::return_value_test::Comparator;

    fn abi_function(json: &str) -> Function {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_standard_abi_lookup() {
        let balance_of = StandardContractType::ERC20.function("balanceOf").unwrap();
        assert_eq!(balance_of.inputs.len(), 1);
        assert_eq!(balance_of.outputs[0].ty, "uint256");

        let owner_of = StandardContractType::ERC721.function("ownerOf").unwrap();
        assert_eq!(owner_of.outputs[0].ty, "address");

        assert!(StandardContractType::ERC20.function("transfer").is_none());
        assert!(StandardContractType::ERC1155.function("ownerOf").is_none());
    }

    #[test]
    fn test_validate_function_abi_name_mismatch() {
        let function = abi_function(
            r#"{"type": "function", "name": "getPolicy", "stateMutability": "view",
                "inputs": [], "outputs": [{"name": "", "type": "bool"}]}"#,
        );
        let error = validate_function_abi(&function, "isPolicyActive").unwrap_err();
        assert!(error.to_string().contains("does not match method"));
    }

    #[test]
    fn test_validate_function_abi_rejects_mutating_functions() {
        let function = abi_function(
            r#"{"type": "function", "name": "transfer", "stateMutability": "nonpayable",
                "inputs": [], "outputs": [{"name": "", "type": "bool"}]}"#,
        );
        let error = validate_function_abi(&function, "transfer").unwrap_err();
        assert!(error.to_string().contains("view and pure"));
    }

    #[test]
    fn test_validate_function_abi_requires_outputs() {
        let function = abi_function(
            r#"{"type": "function", "name": "poke", "stateMutability": "view",
                "inputs": [], "outputs": []}"#,
        );
        assert!(validate_function_abi(&function, "poke").is_err());
    }

    #[test]
    fn test_get_contract_function_xor() {
        assert!(get_contract_function(None, None, "balanceOf").is_err());
        let function = StandardContractType::ERC20.function("balanceOf").unwrap();
        assert!(
            get_contract_function(Some(StandardContractType::ERC20), Some(function), "balanceOf")
                .is_err()
        );
    }

    #[test]
    fn test_align_address_output_to_checksum() {
        let function = StandardContractType::ERC721.function("ownerOf").unwrap();
        let test = ReturnValueTest::new(
            Comparator::Equal,
            "0x5ce9454909639d2d17a3f753ce7d93fa0b9ab12e",
        );
        let aligned = align_comparator_value_with_abi(function, test).unwrap();
        assert_eq!(
            aligned.value,
            Value::String("0x5ce9454909639D2D17A3F753ce7d93fa0b9aB12E".into())
        );
    }

    #[test]
    fn test_align_integer_output_coerces_decimal_strings() {
        let function = StandardContractType::ERC20.function("balanceOf").unwrap();
        let test = ReturnValueTest::new(Comparator::GreaterEqual, "10000000000000");
        let aligned = align_comparator_value_with_abi(function, test).unwrap();
        assert_eq!(aligned.value, Value::Int(10000000000000));
    }

    #[test]
    fn test_validate_expected_return_type() {
        let balance_of = StandardContractType::ERC20.function("balanceOf").unwrap();
        assert!(
            validate_expected_return_type(
                balance_of,
                &ReturnValueTest::new(Comparator::Equal, 0i64)
            )
            .is_ok()
        );
        assert!(
            validate_expected_return_type(
                balance_of,
                &ReturnValueTest::new(Comparator::Equal, ":expected")
            )
            .is_ok()
        );
        assert!(
            validate_expected_return_type(
                balance_of,
                &ReturnValueTest::new(Comparator::Equal, true)
            )
            .is_err()
        );

        let owner_of = StandardContractType::ERC721.function("ownerOf").unwrap();
        assert!(
            validate_expected_return_type(
                owner_of,
                &ReturnValueTest::new(Comparator::Equal, "not-an-address")
            )
            .is_err()
        );
    }
}
