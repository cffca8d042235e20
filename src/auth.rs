//! Authenticated user-address claims.
//!
//! The reserved context variables carry *auth messages*: wallet-signed
//! payloads proving control of an Ethereum address. Two schemes are
//! recognized:
//!
//! - **EIP-712** typed structured data. Legacy; still accepted on the generic
//!   `:userAddress` slot while deployments migrate off it.
//! - **EIP-4361** "Sign-In With Ethereum" messages, signed with the EIP-191
//!   personal-message prefix. The only scheme the `:userAddressEIP4361` slot
//!   accepts.
//!
//! Verification recovers the signer from the 65-byte secp256k1 signature and
//! compares it, case-insensitively, against the declared address. The
//! resolved value of the claim is the declared address string.

use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, B256, Signature, eip191_hash_message, hex};
use serde::Deserialize;
use std::str::FromStr;

use lingo_types::context::{USER_ADDRESS_EIP4361_CONTEXT, is_reserved_context_variable};

use crate::context::Context;
use crate::error::EvaluationError;

/// The authentication scheme declared by an auth message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AuthScheme {
    #[serde(rename = "EIP712")]
    Eip712,
    #[serde(rename = "EIP4361")]
    Eip4361,
}

/// The signed payload of an auth message: either EIP-712 typed data or an
/// EIP-4361 message string, both carried under the `typedData` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AuthPayload {
    Eip4361(String),
    Eip712(Box<TypedData>),
}

impl AuthPayload {
    fn scheme(&self) -> AuthScheme {
        match self {
            AuthPayload::Eip4361(_) => AuthScheme::Eip4361,
            AuthPayload::Eip712(_) => AuthScheme::Eip712,
        }
    }
}

/// A wallet-signed claim binding a signature to an address.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMessage {
    pub address: String,
    pub signature: String,
    /// Optional on the wire for backward compatibility; inferred from the
    /// payload shape when absent.
    #[serde(default)]
    pub scheme: Option<AuthScheme>,
    pub typed_data: AuthPayload,
}

impl AuthMessage {
    /// Decodes an auth message from a context entry. Missing fields and
    /// malformed payloads are invalid context data.
    pub fn from_value(value: &lingo_types::value::Value) -> Result<Self, EvaluationError> {
        let message: AuthMessage =
            serde_json::from_value(value.to_json()).map_err(|error| {
                EvaluationError::InvalidContextVariableData(format!(
                    "Invalid auth message: {error}"
                ))
            })?;
        if let Some(declared) = message.scheme
            && declared != message.typed_data.scheme()
        {
            return Err(EvaluationError::InvalidContextVariableData(format!(
                "Declared scheme {declared:?} does not match the signed payload"
            )));
        }
        Ok(message)
    }

    /// Verifies the claim and returns the declared address string.
    pub fn verify(&self) -> Result<String, EvaluationError> {
        let declared = Address::from_str(&self.address).map_err(|_| {
            EvaluationError::InvalidContextVariableData(format!(
                "'{}' is not a valid address",
                self.address
            ))
        })?;
        let signing_hash = self.signing_hash(declared)?;
        let signature = parse_signature(&self.signature)?;
        let recovered = signature
            .recover_address_from_prehash(&signing_hash)
            .map_err(|error| {
                EvaluationError::ContextVariableVerificationFailed(format!(
                    "Signature recovery failed: {error}"
                ))
            })?;
        if recovered != declared {
            return Err(EvaluationError::ContextVariableVerificationFailed(format!(
                "Signature does not match address {}",
                self.address
            )));
        }
        Ok(self.address.clone())
    }

    fn signing_hash(&self, declared: Address) -> Result<B256, EvaluationError> {
        match &self.typed_data {
            AuthPayload::Eip712(typed_data) => {
                typed_data.eip712_signing_hash().map_err(|error| {
                    EvaluationError::InvalidContextVariableData(format!(
                        "Invalid EIP-712 typed data: {error}"
                    ))
                })
            }
            AuthPayload::Eip4361(message) => {
                let siwe: SiweMessage = message.parse().map_err(|error| {
                    EvaluationError::InvalidContextVariableData(format!(
                        "Invalid EIP-4361 message: {error}"
                    ))
                })?;
                if siwe.address != declared {
                    return Err(EvaluationError::ContextVariableVerificationFailed(
                        format!(
                            "EIP-4361 message is for {}, not {}",
                            siwe.address, self.address
                        ),
                    ));
                }
                Ok(eip191_hash_message(message.as_bytes()))
            }
        }
    }
}

/// Resolves a reserved user-address context variable by verifying the auth
/// message bound to it.
pub fn resolve_user_address(slot: &str, context: &Context) -> Result<String, EvaluationError> {
    debug_assert!(is_reserved_context_variable(slot));
    let entry = context
        .get(slot)
        .ok_or_else(|| EvaluationError::MissingContextVariable(slot.to_string()))?;
    let message = AuthMessage::from_value(entry)?;
    if slot == USER_ADDRESS_EIP4361_CONTEXT && message.typed_data.scheme() != AuthScheme::Eip4361 {
        return Err(EvaluationError::UnexpectedScheme(format!(
            "'{slot}' only accepts EIP-4361 auth messages"
        )));
    }
    let address = message.verify()?;
    tracing::debug!(%slot, %address, "Verified user address claim");
    Ok(address)
}

fn parse_signature(signature: &str) -> Result<Signature, EvaluationError> {
    let bytes = hex::decode(signature).map_err(|_| {
        EvaluationError::InvalidContextVariableData(format!(
            "'{signature}' is not a hex-encoded signature"
        ))
    })?;
    Signature::from_raw(&bytes).map_err(|error| {
        EvaluationError::InvalidContextVariableData(format!("Invalid signature: {error}"))
    })
}

/// A parsed EIP-4361 (Sign-In With Ethereum) message.
#[derive(Debug, Clone)]
pub struct SiweMessage {
    pub domain: String,
    pub address: Address,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: String,
}

impl FromStr for SiweMessage {
    type Err = String;

    fn from_str(message: &str) -> Result<Self, Self::Err> {
        let mut lines = message.lines();
        let header = lines.next().ok_or("empty message")?;
        let domain = header
            .strip_suffix(" wants you to sign in with your Ethereum account:")
            .filter(|domain| !domain.is_empty())
            .ok_or("missing sign-in header")?
            .to_string();
        let address_line = lines.next().ok_or("missing address line")?;
        let address = Address::from_str(address_line.trim())
            .map_err(|_| format!("'{address_line}' is not a valid address"))?;
        if !matches!(lines.next(), Some("")) {
            return Err("expected a blank line after the address".to_string());
        }

        let mut statement = None;
        let mut uri = None;
        let mut version = None;
        let mut chain_id = None;
        let mut nonce = None;
        let mut issued_at = None;
        for line in lines {
            if line.is_empty() {
                continue;
            }
            if let Some(value) = line.strip_prefix("URI: ") {
                uri = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("Version: ") {
                version = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("Chain ID: ") {
                chain_id = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("'{value}' is not a valid chain id"))?,
                );
            } else if let Some(value) = line.strip_prefix("Nonce: ") {
                nonce = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("Issued At: ") {
                issued_at = Some(value.to_string());
            } else if uri.is_none() && statement.is_none() {
                statement = Some(line.to_string());
            }
            // Expiration Time, Not Before, Request ID, and Resources are
            // tolerated but not interpreted.
        }

        let version = version.ok_or("missing Version field")?;
        if version != "1" {
            return Err(format!("unsupported version '{version}'"));
        }
        Ok(SiweMessage {
            domain,
            address,
            statement,
            uri: uri.ok_or("missing URI field")?,
            version,
            chain_id: chain_id.ok_or("missing Chain ID field")?,
            nonce: nonce.ok_or("missing Nonce field")?,
            issued_at: issued_at.ok_or("missing Issued At field")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use lingo_types::context::USER_ADDRESS_CONTEXT;
    use lingo_types::value::Value;

    fn signer() -> PrivateKeySigner {
        let key = B256::from_slice(&[0x42; 32]);
        PrivateKeySigner::from_bytes(&key).unwrap()
    }

    fn other_signer() -> PrivateKeySigner {
        let key = B256::from_slice(&[0x43; 32]);
        PrivateKeySigner::from_bytes(&key).unwrap()
    }

    fn typed_data_json(address: &str) -> serde_json::Value {
        serde_json::json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                ],
                "Wallet": [
                    { "name": "address", "type": "string" },
                    { "name": "blockNumber", "type": "uint256" },
                ],
            },
            "domain": { "name": "TACo", "version": "1", "chainId": 137 },
            "primaryType": "Wallet",
            "message": { "address": address, "blockNumber": 1000 },
        })
    }

    fn eip712_auth_message() -> serde_json::Value {
        let signer = signer();
        let address = signer.address().to_checksum(None);
        let typed_data = typed_data_json(&address);
        let parsed: TypedData = serde_json::from_value(typed_data.clone()).unwrap();
        let hash = parsed.eip712_signing_hash().unwrap();
        let signature = signer.sign_hash_sync(&hash).unwrap();
        serde_json::json!({
            "address": address,
            "signature": hex::encode_prefixed(signature.as_bytes()),
            "scheme": "EIP712",
            "typedData": typed_data,
        })
    }

    fn siwe_message(address: &str) -> String {
        format!(
            "service.example.com wants you to sign in with your Ethereum account:\n\
             {address}\n\
             \n\
             I agree to the terms.\n\
             \n\
             URI: https://service.example.com\n\
             Version: 1\n\
             Chain ID: 137\n\
             Nonce: 32891756\n\
             Issued At: 2026-07-01T00:00:00Z"
        )
    }

    fn eip4361_auth_message() -> serde_json::Value {
        let signer = signer();
        let address = signer.address().to_checksum(None);
        let message = siwe_message(&address);
        let signature = signer
            .sign_hash_sync(&eip191_hash_message(message.as_bytes()))
            .unwrap();
        serde_json::json!({
            "address": address,
            "signature": hex::encode_prefixed(signature.as_bytes()),
            "scheme": "EIP4361",
            "typedData": message,
        })
    }

    fn context_with(slot: &str, message: serde_json::Value) -> Context {
        Context::from_iter([(slot, Value::from(message))])
    }

    #[test]
    fn test_eip712_verification() {
        let message = eip712_auth_message();
        let expected = message["address"].as_str().unwrap().to_string();
        let context = context_with(USER_ADDRESS_CONTEXT, message);
        let address = resolve_user_address(USER_ADDRESS_CONTEXT, &context).unwrap();
        assert_eq!(address, expected);
    }

    #[test]
    fn test_eip4361_verification_on_both_slots() {
        for slot in [USER_ADDRESS_CONTEXT, USER_ADDRESS_EIP4361_CONTEXT] {
            let message = eip4361_auth_message();
            let expected = message["address"].as_str().unwrap().to_string();
            let context = context_with(slot, message);
            assert_eq!(resolve_user_address(slot, &context).unwrap(), expected);
        }
    }

    #[test]
    fn test_eip712_rejected_on_eip4361_slot() {
        let context = context_with(USER_ADDRESS_EIP4361_CONTEXT, eip712_auth_message());
        let result = resolve_user_address(USER_ADDRESS_EIP4361_CONTEXT, &context);
        assert!(matches!(result, Err(EvaluationError::UnexpectedScheme(_))));
    }

    #[test]
    fn test_mutated_address_fails_verification() {
        let mut message = eip712_auth_message();
        message["address"] =
            serde_json::json!(other_signer().address().to_checksum(None));
        let context = context_with(USER_ADDRESS_CONTEXT, message);
        let result = resolve_user_address(USER_ADDRESS_CONTEXT, &context);
        assert!(matches!(
            result,
            Err(EvaluationError::ContextVariableVerificationFailed(_))
        ));
    }

    #[test]
    fn test_foreign_signature_fails_verification() {
        let mut message = eip712_auth_message();
        let foreign = other_signer()
            .sign_hash_sync(&B256::from_slice(&[7u8; 32]))
            .unwrap();
        message["signature"] = serde_json::json!(hex::encode_prefixed(foreign.as_bytes()));
        let context = context_with(USER_ADDRESS_CONTEXT, message);
        let result = resolve_user_address(USER_ADDRESS_CONTEXT, &context);
        assert!(matches!(
            result,
            Err(EvaluationError::ContextVariableVerificationFailed(_))
        ));
    }

    #[test]
    fn test_mutated_typed_data_fails_verification() {
        let mut message = eip712_auth_message();
        message["typedData"]["message"]["blockNumber"] = serde_json::json!(1001);
        let context = context_with(USER_ADDRESS_CONTEXT, message);
        let result = resolve_user_address(USER_ADDRESS_CONTEXT, &context);
        assert!(matches!(
            result,
            Err(EvaluationError::ContextVariableVerificationFailed(_))
        ));
    }

    #[test]
    fn test_undecodable_signature_is_invalid_data() {
        let mut message = eip712_auth_message();
        message["signature"] = serde_json::json!("0xdeadbeef");
        let context = context_with(USER_ADDRESS_CONTEXT, message);
        let result = resolve_user_address(USER_ADDRESS_CONTEXT, &context);
        assert!(matches!(
            result,
            Err(EvaluationError::InvalidContextVariableData(_))
        ));
    }

    #[test]
    fn test_missing_required_entries() {
        for entry in ["address", "signature", "typedData"] {
            for fixture in [eip712_auth_message(), eip4361_auth_message()] {
                let mut message = fixture;
                message.as_object_mut().unwrap().remove(entry);
                let context = context_with(USER_ADDRESS_CONTEXT, message);
                let result = resolve_user_address(USER_ADDRESS_CONTEXT, &context);
                assert!(
                    matches!(result, Err(EvaluationError::InvalidContextVariableData(_))),
                    "deleting '{entry}' should invalidate the message"
                );
            }
        }
    }

    #[test]
    fn test_malformed_typed_data() {
        let mut message = eip712_auth_message();
        message["typedData"] =
            serde_json::json!({ "randomSaying": "Comparison is the thief of joy." });
        let context = context_with(USER_ADDRESS_CONTEXT, message);
        let result = resolve_user_address(USER_ADDRESS_CONTEXT, &context);
        assert!(matches!(
            result,
            Err(EvaluationError::InvalidContextVariableData(_))
        ));
    }

    #[test]
    fn test_scheme_payload_mismatch() {
        let mut message = eip4361_auth_message();
        message["scheme"] = serde_json::json!("EIP712");
        let context = context_with(USER_ADDRESS_CONTEXT, message);
        let result = resolve_user_address(USER_ADDRESS_CONTEXT, &context);
        assert!(matches!(
            result,
            Err(EvaluationError::InvalidContextVariableData(_))
        ));
    }

    #[test]
    fn test_address_comparison_is_case_insensitive() {
        let mut message = eip4361_auth_message();
        let lowercase = message["address"].as_str().unwrap().to_lowercase();
        message["address"] = serde_json::json!(lowercase.clone());
        let context = context_with(USER_ADDRESS_CONTEXT, message);
        // the declared string is returned as given
        assert_eq!(
            resolve_user_address(USER_ADDRESS_CONTEXT, &context).unwrap(),
            lowercase
        );
    }

    #[test]
    fn test_missing_slot_entry() {
        let context = Context::new();
        let result = resolve_user_address(USER_ADDRESS_CONTEXT, &context);
        assert!(matches!(
            result,
            Err(EvaluationError::MissingContextVariable(_))
        ));
    }

    #[test]
    fn test_siwe_parser_rejects_malformed_messages() {
        assert!(SiweMessage::from_str("not a siwe message").is_err());

        let missing_nonce = siwe_message(&signer().address().to_checksum(None))
            .replace("Nonce: 32891756\n", "");
        assert!(SiweMessage::from_str(&missing_nonce).is_err());

        let bad_version = siwe_message(&signer().address().to_checksum(None))
            .replace("Version: 1", "Version: 9");
        assert!(SiweMessage::from_str(&bad_version).is_err());
    }

    #[test]
    fn test_siwe_parser_extracts_fields() {
        let address = signer().address();
        let message = SiweMessage::from_str(&siwe_message(&address.to_checksum(None))).unwrap();
        assert_eq!(message.domain, "service.example.com");
        assert_eq!(message.address, address);
        assert_eq!(message.statement.as_deref(), Some("I agree to the terms."));
        assert_eq!(message.chain_id, 137);
        assert_eq!(message.nonce, "32891756");
    }
}
