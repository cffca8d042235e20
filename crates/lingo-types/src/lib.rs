//! Wire-format types for ConditionLingo, the declarative access-control
//! condition language.
//!
//! This crate defines the condition AST, the value model, and the versioned
//! JSON codec, together with all construction-time (schema) validation. It is
//! deliberately network-free: evaluation against live chains and HTTP
//! endpoints lives in the `lingo-rs` crate.
//!
//! # Modules
//!
//! - [`value`] - The JSON-shaped value tree with big-integer support
//! - [`context`] - Context-variable token grammar and reserved variables
//! - [`chain`] - Chain identifiers and the permitted-chain table
//! - [`return_value_test`] - The comparator applied to call results
//! - [`abi`] - Standard contract ABIs and function-ABI validation
//! - [`conditions`] - The condition AST and per-variant schema validation
//! - [`lingo`] - The versioned top-level document
//! - [`error`] - Construction-time errors
//!
//! # Example
//!
//! ```
//! use lingo_types::lingo::ConditionLingo;
//!
//! let document = r#"{
//!   "version": "1.0.0",
//!   "condition": {
//!     "conditionType": "time",
//!     "chain": 137,
//!     "method": "blocktime",
//!     "returnValueTest": { "comparator": ">", "value": 0 }
//!   }
//! }"#;
//! let lingo = ConditionLingo::from_json(document).unwrap();
//! assert_eq!(lingo.version, "1.0.0");
//! ```

pub mod abi;
pub mod chain;
pub mod conditions;
pub mod context;
pub mod error;
pub mod lingo;
pub mod value;
