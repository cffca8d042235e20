//! ConditionLingo evaluation engine.
//!
//! A threshold-decryption node gates each decryption share behind a
//! declarative access-control condition. This crate evaluates those
//! conditions: it resolves caller-supplied context variables (including
//! wallet-authenticated user addresses), performs the external reads each
//! leaf requires (chain RPC, contract calls, block timestamps, HTTPS JSON
//! endpoints), and applies the boolean combinators over the results. The
//! share is released only when the condition tree evaluates to true.
//!
//! The wire format and schema validation live in [`lingo_types`], re-exported
//! here as [`types`].
//!
//! # Modules
//!
//! - [`context`] - Context-variable resolution and scoped contexts
//! - [`auth`] - EIP-712 / EIP-4361 authenticated user-address claims
//! - [`providers`] - Chain endpoints and the provider manager
//! - [`calls`] - The external reads behind leaf conditions
//! - [`eval`] - The [`Verify`](eval::Verify) trait and evaluation proper
//! - [`config`] - Provider configuration
//! - [`error`] - Evaluation-time errors
//!
//! # Example
//!
//! ```no_run
//! use lingo_rs::context::Context;
//! use lingo_rs::eval::Verify;
//! use lingo_rs::providers::ConditionProviderManager;
//! use lingo_rs::types::lingo::ConditionLingo;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let document = r#"{
//!   "version": "1.0.0",
//!   "condition": {
//!     "conditionType": "time",
//!     "chain": 137,
//!     "method": "blocktime",
//!     "returnValueTest": { "comparator": ">", "value": 0 }
//!   }
//! }"#;
//! let lingo = ConditionLingo::from_json(document)?;
//!
//! let config = serde_json::from_str(
//!     r#"{ "137": [ { "http": "https://polygon-rpc.example.com" } ] }"#,
//! )?;
//! let providers = ConditionProviderManager::from_config(&config)?;
//!
//! let (satisfied, observed) = lingo.verify(&providers, &Context::new()).await?;
//! # let _ = (satisfied, observed);
//! # Ok(())
//! # }
//! ```

pub use lingo_types as types;

pub mod auth;
pub mod calls;
pub mod config;
pub mod context;
pub mod error;
pub mod eval;
pub mod providers;

pub use context::Context;
pub use error::EvaluationError;
pub use eval::Verify;
pub use providers::ConditionProviderManager;
