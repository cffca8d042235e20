//! Evaluation-time errors.
//!
//! Schema validation catches every static problem before evaluation begins,
//! so these errors only describe what can go wrong against live context data
//! and live endpoints. The host withholds its decryption share on any of
//! them; the kind is logged and optionally echoed to the requester.

use lingo_types::chain::ChainId;
use lingo_types::error::{InvalidCondition, InvalidConditionLingo};

/// An error raised while evaluating a validated condition tree.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// A referenced context variable is not present in the supplied context.
    /// Fatal immediately: endpoint failover never retries this.
    #[error("Missing required context variable: {0}")]
    MissingContextVariable(String),

    /// A context entry exists but its data is unusable: missing auth-message
    /// fields, a malformed typed-data payload, an undecodable signature.
    #[error("Invalid data for context variable: {0}")]
    InvalidContextVariableData(String),

    /// An auth message parsed but its signature does not prove control of the
    /// declared address.
    #[error("Context variable verification failed: {0}")]
    ContextVariableVerificationFailed(String),

    /// An auth message uses a scheme the target context variable rejects.
    #[error("Unexpected authentication scheme: {0}")]
    UnexpectedScheme(String),

    /// The provider manager has no endpoints for the requested chain.
    #[error("No connection to chain {0}")]
    NoConnectionToChain(ChainId),

    /// Every endpoint for the chain failed; carries the latest error.
    #[error("RPC execution failed: {0}")]
    RpcExecutionFailed(String),

    /// An HTTP JSON request failed: transport error, non-2xx status, non-JSON
    /// body, JSON-RPC error response, or an ambiguous JSONPath query.
    #[error("JSON request failed: {0}")]
    JsonRequestFailed(String),

    /// A static invariant surfaced while re-deriving call bindings. Does not
    /// occur for trees built through the validating constructors.
    #[error(transparent)]
    InvalidCondition(#[from] InvalidCondition),

    /// A document failed to decode before evaluation could start.
    #[error(transparent)]
    InvalidConditionLingo(#[from] InvalidConditionLingo),
}
