//! Proving errors
//!
//! Structural and shape failures are raised locally before any expensive
//! computation; engine failures pass through with their original message so
//! callers can tell "our input was wrong" from "the proving engine failed".
//! No retries happen here: proving is deterministic given identical input.

use thiserror::Error;

use cloak_privacy::PrivacyError;

/// An error raised by the opaque proving engine, message preserved
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Errors from proof orchestration
#[derive(Debug, Error)]
pub enum ProveError {
    /// A setup field was missing or malformed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The conservation law was violated; raised before witness construction
    #[error("Output amount and input amount don't match input({input}) != output({output})")]
    BalanceMismatch { input: i128, output: i128 },

    /// More real inputs than any supported circuit arity
    #[error("too many inputs: got {got}, the largest circuit takes 16")]
    TooManyInputs { got: usize },

    /// The multi-input circuit requires at least one real spend
    #[error("at least one real input is required")]
    TooFewInputs,

    /// A value-object failure bubbled up from the privacy layer
    #[error(transparent)]
    Privacy(#[from] PrivacyError),

    /// The proving engine itself failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The background proving worker stopped or dropped the request
    #[error("proving worker unavailable")]
    WorkerGone,
}
