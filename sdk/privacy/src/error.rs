//! Error taxonomy for the privacy value objects.
//!
//! Structural failures are raised here, before any proving work starts.
//! Balance and circuit-shape errors live in `cloak-prover`.

use thiserror::Error;

/// Errors raised by UTXO, keypair and tree value objects
#[derive(Debug, Error)]
pub enum PrivacyError {
    /// A local precondition was violated (missing field, bad index, full tree)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Nullifier derivation was requested without spend authority
    #[error("nullifier derivation requires the spending key")]
    MissingPrivateKey,

    /// Deserialization or decryption produced data of an unexpected shape
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Ciphertext could not be authenticated with the given keypair
    #[error("decryption failed")]
    DecryptionFailed,
}
