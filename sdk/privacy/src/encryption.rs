//! UTXO Encryption
//!
//! Wraps a UTXO's secret fields for out-of-band transmission to the owner.
//!
//! ```text
//! plaintext (70 bytes, fixed):
//!   chain_id  8 bytes, big-endian
//!   amount   31 bytes, big-endian
//!   blinding 31 bytes
//! ```
//!
//! The fixed-length payload goes through the keypair's asymmetric
//! encryption capability. Length is the only validation performed on
//! decrypted content.

use crate::chain::TypedChainId;
use crate::error::PrivacyError;
use crate::keypair::Keypair;
use crate::utxo::{Backend, Curve, Utxo};

/// Fixed length of the decrypted note payload
pub const UTXO_PLAINTEXT_LEN: usize = 70;

/// Encode the secret fields into the fixed 70-byte payload
pub fn encode_plaintext(utxo: &Utxo) -> [u8; UTXO_PLAINTEXT_LEN] {
    let mut out = [0u8; UTXO_PLAINTEXT_LEN];
    out[0..8].copy_from_slice(&utxo.chain_id.to_bytes());
    // amount occupies the low 16 of its 31-byte window
    out[8 + 15..8 + 31].copy_from_slice(&utxo.amount.to_be_bytes());
    out[39..70].copy_from_slice(&utxo.blinding);
    out
}

/// Decode a decrypted payload back into `(chain_id, amount, blinding)`
pub fn decode_plaintext(
    bytes: &[u8],
) -> Result<(TypedChainId, u128, [u8; 31]), PrivacyError> {
    if bytes.len() != UTXO_PLAINTEXT_LEN {
        return Err(PrivacyError::MalformedEncoding(format!(
            "expected a {UTXO_PLAINTEXT_LEN}-byte payload, got {}",
            bytes.len()
        )));
    }

    let chain_id = TypedChainId::from_bytes(bytes[0..8].try_into().expect("length checked"))?;

    let amount_window = &bytes[8..39];
    if amount_window[..15].iter().any(|b| *b != 0) {
        return Err(PrivacyError::MalformedEncoding(
            "amount exceeds 128 bits".into(),
        ));
    }
    let amount = u128::from_be_bytes(amount_window[15..].try_into().expect("length checked"));

    let blinding: [u8; 31] = bytes[39..70].try_into().expect("length checked");
    Ok((chain_id, amount, blinding))
}

/// Encrypt a UTXO's secret fields to its owner
pub fn encrypt_utxo(utxo: &Utxo) -> Vec<u8> {
    utxo.keypair.encrypt(&encode_plaintext(utxo))
}

/// Decrypt an on-chain ciphertext back into a UTXO
///
/// The decrypting keypair becomes the owner; the reconstructed UTXO sits
/// at index 0 until the caller learns its true tree position.
pub fn decrypt_utxo(
    keypair: &Keypair,
    backend: Backend,
    ciphertext: &[u8],
) -> Result<Utxo, PrivacyError> {
    let plaintext = keypair.decrypt(ciphertext)?;
    let (chain_id, amount, blinding) = decode_plaintext(&plaintext)?;

    Ok(Utxo {
        curve: Curve::Bn254,
        backend,
        amount,
        chain_id,
        index: Some(0),
        blinding,
        keypair: keypair.clone(),
    })
}
