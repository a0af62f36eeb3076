//! Poseidon Hasher
//!
//! Pluggable binary hash used by the commitment tree, plus the n-ary
//! sponge helpers used for commitments, nullifiers and key derivation.
//!
//! ```text
//! parent = Poseidon(left || right)
//! ```
//!
//! All hashing happens over BN254 Fr. Byte arrays cross the boundary as
//! 32-byte little-endian field encodings.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::{BigInteger, PrimeField};

/// Binary hash capability consumed by the Merkle tree.
///
/// `level` is the tree level being hashed; implementations may ignore it.
/// Must be pure and deterministic.
pub trait TreeHasher {
    fn hash(&self, level: Option<usize>, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32];
}

/// Poseidon-based hasher over BN254
pub struct PoseidonHasher {
    config: PoseidonConfig<Fr>,
}

impl PoseidonHasher {
    pub fn new() -> Self {
        Self {
            config: poseidon_config(),
        }
    }

    /// Absorb a sequence of field elements and squeeze one out
    pub fn hash_fields(&self, inputs: &[Fr]) -> Fr {
        let mut sponge = PoseidonSponge::new(&self.config);
        for input in inputs {
            sponge.absorb(input);
        }
        sponge.squeeze_field_elements(1)[0]
    }

    /// Hash 32-byte field encodings, returning the 32-byte result
    pub fn hash_bytes(&self, inputs: &[[u8; 32]]) -> [u8; 32] {
        let fields: Vec<Fr> = inputs.iter().map(|b| fr_from_bytes(b)).collect();
        fr_to_bytes(self.hash_fields(&fields))
    }
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeHasher for PoseidonHasher {
    fn hash(&self, _level: Option<usize>, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        self.hash_bytes(&[*left, *right])
    }
}

/// Poseidon configuration for Cloak
///
/// Field: BN254 Fr (254 bits)
/// Rate: 2, Capacity: 1
/// Security: 128 bits
pub fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits: u64 = 254;
    let rate: usize = 2;
    let capacity: usize = 1;
    let full_rounds: u64 = 8;
    let partial_rounds: u64 = 57;

    // alpha = 5 is standard for Poseidon over large prime fields
    let alpha: u64 = 5;
    let skip_matrices: u64 = 0;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        rate,
        full_rounds,
        partial_rounds,
        skip_matrices,
    );

    PoseidonConfig::new(
        full_rounds as usize,
        partial_rounds as usize,
        alpha,
        mds,
        ark,
        rate,
        capacity,
    )
}

/// Encode a field element as 32 little-endian bytes
pub fn fr_to_bytes(f: Fr) -> [u8; 32] {
    let bytes = f.into_bigint().to_bytes_le();
    let mut arr = [0u8; 32];
    arr[..bytes.len()].copy_from_slice(&bytes);
    arr
}

/// Decode bytes into a field element, reducing mod the field order
pub fn fr_from_bytes(bytes: &[u8]) -> Fr {
    Fr::from_le_bytes_mod_order(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let hasher = PoseidonHasher::new();
        let left = [1u8; 32];
        let right = [2u8; 32];

        let h1 = hasher.hash(Some(0), &left, &right);
        let h2 = hasher.hash(Some(5), &left, &right);

        assert_eq!(h1, h2, "level must not affect the digest");
    }

    #[test]
    fn test_hash_order_matters() {
        let hasher = PoseidonHasher::new();
        let a = [1u8; 32];
        let b = [2u8; 32];

        assert_ne!(hasher.hash(None, &a, &b), hasher.hash(None, &b, &a));
    }

    #[test]
    fn test_field_round_trip() {
        let f = Fr::from(123456789u64);
        assert_eq!(fr_from_bytes(&fr_to_bytes(f)), f);
    }
}
