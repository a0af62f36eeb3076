//! Witness shapes handed to the proving engines
//!
//! Only field-encodable data crosses this boundary, so either backend can
//! consume the same structures without knowing how they were assembled.

use serde::{Deserialize, Serialize};

/// Per-input slice of the pool witness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputWitness {
    /// Spend tag revealed publicly
    pub nullifier: [u8; 32],
    pub amount: u128,
    pub blinding: [u8; 31],
    /// Spending key field element proving authority in-circuit
    pub secret_key: [u8; 32],
    /// Source chain of this note
    pub chain_id: u64,
    /// Leaf position in the source chain's tree
    pub index: u64,
    /// Merkle authentication path, leaf to root
    pub siblings: Vec<[u8; 32]>,
    /// Direction bits (false = left, true = right)
    pub path_bits: Vec<bool>,
}

/// Per-output slice of the pool witness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputWitness {
    /// Commitment published as the new leaf
    pub commitment: [u8; 32],
    pub amount: u128,
    pub blinding: [u8; 31],
    /// Recipient public key
    pub pubkey: [u8; 32],
}

/// Witness for the multi-input/output pool circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolWitness {
    /// Root set the membership proofs anchor to
    pub roots: Vec<[u8; 32]>,
    /// Target chain of the transaction
    pub chain_id: u64,
    /// Signed public amount entering or leaving the pool
    pub public_amount: i128,
    /// Binding hash over the externally-visible parameters
    pub ext_data_hash: [u8; 32],
    pub inputs: Vec<InputWitness>,
    pub outputs: Vec<OutputWitness>,
}

/// Witness for the single-note mixer circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixerWitness {
    pub root: [u8; 32],
    pub nullifier_hash: [u8; 32],
    pub amount: u128,
    pub blinding: [u8; 31],
    pub secret_key: [u8; 32],
    pub siblings: Vec<[u8; 32]>,
    pub path_bits: Vec<bool>,
    pub recipient: Vec<u8>,
    pub relayer: Vec<u8>,
    pub fee: u128,
    pub refund: u128,
}

/// The assembled witness for either pool variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Witness {
    Mixer(MixerWitness),
    Pool(PoolWitness),
}
