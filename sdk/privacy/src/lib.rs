//! Cloak Privacy SDK
//!
//! Shielded UTXO primitives for a cross-chain pool.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Shielded Transfer                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐  │
//! │  │  Nullifiers  │  │ Commitments  │  │  Encrypted Outputs   │  │
//! │  │  (spent)     │  │ (new UTXOs)  │  │  (for the owner)     │  │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────┬───────────┘  │
//! │         │                 │                     │              │
//! │         ▼                 ▼                     ▼              │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │     Commitment Tree (fixed depth, append-only)           │  │
//! │  │     • roots and inclusion paths for the prover           │  │
//! │  │     • per-level zero values for vacancy proofs           │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

pub mod chain;
pub mod encryption;
pub mod error;
pub mod hasher;
pub mod keypair;
pub mod merkle;
pub mod utxo;

pub use chain::TypedChainId;
pub use encryption::{UTXO_PLAINTEXT_LEN, decrypt_utxo, encrypt_utxo};
pub use error::PrivacyError;
pub use hasher::{PoseidonHasher, TreeHasher};
pub use keypair::{Keypair, SpendingKey, ViewingKey};
pub use merkle::{MerklePath, MerkleTree, ZERO_LEAF, index_from_path_bits};
pub use utxo::{Backend, Curve, Utxo, UtxoInput};
