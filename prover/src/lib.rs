//! Cloak Prover
//!
//! Proof orchestration for the shielded pool: request validation, circuit
//! arity normalization, witness assembly and backend dispatch, plus an
//! async service wrapper for delegated proving.

pub mod backend;
pub mod error;
pub mod ext_data;
pub mod manager;
pub mod service;
pub mod witness;

pub use backend::{ArkworksEngine, CircomEngine, EngineProof, Protocol, ProverBackend};
pub use error::{BackendError, ProveError};
pub use ext_data::ExtData;
pub use manager::{
    DEFAULT_TREE_DEPTH, LARGE_ARITY, MixerProofInput, OUTPUT_ARITY, PoolProofInput, ProofInput,
    ProofOutput, ProvingManager, SMALL_ARITY,
};
pub use service::ProvingService;
pub use witness::{InputWitness, MixerWitness, OutputWitness, PoolWitness, Witness};
