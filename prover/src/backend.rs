//! Proving Backend Dispatch
//!
//! Two strategies sit behind one closed enum, selected at setup time:
//!
//! - **Arkworks**: the engine builds its own witness internally; one
//!   prove call keyed by protocol name.
//! - **Circom**: an explicit witness object goes through an external
//!   witness calculator, then a groth16-style prove, and the raw proof is
//!   flattened into the calldata layout the on-chain verifier expects.
//!
//! Both strategies produce the same output shape, so calling code stays
//! backend-agnostic. The engines themselves are opaque cryptographic
//! modules supplied by the caller; no circuit arithmetic lives here.

use std::fmt;
use std::sync::Arc;

use crate::error::BackendError;
use crate::witness::Witness;

/// Pool variant, used as the engine's protocol key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Mixer,
    Pool,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Mixer => write!(f, "mixer"),
            Protocol::Pool => write!(f, "pool"),
        }
    }
}

/// What every engine hands back: proof bytes plus public signals
#[derive(Debug, Clone)]
pub struct EngineProof {
    pub proof: Vec<u8>,
    pub public_inputs: Vec<String>,
}

/// Direct witness-build strategy: prove in one opaque call
pub trait ArkworksEngine: Send + Sync {
    fn prove(
        &self,
        protocol: Protocol,
        witness: &Witness,
        proving_key: &[u8],
    ) -> Result<EngineProof, BackendError>;

    fn verify(
        &self,
        verifying_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, BackendError>;
}

/// Circuit-compiler strategy: explicit witness calculation, then groth16
pub trait CircomEngine: Send + Sync {
    fn calculate_witness(&self, witness: &Witness) -> Result<Vec<u8>, BackendError>;

    fn prove(&self, proving_key: &[u8], wtns: &[u8]) -> Result<EngineProof, BackendError>;

    fn verify(
        &self,
        verifying_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, BackendError>;
}

/// The closed set of proving strategies
#[derive(Clone)]
pub enum ProverBackend {
    Arkworks(Arc<dyn ArkworksEngine>),
    Circom(Arc<dyn CircomEngine>),
}

impl ProverBackend {
    /// Run the backend-specific proving pipeline
    pub fn prove(
        &self,
        protocol: Protocol,
        witness: &Witness,
        proving_key: &[u8],
    ) -> Result<EngineProof, BackendError> {
        match self {
            ProverBackend::Arkworks(engine) => engine.prove(protocol, witness, proving_key),
            ProverBackend::Circom(engine) => {
                let wtns = engine.calculate_witness(witness)?;
                let raw = engine.prove(proving_key, &wtns)?;
                Ok(EngineProof {
                    proof: encode_calldata(&raw.proof),
                    public_inputs: raw.public_inputs,
                })
            }
        }
    }

    /// Check a proof against its public signals
    pub fn verify(
        &self,
        verifying_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, BackendError> {
        match self {
            ProverBackend::Arkworks(engine) => engine.verify(verifying_key, public_inputs, proof),
            ProverBackend::Circom(engine) => engine.verify(verifying_key, public_inputs, proof),
        }
    }
}

impl fmt::Debug for ProverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProverBackend::Arkworks(_) => write!(f, "ProverBackend::Arkworks"),
            ProverBackend::Circom(_) => write!(f, "ProverBackend::Circom"),
        }
    }
}

/// Flatten a raw proof into the calldata layout the on-chain verifier
/// expects: 32-byte limbs, zero-padded at the tail.
pub fn encode_calldata(proof: &[u8]) -> Vec<u8> {
    let mut out = proof.to_vec();
    let rem = out.len() % 32;
    if rem != 0 {
        out.resize(out.len() + (32 - rem), 0);
    }
    out
}
