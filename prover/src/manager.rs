//! Proving Manager
//!
//! Orchestrates one proof request end to end:
//!
//! ```text
//! notes + leaf sets + proving key
//!         │
//!         ▼
//!  validate ──► conservation check ──► pad to circuit arity
//!         │
//!         ▼
//!  per-chain Merkle proofs ──► ext-data hash ──► witness
//!         │
//!         ▼
//!  backend dispatch (Arkworks | Circom) ──► proof + signals + notes
//! ```
//!
//! Structural errors surface before any cryptographic work; the manager
//! performs no retries.

use std::collections::HashMap;

use crate::backend::{Protocol, ProverBackend};
use crate::error::ProveError;
use crate::ext_data::ExtData;
use crate::witness::{InputWitness, MixerWitness, OutputWitness, PoolWitness, Witness};
use cloak_privacy::{
    Keypair, MerklePath, MerkleTree, PoseidonHasher, PrivacyError, TypedChainId, Utxo, UtxoInput,
};

/// Smallest fixed input arity the circuits support
pub const SMALL_ARITY: usize = 2;
/// Largest fixed input arity the circuits support
pub const LARGE_ARITY: usize = 16;
/// Fixed output arity
pub const OUTPUT_ARITY: usize = 2;
/// Depth of the production commitment trees
pub const DEFAULT_TREE_DEPTH: usize = 30;

/// Setup payload for the multi-input/output pool variant
#[derive(Debug, Clone)]
pub struct PoolProofInput {
    /// Notes being spent; each must carry its committed tree index
    pub inputs: Vec<Utxo>,
    /// Desired outputs, at most [`OUTPUT_ARITY`]
    pub outputs: Vec<Utxo>,
    /// Known leaf set per source chain
    pub leaves: HashMap<TypedChainId, Vec<[u8; 32]>>,
    /// Root set the proof anchors to; first entry is the primary anchor
    pub roots: Vec<[u8; 32]>,
    /// Chain the transaction executes on
    pub chain_id: TypedChainId,
    /// Signed amount entering (+) or leaving (-) the pool
    pub public_amount: i128,
    pub ext_data: ExtData,
    /// Opaque proving key bytes
    pub proving_key: Vec<u8>,
}

/// Setup payload for the single-note mixer variant
#[derive(Debug, Clone)]
pub struct MixerProofInput {
    pub note: Utxo,
    pub leaves: Vec<[u8; 32]>,
    pub leaf_index: u64,
    pub recipient: Vec<u8>,
    pub relayer: Vec<u8>,
    pub fee: u128,
    pub refund: u128,
    pub proving_key: Vec<u8>,
}

/// A proof request, one per protocol variant
#[derive(Debug, Clone)]
pub enum ProofInput {
    Mixer(MixerProofInput),
    Pool(PoolProofInput),
}

/// Backend-agnostic result of a proof request
#[derive(Debug, Clone)]
pub struct ProofOutput {
    pub proof: Vec<u8>,
    pub public_inputs: Vec<String>,
    /// Root the membership proofs anchored to
    pub root: [u8; 32],
    /// Spend tags of the real inputs, in input order
    pub nullifiers: Vec<[u8; 32]>,
    /// Output notes, serialized in their backend encoding
    pub output_notes: Vec<String>,
}

/// Orchestrates validation, normalization and backend dispatch
#[derive(Debug, Clone)]
pub struct ProvingManager {
    backend: ProverBackend,
    tree_depth: usize,
}

impl ProvingManager {
    pub fn new(backend: ProverBackend) -> Self {
        Self {
            backend,
            tree_depth: DEFAULT_TREE_DEPTH,
        }
    }

    /// Override the tree depth; production pools all run the default
    pub fn with_tree_depth(mut self, tree_depth: usize) -> Self {
        self.tree_depth = tree_depth;
        self
    }

    /// Prove a request inline, on the caller's thread
    pub fn prove(&self, input: ProofInput) -> Result<ProofOutput, ProveError> {
        match input {
            ProofInput::Mixer(mixer) => self.prove_mixer(mixer),
            ProofInput::Pool(pool) => self.prove_pool(pool),
        }
    }

    /// Verify a proof against its public signals via the backend engine
    pub fn verify(
        &self,
        verifying_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, ProveError> {
        Ok(self.backend.verify(verifying_key, public_inputs, proof)?)
    }

    fn prove_pool(&self, input: PoolProofInput) -> Result<ProofOutput, ProveError> {
        // Shape checks first: cheap, local, before any hashing
        if input.proving_key.is_empty() {
            return Err(ProveError::InvalidInput("empty proving key".into()));
        }
        if input.outputs.len() > OUTPUT_ARITY {
            return Err(ProveError::InvalidInput(format!(
                "{} outputs exceed the fixed arity {OUTPUT_ARITY}",
                input.outputs.len()
            )));
        }
        match input.inputs.len() {
            0 => return Err(ProveError::TooFewInputs),
            n if n > LARGE_ARITY => return Err(ProveError::TooManyInputs { got: n }),
            _ => {}
        }

        // Conservation law, enforced before witness construction
        let input_sum = sum_amounts(&input.inputs)?
            .checked_add(input.public_amount)
            .ok_or_else(|| ProveError::InvalidInput("public amount overflow".into()))?;
        let output_sum = sum_amounts(&input.outputs)?
            .checked_add(to_i128(input.ext_data.fee)?)
            .ok_or_else(|| ProveError::InvalidInput("fee overflow".into()))?;
        if input_sum != output_sum {
            return Err(ProveError::BalanceMismatch {
                input: input_sum,
                output: output_sum,
            });
        }

        let real_count = input.inputs.len();
        let inputs = pad_inputs(input.inputs)?;
        let outputs = pad_outputs(input.outputs, input.chain_id);
        log::debug!(
            "normalized {real_count} real inputs to arity {}",
            inputs.len()
        );

        // Membership proofs for real notes, chain by chain
        let mut paths: Vec<(MerklePath, u64)> = Vec::with_capacity(real_count);
        let mut first_real_root = None;
        for utxo in &inputs[..real_count] {
            let leaves = input.leaves.get(&utxo.chain_id).ok_or_else(|| {
                ProveError::InvalidInput(format!("no leaves registered for chain {}", utxo.chain_id))
            })?;
            let index = utxo.index.ok_or_else(|| {
                ProveError::InvalidInput("input note has no committed index".into())
            })?;
            if index >= leaves.len() as u64 {
                return Err(ProveError::InvalidInput(format!(
                    "leaf index {index} beyond the {} known leaves",
                    leaves.len()
                )));
            }

            let tree = MerkleTree::with_leaves(
                self.tree_depth,
                PoseidonHasher::new(),
                utxo.chain_id.to_string(),
                leaves,
            )?;
            let path = tree.path(index)?;
            if path.element != utxo.commitment() {
                return Err(ProveError::InvalidInput(format!(
                    "leaf at index {index} is not the note's commitment"
                )));
            }
            first_real_root.get_or_insert(tree.root());
            paths.push((path, index));
        }

        // Dummies prove nothing real: all-zero path against the anchor root
        let anchor_root = input
            .roots
            .first()
            .copied()
            .or(first_real_root)
            .ok_or_else(|| ProveError::InvalidInput("no root to anchor dummy proofs".into()))?;
        let roots = if input.roots.is_empty() {
            vec![anchor_root]
        } else {
            input.roots.clone()
        };

        let mut input_witnesses = Vec::with_capacity(inputs.len());
        for (i, utxo) in inputs.iter().enumerate() {
            let secret_key = spending_key_of(utxo)?;
            let (siblings, path_bits, index) = if i < real_count {
                let (path, index) = &paths[i];
                (path.siblings.clone(), path.path_bits.clone(), *index)
            } else {
                (
                    vec![[0u8; 32]; self.tree_depth],
                    vec![false; self.tree_depth],
                    0,
                )
            };

            input_witnesses.push(InputWitness {
                nullifier: utxo.nullifier()?,
                amount: utxo.amount,
                blinding: utxo.blinding,
                secret_key,
                chain_id: utxo.chain_id.to_u64(),
                index,
                siblings,
                path_bits,
            });
        }

        let output_witnesses: Vec<OutputWitness> = outputs
            .iter()
            .map(|utxo| OutputWitness {
                commitment: utxo.commitment(),
                amount: utxo.amount,
                blinding: utxo.blinding,
                pubkey: utxo.keypair.pubkey(),
            })
            .collect();

        let nullifiers: Vec<[u8; 32]> = input_witnesses[..real_count]
            .iter()
            .map(|w| w.nullifier)
            .collect();

        let witness = Witness::Pool(PoolWitness {
            roots,
            chain_id: input.chain_id.to_u64(),
            public_amount: input.public_amount,
            ext_data_hash: input.ext_data.hash(),
            inputs: input_witnesses,
            outputs: output_witnesses,
        });

        log::debug!("dispatching pool witness to {:?}", self.backend);
        let engine_proof = self
            .backend
            .prove(Protocol::Pool, &witness, &input.proving_key)?;

        Ok(ProofOutput {
            proof: engine_proof.proof,
            public_inputs: engine_proof.public_inputs,
            root: anchor_root,
            nullifiers,
            output_notes: outputs.iter().map(Utxo::serialize).collect(),
        })
    }

    fn prove_mixer(&self, input: MixerProofInput) -> Result<ProofOutput, ProveError> {
        if input.proving_key.is_empty() {
            return Err(ProveError::InvalidInput("empty proving key".into()));
        }
        if input.leaf_index >= input.leaves.len() as u64 {
            return Err(ProveError::InvalidInput(format!(
                "leaf index {} beyond the {} known leaves",
                input.leaf_index,
                input.leaves.len()
            )));
        }

        let tree = MerkleTree::with_leaves(
            self.tree_depth,
            PoseidonHasher::new(),
            input.note.chain_id.to_string(),
            &input.leaves,
        )?;
        let path = tree.path(input.leaf_index)?;

        let mut note = input.note.clone();
        note.set_index(input.leaf_index);
        if path.element != note.commitment() {
            return Err(ProveError::InvalidInput(format!(
                "leaf at index {} is not the note's commitment",
                input.leaf_index
            )));
        }

        let nullifier_hash = note.nullifier()?;
        let witness = Witness::Mixer(MixerWitness {
            root: tree.root(),
            nullifier_hash,
            amount: note.amount,
            blinding: note.blinding,
            secret_key: spending_key_of(&note)?,
            siblings: path.siblings,
            path_bits: path.path_bits,
            recipient: input.recipient,
            relayer: input.relayer,
            fee: input.fee,
            refund: input.refund,
        });

        log::debug!("dispatching mixer witness to {:?}", self.backend);
        let engine_proof = self
            .backend
            .prove(Protocol::Mixer, &witness, &input.proving_key)?;

        Ok(ProofOutput {
            proof: engine_proof.proof,
            public_inputs: engine_proof.public_inputs,
            root: tree.root(),
            nullifiers: vec![nullifier_hash],
            output_notes: Vec::new(),
        })
    }
}

/// Bring a real input set to the arity the circuits expect
///
/// Dummies are zero-amount notes on the first note's chain, owned by the
/// first note's keypair, appended after the real inputs.
pub(crate) fn pad_inputs(inputs: Vec<Utxo>) -> Result<Vec<Utxo>, ProveError> {
    let target = match inputs.len() {
        0 => return Err(ProveError::TooFewInputs),
        1 | 2 => SMALL_ARITY,
        n if n <= LARGE_ARITY => LARGE_ARITY,
        n => return Err(ProveError::TooManyInputs { got: n }),
    };

    let template = inputs[0].clone();
    let mut padded = inputs;
    while padded.len() < target {
        padded.push(dummy_utxo(&template, template.chain_id, Some(template.keypair.clone())));
    }
    Ok(padded)
}

/// Bring the output set to the fixed output arity
pub(crate) fn pad_outputs(outputs: Vec<Utxo>, chain_id: TypedChainId) -> Vec<Utxo> {
    let template = outputs.first().cloned().unwrap_or_else(|| {
        Utxo::generate(UtxoInput::new(
            cloak_privacy::utxo::Curve::Bn254,
            cloak_privacy::utxo::Backend::Arkworks,
            0,
            chain_id,
        ))
    });

    let mut padded = outputs;
    while padded.len() < OUTPUT_ARITY {
        padded.push(dummy_utxo(&template, chain_id, None));
    }
    padded
}

/// A zero-amount, protocol-valid placeholder note
fn dummy_utxo(template: &Utxo, chain_id: TypedChainId, keypair: Option<Keypair>) -> Utxo {
    let mut input = UtxoInput::new(template.curve, template.backend, 0, chain_id).with_index(0);
    if let Some(keypair) = keypair {
        input = input.with_keypair(keypair);
    }
    Utxo::generate(input)
}

fn spending_key_of(utxo: &Utxo) -> Result<[u8; 32], ProveError> {
    utxo.keypair
        .spending_key()
        .map(|sk| *sk.as_bytes())
        .ok_or(ProveError::Privacy(PrivacyError::MissingPrivateKey))
}

fn sum_amounts(utxos: &[Utxo]) -> Result<i128, ProveError> {
    utxos.iter().try_fold(0i128, |acc, utxo| {
        acc.checked_add(to_i128(utxo.amount)?)
            .ok_or_else(|| ProveError::InvalidInput("amount sum overflow".into()))
    })
}

fn to_i128(amount: u128) -> Result<i128, ProveError> {
    i128::try_from(amount)
        .map_err(|_| ProveError::InvalidInput("amount exceeds 127 bits".into()))
}
