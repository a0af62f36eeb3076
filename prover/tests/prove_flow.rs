//! End-to-end proving flows against deterministic hash engines
//!
//! The engines here stand in for the real cryptographic modules: a proof is
//! a keyed hash over the public signals, so verification genuinely fails
//! when any public signal is tampered with.

use std::collections::HashMap;
use std::sync::Arc;

use cloak_privacy::utxo::{Backend, Curve};
use cloak_privacy::{Keypair, MerkleTree, PoseidonHasher, TypedChainId, Utxo, UtxoInput};
use cloak_prover::{
    ArkworksEngine, BackendError, CircomEngine, EngineProof, ExtData, MixerProofInput,
    PoolProofInput, ProofInput, Protocol, ProveError, ProverBackend, ProvingManager,
    ProvingService, Witness,
};

/// Proof = blake3(proving_key || public signals); verify by recomputation.
struct HashEngine;

fn signals_of(witness: &Witness) -> Vec<String> {
    match witness {
        Witness::Pool(w) => {
            let mut signals = vec![hex::encode(w.roots[0]), hex::encode(w.ext_data_hash)];
            signals.extend(w.inputs.iter().map(|i| hex::encode(i.nullifier)));
            signals.extend(w.outputs.iter().map(|o| hex::encode(o.commitment)));
            signals
        }
        Witness::Mixer(w) => vec![hex::encode(w.root), hex::encode(w.nullifier_hash)],
    }
}

fn bind(key: &[u8], signals: &[String]) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(key);
    for signal in signals {
        hasher.update(signal.as_bytes());
    }
    hasher.finalize().as_bytes().to_vec()
}

impl ArkworksEngine for HashEngine {
    fn prove(
        &self,
        _protocol: Protocol,
        witness: &Witness,
        proving_key: &[u8],
    ) -> Result<EngineProof, BackendError> {
        let public_inputs = signals_of(witness);
        Ok(EngineProof {
            proof: bind(proving_key, &public_inputs),
            public_inputs,
        })
    }

    fn verify(
        &self,
        verifying_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, BackendError> {
        Ok(bind(verifying_key, public_inputs) == proof)
    }
}

/// Circom flavor of the same idea, with an explicit witness stage that
/// produces a proof whose length is not a 32-byte multiple.
struct CircomHashEngine;

impl CircomEngine for CircomHashEngine {
    fn calculate_witness(&self, witness: &Witness) -> Result<Vec<u8>, BackendError> {
        Ok(signals_of(witness).join("&").into_bytes())
    }

    fn prove(&self, proving_key: &[u8], wtns: &[u8]) -> Result<EngineProof, BackendError> {
        let signals: Vec<String> = String::from_utf8(wtns.to_vec())
            .map_err(|e| BackendError(e.to_string()))?
            .split('&')
            .map(str::to_string)
            .collect();
        let mut proof = bind(proving_key, &signals);
        proof.truncate(20);
        Ok(EngineProof {
            proof,
            public_inputs: signals,
        })
    }

    fn verify(
        &self,
        verifying_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, BackendError> {
        let mut expected = bind(verifying_key, public_inputs);
        expected.truncate(20);
        Ok(&proof[..20] == expected && proof[20..].iter().all(|b| *b == 0))
    }
}

fn arkworks_manager(depth: usize) -> ProvingManager {
    ProvingManager::new(ProverBackend::Arkworks(Arc::new(HashEngine))).with_tree_depth(depth)
}

fn ext_data(fee: u128) -> ExtData {
    ExtData {
        recipient: vec![0x11; 20],
        relayer: vec![0x22; 20],
        ext_amount: 0,
        fee,
        refund: 0,
        token: None,
        encrypted_output1: vec![],
        encrypted_output2: vec![],
    }
}

fn note(amount: u128, chain: TypedChainId, keypair: &Keypair) -> Utxo {
    Utxo::generate(
        UtxoInput::new(Curve::Bn254, Backend::Arkworks, amount, chain)
            .with_keypair(keypair.clone()),
    )
}

/// Spend one real note out of a depth-2 tree; the second circuit slot is a
/// zero-amount dummy.
fn single_spend_input(chain: TypedChainId) -> (PoolProofInput, [u8; 32]) {
    let mut rng = rand::thread_rng();
    let keypair = Keypair::random(&mut rng);

    let mut spend = note(100, chain, &keypair);
    spend.set_index(0);
    let commitment = spend.commitment();

    let tree = MerkleTree::with_leaves(2, PoseidonHasher::new(), "pool", &[commitment]).unwrap();
    let root = tree.root();

    let change = note(90, chain, &keypair);

    let input = PoolProofInput {
        inputs: vec![spend],
        outputs: vec![change],
        leaves: HashMap::from([(chain, vec![commitment])]),
        roots: vec![root],
        chain_id: chain,
        public_amount: 0,
        ext_data: ext_data(10),
        proving_key: b"pool-pk".to_vec(),
    };
    (input, root)
}

#[test]
fn test_pool_prove_and_verify() {
    let chain = TypedChainId::Evm(1);
    let manager = arkworks_manager(2);
    let (input, root) = single_spend_input(chain);
    let expected_nullifier = input.inputs[0].nullifier().unwrap();

    let output = manager.prove(ProofInput::Pool(input)).unwrap();

    assert_eq!(output.root, root);
    assert_eq!(output.nullifiers, vec![expected_nullifier]);
    // padded to the fixed output arity
    assert_eq!(output.output_notes.len(), 2);

    assert!(manager
        .verify(b"pool-pk", &output.public_inputs, &output.proof)
        .unwrap());
}

#[test]
fn test_tampered_ext_data_fails_verification() {
    let chain = TypedChainId::Evm(1);
    let manager = arkworks_manager(2);
    let (input, _) = single_spend_input(chain);

    let output = manager.prove(ProofInput::Pool(input.clone())).unwrap();

    // redirect the withdrawal and substitute the rebound hash
    let mut tampered_ext = input.ext_data.clone();
    tampered_ext.recipient = vec![0x66; 20];

    let mut tampered_inputs = output.public_inputs.clone();
    tampered_inputs[1] = hex::encode(tampered_ext.hash());

    assert!(!manager
        .verify(b"pool-pk", &tampered_inputs, &output.proof)
        .unwrap());
}

#[test]
fn test_balance_mismatch_message() {
    let chain = TypedChainId::Evm(1);
    let manager = arkworks_manager(2);
    let mut rng = rand::thread_rng();
    let keypair = Keypair::random(&mut rng);

    let input = PoolProofInput {
        inputs: vec![note(100, chain, &keypair), note(70, chain, &keypair)],
        outputs: vec![note(1600, chain, &keypair), note(10, chain, &keypair)],
        leaves: HashMap::new(),
        roots: vec![],
        chain_id: chain,
        public_amount: 0,
        ext_data: ext_data(0),
        proving_key: b"pool-pk".to_vec(),
    };

    let err = manager.prove(ProofInput::Pool(input)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Output amount and input amount don't match input(170) != output(1610)"
    );
}

#[test]
fn test_deposit_with_public_amount() {
    // 0 real value in, 500 public in, 500 out: conservation holds
    let chain = TypedChainId::Evm(1);
    let manager = arkworks_manager(2);
    let mut rng = rand::thread_rng();
    let keypair = Keypair::random(&mut rng);

    let mut spend = note(0, chain, &keypair);
    spend.set_index(0);
    let commitment = spend.commitment();

    let input = PoolProofInput {
        inputs: vec![spend],
        outputs: vec![note(500, chain, &keypair)],
        leaves: HashMap::from([(chain, vec![commitment])]),
        roots: vec![],
        chain_id: chain,
        public_amount: 500,
        ext_data: ext_data(0),
        proving_key: b"pool-pk".to_vec(),
    };

    let output = manager.prove(ProofInput::Pool(input)).unwrap();
    assert!(manager
        .verify(b"pool-pk", &output.public_inputs, &output.proof)
        .unwrap());
}

#[test]
fn test_circom_backend_emits_calldata_limbs() {
    let chain = TypedChainId::Evm(1);
    let manager = ProvingManager::new(ProverBackend::Circom(Arc::new(CircomHashEngine)))
        .with_tree_depth(2);
    let (input, _) = single_spend_input(chain);

    let output = manager.prove(ProofInput::Pool(input)).unwrap();

    // the 20-byte engine proof is zero-padded to a 32-byte limb
    assert_eq!(output.proof.len(), 32);
    assert!(output.proof[20..].iter().all(|b| *b == 0));

    assert!(manager
        .verify(b"irrelevant-vk", &output.public_inputs, &output.proof)
        .unwrap());
}

#[test]
fn test_mixer_prove_and_verify() {
    let chain = TypedChainId::Evm(1);
    let manager = arkworks_manager(3);
    let mut rng = rand::thread_rng();
    let keypair = Keypair::random(&mut rng);

    let deposit = note(1000, chain, &keypair);
    let mut leaves = vec![[7u8; 32], [8u8; 32]];
    leaves.push(deposit.commitment());

    let input = MixerProofInput {
        note: deposit.clone(),
        leaves,
        leaf_index: 2,
        recipient: vec![0x11; 20],
        relayer: vec![],
        fee: 0,
        refund: 0,
        proving_key: b"mixer-pk".to_vec(),
    };

    let output = manager.prove(ProofInput::Mixer(input)).unwrap();

    let mut committed = deposit;
    committed.set_index(2);
    assert_eq!(output.nullifiers, vec![committed.nullifier().unwrap()]);
    assert!(output.output_notes.is_empty());

    assert!(manager
        .verify(b"mixer-pk", &output.public_inputs, &output.proof)
        .unwrap());
}

#[test]
fn test_mixer_rejects_wrong_leaf() {
    let chain = TypedChainId::Evm(1);
    let manager = arkworks_manager(3);
    let mut rng = rand::thread_rng();

    let deposit = note(1000, chain, &Keypair::random(&mut rng));
    let input = MixerProofInput {
        note: deposit,
        leaves: vec![[7u8; 32], [8u8; 32]],
        leaf_index: 1,
        recipient: vec![0x11; 20],
        relayer: vec![],
        fee: 0,
        refund: 0,
        proving_key: b"mixer-pk".to_vec(),
    };

    assert!(matches!(
        manager.prove(ProofInput::Mixer(input)).unwrap_err(),
        ProveError::InvalidInput(_)
    ));
}

#[tokio::test]
async fn test_service_serializes_requests() {
    let chain = TypedChainId::Evm(1);
    let service = ProvingService::start(arkworks_manager(2));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let service = service.clone();
        let (input, _) = single_spend_input(chain);
        handles.push(tokio::spawn(
            async move { service.prove(ProofInput::Pool(input)).await },
        ));
    }

    for handle in handles {
        let output = handle.await.unwrap().unwrap();
        assert!(!output.proof.is_empty());
    }
}

#[tokio::test]
async fn test_service_reports_structural_errors() {
    let chain = TypedChainId::Evm(1);
    let service = ProvingService::start(arkworks_manager(2));

    let (mut input, _) = single_spend_input(chain);
    input.proving_key.clear();

    assert!(matches!(
        service.prove(ProofInput::Pool(input)).await.unwrap_err(),
        ProveError::InvalidInput(_)
    ));
}
