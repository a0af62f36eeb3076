//! Shielded UTXOs
//!
//! A Utxo represents a single shielded output: an amount bound to a chain,
//! an owner and a blinding factor.
//!
//! ```text
//! commitment = Poseidon(chain_id, amount, pubkey, blinding)
//! nullifier  = Poseidon(commitment, index, Poseidon(sk, commitment, index))
//! ```
//!
//! The two proving backends use structurally distinct positional string
//! encodings; both are byte-exact round trips and a compatibility contract
//! with the external proving engine.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chain::TypedChainId;
use crate::error::PrivacyError;
use crate::hasher::{PoseidonHasher, fr_from_bytes, fr_to_bytes};
use crate::keypair::Keypair;

/// Encoding version tag carried by the Circom flavor
pub const UTXO_VERSION: &str = "v1";

/// Proving curve a UTXO is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Curve {
    Bn254,
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Curve::Bn254 => write!(f, "Bn254"),
        }
    }
}

impl FromStr for Curve {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bn254" => Ok(Curve::Bn254),
            other => Err(PrivacyError::MalformedEncoding(format!(
                "unknown curve '{other}'"
            ))),
        }
    }
}

/// Proving backend flavor, a closed discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    Arkworks,
    Circom,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Arkworks => write!(f, "Arkworks"),
            Backend::Circom => write!(f, "Circom"),
        }
    }
}

impl FromStr for Backend {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Arkworks" => Ok(Backend::Arkworks),
            "Circom" => Ok(Backend::Circom),
            other => Err(PrivacyError::MalformedEncoding(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

/// Construction parameters for [`Utxo::generate`]
///
/// Curve, backend, amount and chain are required; the rest default to a
/// fresh blinding, a fresh owned keypair and index 0.
#[derive(Debug, Clone)]
pub struct UtxoInput {
    pub curve: Curve,
    pub backend: Backend,
    pub amount: u128,
    pub chain_id: TypedChainId,
    pub index: Option<u64>,
    pub blinding: Option<[u8; 31]>,
    pub keypair: Option<Keypair>,
}

impl UtxoInput {
    pub fn new(curve: Curve, backend: Backend, amount: u128, chain_id: TypedChainId) -> Self {
        Self {
            curve,
            backend,
            amount,
            chain_id,
            index: None,
            blinding: None,
            keypair: None,
        }
    }

    pub fn with_index(mut self, index: u64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_blinding(mut self, blinding: [u8; 31]) -> Self {
        self.blinding = Some(blinding);
        self
    }

    pub fn with_keypair(mut self, keypair: Keypair) -> Self {
        self.keypair = Some(keypair);
        self
    }
}

/// A spendable or creatable shielded output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub curve: Curve,
    pub backend: Backend,
    pub amount: u128,
    pub chain_id: TypedChainId,
    /// Position in the commitment tree; `None` until inserted
    pub index: Option<u64>,
    /// Random field element hiding the commitment
    pub blinding: [u8; 31],
    pub keypair: Keypair,
}

impl Utxo {
    /// Create a UTXO, filling absent optional fields with fresh material
    pub fn generate(input: UtxoInput) -> Self {
        Self::generate_with_rng(input, &mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: Rng>(input: UtxoInput, rng: &mut R) -> Self {
        let blinding = input.blinding.unwrap_or_else(|| {
            let mut b = [0u8; 31];
            rng.fill_bytes(&mut b);
            b
        });
        let keypair = input.keypair.unwrap_or_else(|| Keypair::random(rng));

        Self {
            curve: input.curve,
            backend: input.backend,
            amount: input.amount,
            chain_id: input.chain_id,
            index: Some(input.index.unwrap_or(0)),
            blinding,
            keypair,
        }
    }

    /// Record the tree position once known; the only post-construction
    /// mutation a UTXO supports.
    pub fn set_index(&mut self, index: u64) {
        self.index = Some(index);
    }

    /// The public leaf: Poseidon(chain_id, amount, pubkey, blinding)
    pub fn commitment(&self) -> [u8; 32] {
        let hasher = PoseidonHasher::new();
        fr_to_bytes(hasher.hash_fields(&[
            Fr::from(self.chain_id.to_u64()),
            Fr::from(self.amount),
            fr_from_bytes(&self.keypair.pubkey()),
            self.blinding_field(),
        ]))
    }

    /// The one-time spend tag
    ///
    /// Requires spend authority and a committed tree index.
    pub fn nullifier(&self) -> Result<[u8; 32], PrivacyError> {
        let index = self.index.ok_or_else(|| {
            PrivacyError::InvalidInput("nullifier requires a committed tree index".into())
        })?;
        let sk = self
            .keypair
            .spending_key()
            .ok_or(PrivacyError::MissingPrivateKey)?;

        let hasher = PoseidonHasher::new();
        let commitment = fr_from_bytes(&self.commitment());
        let index_f = Fr::from(index);

        let signature = hasher.hash_fields(&[fr_from_bytes(sk.as_bytes()), commitment, index_f]);
        Ok(fr_to_bytes(hasher.hash_fields(&[
            commitment, index_f, signature,
        ])))
    }

    /// Blinding as a field element
    pub fn blinding_field(&self) -> Fr {
        fr_from_bytes(&self.blinding)
    }

    /// Positional string encoding, backend-specific field order and count
    pub fn serialize(&self) -> String {
        let index = self
            .index
            .map(|i| i.to_string())
            .unwrap_or_default();
        let blinding = hex::encode(self.blinding);
        let secret = self.keypair.to_secret_segment();

        match self.backend {
            Backend::Arkworks => format!(
                "{}&{}&{}&{}&{}&{}&{}",
                self.curve,
                self.backend,
                self.amount,
                self.chain_id,
                index,
                blinding,
                secret
            ),
            Backend::Circom => format!(
                "{}&{}&{}&{}&{}&{}&{}&{}",
                self.curve,
                self.backend,
                UTXO_VERSION,
                self.amount,
                self.chain_id,
                index,
                blinding,
                secret
            ),
        }
    }

    /// Reconstitute a UTXO from its positional string encoding
    pub fn deserialize(s: &str) -> Result<Self, PrivacyError> {
        let parts: Vec<&str> = s.split('&').collect();
        if parts.len() < 2 {
            return Err(PrivacyError::MalformedEncoding(
                "missing curve/backend prefix".into(),
            ));
        }

        let curve: Curve = parts[0].parse()?;
        let backend: Backend = parts[1].parse()?;

        let expected = match backend {
            Backend::Arkworks => 7,
            Backend::Circom => 8,
        };
        if parts.len() != expected {
            return Err(PrivacyError::MalformedEncoding(format!(
                "{backend} encoding expects {expected} fields, got {}",
                parts.len()
            )));
        }

        let offset = match backend {
            Backend::Arkworks => 2,
            Backend::Circom => {
                if parts[2] != UTXO_VERSION {
                    return Err(PrivacyError::MalformedEncoding(format!(
                        "unsupported version '{}'",
                        parts[2]
                    )));
                }
                3
            }
        };

        let amount: u128 = parts[offset]
            .parse()
            .map_err(|_| PrivacyError::MalformedEncoding("bad amount field".into()))?;
        let chain_raw: u64 = parts[offset + 1]
            .parse()
            .map_err(|_| PrivacyError::MalformedEncoding("bad chain field".into()))?;
        let chain_id = TypedChainId::from_u64(chain_raw)?;

        let index = if parts[offset + 2].is_empty() {
            None
        } else {
            Some(
                parts[offset + 2]
                    .parse()
                    .map_err(|_| PrivacyError::MalformedEncoding("bad index field".into()))?,
            )
        };

        let blinding_bytes = hex::decode(parts[offset + 3])
            .map_err(|e| PrivacyError::MalformedEncoding(e.to_string()))?;
        let blinding: [u8; 31] = blinding_bytes
            .try_into()
            .map_err(|_| PrivacyError::MalformedEncoding("blinding must be 31 bytes".into()))?;

        let keypair = Keypair::from_secret_segment(parts[offset + 4])?;

        Ok(Self {
            curve,
            backend,
            amount,
            chain_id,
            index,
            blinding,
            keypair,
        })
    }
}

impl FromStr for Utxo {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::deserialize(s)
    }
}
