//! Shielded Keypairs
//!
//! Spend authority and encryption capability for a note owner.
//!
//! ```text
//! sk ──Poseidon──► pubkey            (note ownership, in-circuit)
//!  │
//!  └──blake3 KDF──► x25519 secret ──► encryption pubkey   (note wrapping)
//! ```
//!
//! The encryption public key alone lets any counterparty encrypt *to* the
//! owner; decryption and nullifier signing require the spending key.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::PrivacyError;
use crate::hasher::{PoseidonHasher, fr_from_bytes, fr_to_bytes};

/// Wire overhead of an encrypted payload: ephemeral pk + nonce + tag
pub const ENCRYPTION_OVERHEAD: usize = 32 + 12 + 16;

/// Full spend authority over a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingKey {
    sk: [u8; 32],
}

impl SpendingKey {
    /// Generate a random spending key
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut sk = [0u8; 32];
        rng.fill_bytes(&mut sk);
        Self { sk }
    }

    pub fn from_bytes(sk: [u8; 32]) -> Self {
        Self { sk }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.sk
    }

    /// Derive the public key: Poseidon(sk)
    pub fn pubkey(&self) -> [u8; 32] {
        let hasher = PoseidonHasher::new();
        fr_to_bytes(hasher.hash_fields(&[fr_from_bytes(&self.sk)]))
    }

    /// Derive the X25519 secret used for note encryption
    fn encryption_secret(&self) -> StaticSecret {
        let mut kdf = blake3::Hasher::new_derive_key("cloak-keypair-encryption-v1");
        kdf.update(&self.sk);
        StaticSecret::from(*kdf.finalize().as_bytes())
    }

    /// The matching encryption public key
    pub fn encryption_pubkey(&self) -> [u8; 32] {
        *PublicKey::from(&self.encryption_secret()).as_bytes()
    }
}

/// Public half of a keypair: enough to receive and identify notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewingKey {
    pub pubkey: [u8; 32],
    pub encryption_pubkey: [u8; 32],
}

/// A note owner's key material
///
/// `Owned` carries the spending key; `Viewing` holds only public material,
/// so nullifier derivation and decryption are unavailable by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keypair {
    Owned(SpendingKey),
    Viewing(ViewingKey),
}

impl Keypair {
    /// Generate a fresh keypair with spend authority
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Keypair::Owned(SpendingKey::random(rng))
    }

    /// The owner public key bound into commitments
    pub fn pubkey(&self) -> [u8; 32] {
        match self {
            Keypair::Owned(sk) => sk.pubkey(),
            Keypair::Viewing(vk) => vk.pubkey,
        }
    }

    /// The X25519 key counterparties encrypt to
    pub fn encryption_pubkey(&self) -> [u8; 32] {
        match self {
            Keypair::Owned(sk) => sk.encryption_pubkey(),
            Keypair::Viewing(vk) => vk.encryption_pubkey,
        }
    }

    /// The spending key, if this keypair holds one
    pub fn spending_key(&self) -> Option<&SpendingKey> {
        match self {
            Keypair::Owned(sk) => Some(sk),
            Keypair::Viewing(_) => None,
        }
    }

    /// Drop the secret half
    pub fn to_viewing(&self) -> Keypair {
        Keypair::Viewing(ViewingKey {
            pubkey: self.pubkey(),
            encryption_pubkey: self.encryption_pubkey(),
        })
    }

    /// Encrypt a payload to this keypair's owner
    ///
    /// Works on both variants: only the encryption public key is needed.
    /// Wire format: `epk(32) || nonce(12) || ciphertext+tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        let ephemeral_secret = EphemeralSecret::random_from_rng(&mut rng);
        let ephemeral_pk = PublicKey::from(&ephemeral_secret);

        let recipient_key = PublicKey::from(self.encryption_pubkey());
        let shared_secret = ephemeral_secret.diffie_hellman(&recipient_key);
        let key = derive_payload_key(shared_secret.as_bytes(), ephemeral_pk.as_bytes());

        let mut nonce_bytes = [0u8; 12];
        rng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = ChaCha20Poly1305::new_from_slice(&key).expect("valid key length");
        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .expect("encryption should not fail");

        let mut out = Vec::with_capacity(32 + 12 + ciphertext.len());
        out.extend_from_slice(ephemeral_pk.as_bytes());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        out
    }

    /// Decrypt a payload produced by [`Keypair::encrypt`]
    ///
    /// Requires the spending key.
    pub fn decrypt(&self, bytes: &[u8]) -> Result<Vec<u8>, PrivacyError> {
        let sk = self.spending_key().ok_or(PrivacyError::MissingPrivateKey)?;

        if bytes.len() < ENCRYPTION_OVERHEAD {
            return Err(PrivacyError::MalformedEncoding(format!(
                "ciphertext too short: {} bytes",
                bytes.len()
            )));
        }

        let ephemeral_pk: [u8; 32] = bytes[0..32].try_into().expect("length checked");
        let nonce_bytes: [u8; 12] = bytes[32..44].try_into().expect("length checked");

        let shared_secret = sk
            .encryption_secret()
            .diffie_hellman(&PublicKey::from(ephemeral_pk));
        let key = derive_payload_key(shared_secret.as_bytes(), &ephemeral_pk);

        let cipher =
            ChaCha20Poly1305::new_from_slice(&key).map_err(|_| PrivacyError::DecryptionFailed)?;
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), &bytes[44..])
            .map_err(|_| PrivacyError::DecryptionFailed)
    }

    /// Hex segment used inside serialized UTXO strings
    ///
    /// Owned keypairs emit the 64-char secret; viewing keypairs emit the
    /// 128-char `pubkey || encryption_pubkey` pair.
    pub fn to_secret_segment(&self) -> String {
        match self {
            Keypair::Owned(sk) => hex::encode(sk.as_bytes()),
            Keypair::Viewing(vk) => {
                format!("{}{}", hex::encode(vk.pubkey), hex::encode(vk.encryption_pubkey))
            }
        }
    }

    /// Parse the segment written by [`Keypair::to_secret_segment`]
    pub fn from_secret_segment(segment: &str) -> Result<Keypair, PrivacyError> {
        match segment.len() {
            64 => {
                let bytes = decode_32(segment)?;
                Ok(Keypair::Owned(SpendingKey::from_bytes(bytes)))
            }
            128 => {
                let pubkey = decode_32(&segment[..64])?;
                let encryption_pubkey = decode_32(&segment[64..])?;
                Ok(Keypair::Viewing(ViewingKey {
                    pubkey,
                    encryption_pubkey,
                }))
            }
            other => Err(PrivacyError::MalformedEncoding(format!(
                "key segment of {other} chars"
            ))),
        }
    }
}

/// HKDF over the ECDH shared secret
fn derive_payload_key(shared_secret: &[u8], ephemeral_pk: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("cloak-note-v1");
    hasher.update(shared_secret);
    hasher.update(ephemeral_pk);
    *hasher.finalize().as_bytes()
}

fn decode_32(segment: &str) -> Result<[u8; 32], PrivacyError> {
    let bytes =
        hex::decode(segment).map_err(|e| PrivacyError::MalformedEncoding(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| PrivacyError::MalformedEncoding("expected 32 bytes".into()))
}
