//! Typed Chain Identifiers
//!
//! A single integer encodes both a chain-family tag and the network's own
//! chain number, so leaf sets and proofs stay unambiguous across
//! heterogeneous chains.
//!
//! ```text
//! u64 layout (low 48 bits used):
//!   [ 16 bits chain type | 32 bits chain id ]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PrivacyError;

/// Chain-family tag for EVM networks
pub const CHAIN_TYPE_EVM: u16 = 0x0100;
/// Chain-family tag for substrate-style networks
pub const CHAIN_TYPE_SUBSTRATE: u16 = 0x0200;

/// A chain identifier carrying its chain-family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypedChainId {
    /// An EVM network identified by its EIP-155 chain id
    Evm(u32),
    /// A substrate-style network identified by its runtime chain id
    Substrate(u32),
}

impl TypedChainId {
    /// The chain-family tag
    pub fn chain_type(&self) -> u16 {
        match self {
            TypedChainId::Evm(_) => CHAIN_TYPE_EVM,
            TypedChainId::Substrate(_) => CHAIN_TYPE_SUBSTRATE,
        }
    }

    /// The network-specific chain number
    pub fn underlying(&self) -> u32 {
        match self {
            TypedChainId::Evm(id) | TypedChainId::Substrate(id) => *id,
        }
    }

    /// Pack into the canonical u64 form used in commitments and witnesses
    pub fn to_u64(self) -> u64 {
        ((self.chain_type() as u64) << 32) | self.underlying() as u64
    }

    /// Unpack from the canonical u64 form
    pub fn from_u64(raw: u64) -> Result<Self, PrivacyError> {
        let chain_type = (raw >> 32) as u16;
        let id = (raw & 0xFFFF_FFFF) as u32;

        // Bits above the 48-bit window must be clear
        if raw >> 48 != 0 {
            return Err(PrivacyError::MalformedEncoding(format!(
                "chain id {raw:#x} exceeds the 48-bit window"
            )));
        }

        match chain_type {
            CHAIN_TYPE_EVM => Ok(TypedChainId::Evm(id)),
            CHAIN_TYPE_SUBSTRATE => Ok(TypedChainId::Substrate(id)),
            other => Err(PrivacyError::MalformedEncoding(format!(
                "unknown chain type tag {other:#06x}"
            ))),
        }
    }

    /// Big-endian 8-byte form used in the encrypted note payload
    pub fn to_bytes(self) -> [u8; 8] {
        self.to_u64().to_be_bytes()
    }

    /// Parse the big-endian 8-byte form
    pub fn from_bytes(bytes: [u8; 8]) -> Result<Self, PrivacyError> {
        Self::from_u64(u64::from_be_bytes(bytes))
    }
}

impl std::fmt::Display for TypedChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_round_trip() {
        let chains = [
            TypedChainId::Evm(1),
            TypedChainId::Evm(1337),
            TypedChainId::Substrate(1080),
        ];

        for chain in chains {
            assert_eq!(TypedChainId::from_u64(chain.to_u64()).unwrap(), chain);
        }
    }

    #[test]
    fn test_bytes_round_trip() {
        let chain = TypedChainId::Evm(5);
        assert_eq!(TypedChainId::from_bytes(chain.to_bytes()).unwrap(), chain);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let raw = (0x0300u64 << 32) | 7;
        assert!(TypedChainId::from_u64(raw).is_err());
    }

    #[test]
    fn test_distinct_families_distinct_ids() {
        assert_ne!(
            TypedChainId::Evm(42).to_u64(),
            TypedChainId::Substrate(42).to_u64()
        );
    }
}
