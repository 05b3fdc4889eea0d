//! Hash schemes
//!
//! Each chain commits escrow leaves with its own hash function. The scheme is
//! selected per chain (configurable, with a default per chain family) and is
//! used both when a source adapter builds inclusion paths and when the
//! validator recomputes roots.
//!
//! Leaves and interior nodes hash under distinct one-byte prefixes, so no
//! leaf preimage can be presented as an interior node or the other way round.

use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest as _, Keccak256, Sha3_256};

use crate::types::{ChainType, Digest};

/// Prefix of every merkle leaf preimage
pub const LEAF_PREFIX: u8 = 0x00;
/// Prefix of every interior merkle node preimage
pub const NODE_PREFIX: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashScheme {
    /// Keccak-256 (EVM)
    Keccak256,
    /// SHA3-256 (Move VM)
    Sha3_256,
    /// SHA-256 (Solana, Bitcoin)
    Sha256,
}

impl HashScheme {
    /// Default scheme for a chain family.
    pub fn default_for(chain_type: ChainType) -> Self {
        match chain_type {
            ChainType::Evm => HashScheme::Keccak256,
            ChainType::Mvm => HashScheme::Sha3_256,
            ChainType::Svm | ChainType::Utxo => HashScheme::Sha256,
        }
    }

    /// Hashes the concatenation of `parts`.
    pub fn digest(&self, parts: &[&[u8]]) -> Digest {
        match self {
            HashScheme::Keccak256 => finalize::<Keccak256>(parts),
            HashScheme::Sha3_256 => finalize::<Sha3_256>(parts),
            HashScheme::Sha256 => finalize::<Sha256>(parts),
        }
    }

    /// Hashes a merkle leaf from its fields.
    pub fn hash_leaf(&self, parts: &[&[u8]]) -> Digest {
        let mut prefixed: Vec<&[u8]> = Vec::with_capacity(parts.len() + 1);
        prefixed.push(&[LEAF_PREFIX]);
        prefixed.extend_from_slice(parts);
        self.digest(&prefixed)
    }

    /// Hashes an interior merkle node.
    pub fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest {
        self.digest(&[&[NODE_PREFIX], left.as_slice(), right.as_slice()])
    }
}

fn finalize<H: sha3::Digest>(parts: &[&[u8]]) -> Digest {
    let mut hasher = H::new();
    for part in parts {
        hasher.update(*part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize()[..32]);
    out
}
