//! Bridge Proof Module
//!
//! A bridge proof asserts that an escrow was locked on the source chain. It
//! carries the merkle inclusion path of the escrow leaf in a finalized source
//! block and a set of validator signatures over the proof commitment.
//!
//! Proofs travel as JSON; the commitment the validators sign is the BCS
//! encoding of [`ProofCommitment`].

pub mod merkle;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::crypto::{HashScheme, ValidatorSignature};
use crate::error::{BridgeError, Result};
use crate::types::{amount_serde, Address, ChainId, Digest, EscrowId};

pub use merkle::{MerklePath, MerkleTree};

// ============================================================================
// PROOF STRUCTURES
// ============================================================================

/// Validator-signed assertion that an escrow was locked.
///
/// Immutable once generated. The `(escrow_id, nonce)` pair is unique across
/// all proofs the bridge accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeProof {
    pub escrow_id: EscrowId,
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    pub sender: Address,
    pub recipient: Address,
    /// Locked asset as it exists on the source chain
    pub asset: Asset,
    #[serde(with = "amount_serde")]
    pub amount: BigUint,
    /// Sender nonce assigned from source chain state
    pub nonce: u64,
    /// Source block whose root commits the escrow leaf
    pub block_height: u64,
    pub merkle_path: MerklePath,
    pub signatures: Vec<ValidatorSignature>,
    /// Unix timestamp (seconds) when the proof was generated
    pub timestamp: u64,
}

/// Message signed by validators for one proof.
///
/// Everything except the signatures themselves and the raw sibling list; the
/// leaf digest binds the escrow id, amount and recipient, and the path is
/// bound through the finalized root check.
#[derive(Debug, Clone, Serialize)]
pub struct ProofCommitment {
    pub escrow_id: String,
    pub source_chain: u64,
    pub target_chain: u64,
    pub sender: String,
    pub recipient: String,
    pub asset_key: String,
    pub amount: Vec<u8>,
    pub nonce: u64,
    pub block_height: u64,
    pub leaf_index: u64,
    pub leaf: Digest,
    pub timestamp: u64,
}

impl BridgeProof {
    /// Leaf digest of this proof under `scheme`.
    pub fn leaf(&self, scheme: HashScheme) -> Digest {
        leaf_digest(scheme, &self.escrow_id, &self.amount, &self.recipient)
    }

    /// Builds the commitment validators sign.
    pub fn commitment(&self, scheme: HashScheme) -> ProofCommitment {
        ProofCommitment {
            escrow_id: self.escrow_id.clone(),
            source_chain: self.source_chain.0,
            target_chain: self.target_chain.0,
            sender: self.sender.clone(),
            recipient: self.recipient.clone(),
            asset_key: self.asset.key(),
            amount: self.amount.to_bytes_be(),
            nonce: self.nonce,
            block_height: self.block_height,
            leaf_index: self.merkle_path.leaf_index,
            leaf: self.leaf(scheme),
            timestamp: self.timestamp,
        }
    }

    /// BCS-encoded commitment bytes.
    pub fn signing_message(&self, scheme: HashScheme) -> Result<Vec<u8>> {
        bcs::to_bytes(&self.commitment(scheme))
            .map_err(|e| BridgeError::ProofGenerationFailed(format!("Failed to encode commitment: {}", e)))
    }

    /// JSON encoding for transmission.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| BridgeError::ProofGenerationFailed(format!("Failed to serialize proof: {}", e)))
    }

    /// Parses a proof received from another party.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| BridgeError::InvalidMerkleProof(format!("Malformed proof: {}", e)))
    }
}

/// Escrow leaf: `H(0x00 || escrow_id || amount_be || H(recipient))`.
pub fn leaf_digest(scheme: HashScheme, escrow_id: &str, amount: &BigUint, recipient: &str) -> Digest {
    let recipient_hash = scheme.digest(&[recipient.as_bytes()]);
    let amount_bytes = amount.to_bytes_be();
    scheme.hash_leaf(&[escrow_id.as_bytes(), &amount_bytes, &recipient_hash])
}
