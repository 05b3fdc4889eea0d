//! Proof Validation Module
//!
//! This module validates bridge proofs before anything is released on a
//! target chain. A proof is accepted only when three independent checks pass:
//!
//! 1. **Merkle inclusion** - the escrow leaf is committed by the finalized
//!    source block root
//! 2. **Signatures** - a quorum of the source chain's validator set signed the
//!    proof commitment
//! 3. **Freshness** - the proof is neither too old nor from the future
//!
//! The checks run concurrently. Validation does not mutate anything, so the
//! same inputs (proof, finalized root, validator set, clock) always give the
//! same outcome.
//!
//! ## Security Requirements
//!
//! ⚠️ **CRITICAL**: Replay protection is not part of validation; the bridge
//! must claim `(escrow_id, nonce)` in the result store before release.

use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::crypto::{self, HashScheme};
use crate::error::{BridgeError, Result};
use crate::proof::BridgeProof;
use crate::types::{unix_now, ChainId, Digest};

// ============================================================================
// TRUST CONFIGURATION
// ============================================================================

/// Fraction of a validator set that must sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quorum {
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for Quorum {
    fn default() -> Self {
        Self {
            numerator: 2,
            denominator: 3,
        }
    }
}

impl Quorum {
    /// Minimum number of valid signatures for a set of `set_size` validators.
    /// Never below one, so no proof passes unsigned.
    pub fn required(&self, set_size: usize) -> usize {
        let numerator = self.numerator as usize * set_size;
        let denominator = self.denominator.max(1) as usize;
        ((numerator + denominator - 1) / denominator).max(1)
    }

    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0 && self.numerator <= self.denominator
    }
}

/// What the validator trusts for one source chain.
#[derive(Debug, Clone)]
pub struct ChainTrust {
    /// Signer id (base64 public key) -> verifying key
    pub validators: HashMap<String, VerifyingKey>,
    pub quorum: Quorum,
    pub hash_scheme: HashScheme,
}

impl ChainTrust {
    /// Builds a trust entry from base64-encoded validator public keys.
    ///
    /// # Returns
    ///
    /// * `Err(BridgeError::Configuration)` - Empty set or a key that does not parse
    pub fn from_validator_set(
        validator_set: &[String],
        quorum: Quorum,
        hash_scheme: HashScheme,
    ) -> Result<Self> {
        if validator_set.is_empty() {
            return Err(BridgeError::Configuration(
                "validator set must not be empty".to_string(),
            ));
        }
        let mut validators = HashMap::new();
        for public_key in validator_set {
            let key = crypto::parse_public_key(public_key).map_err(|e| {
                BridgeError::Configuration(format!("Invalid validator key '{}': {}", public_key, e))
            })?;
            validators.insert(public_key.clone(), key);
        }
        Ok(Self {
            validators,
            quorum,
            hash_scheme,
        })
    }

    pub fn required_signatures(&self) -> usize {
        self.quorum.required(self.validators.len())
    }
}

/// Source of finalized block roots.
#[async_trait]
pub trait FinalizedRoots: Send + Sync {
    /// Root of the finalized block at `height`, or `None` if the block is not
    /// finalized (or unknown).
    async fn finalized_root(&self, chain: ChainId, height: u64) -> Option<Digest>;
}

// ============================================================================
// VALIDATION OUTCOME
// ============================================================================

/// Per-check results of one validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub merkle: Result<()>,
    pub signatures: Result<()>,
    pub freshness: Result<()>,
    /// Clock value the proof was validated against
    pub validated_at: u64,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.merkle.is_ok() && self.signatures.is_ok() && self.freshness.is_ok()
    }

    /// First failing check (merkle, then signatures, then freshness).
    pub fn into_result(self) -> Result<()> {
        self.merkle?;
        self.signatures?;
        self.freshness
    }
}

// ============================================================================
// PROOF VALIDATOR
// ============================================================================

pub struct ProofValidator {
    trust: HashMap<ChainId, ChainTrust>,
    roots: Arc<dyn FinalizedRoots>,
    max_age_secs: u64,
    max_clock_skew_secs: u64,
}

impl ProofValidator {
    pub fn new(roots: Arc<dyn FinalizedRoots>, max_age_secs: u64, max_clock_skew_secs: u64) -> Self {
        Self {
            trust: HashMap::new(),
            roots,
            max_age_secs,
            max_clock_skew_secs,
        }
    }

    /// Registers the validator set and hash scheme of a source chain.
    pub fn add_chain(&mut self, chain: ChainId, trust: ChainTrust) {
        info!(
            "Trusting {} validators for {} (quorum {}/{})",
            trust.validators.len(),
            chain,
            trust.quorum.numerator,
            trust.quorum.denominator
        );
        self.trust.insert(chain, trust);
    }

    pub fn trust(&self, chain: ChainId) -> Option<&ChainTrust> {
        self.trust.get(&chain)
    }

    /// Validates `proof` against the current clock.
    pub async fn validate(&self, proof: &BridgeProof) -> ValidationOutcome {
        self.validate_at(proof, unix_now()).await
    }

    /// Validates `proof` as of `now` (Unix seconds).
    pub async fn validate_at(&self, proof: &BridgeProof, now: u64) -> ValidationOutcome {
        let (merkle, signatures, freshness) = tokio::join!(
            self.check_merkle(proof),
            self.check_signatures(proof),
            self.check_freshness(proof, now)
        );

        let outcome = ValidationOutcome {
            merkle,
            signatures,
            freshness,
            validated_at: now,
        };
        if outcome.is_valid() {
            debug!("Proof for escrow {} passed validation", proof.escrow_id);
        } else {
            warn!(
                "Proof for escrow {} failed validation: {:?}",
                proof.escrow_id,
                outcome.clone().into_result().err()
            );
        }
        outcome
    }

    fn trust_for(&self, chain: ChainId) -> Result<&ChainTrust> {
        self.trust.get(&chain).ok_or(BridgeError::UnsupportedChain(chain))
    }

    async fn check_merkle(&self, proof: &BridgeProof) -> Result<()> {
        let trust = self.trust_for(proof.source_chain)?;

        if proof.asset.chain() != proof.source_chain {
            return Err(BridgeError::InvalidMerkleProof(format!(
                "asset originates on {} but proof claims {}",
                proof.asset.chain(),
                proof.source_chain
            )));
        }
        if proof.asset.amount() != &proof.amount {
            return Err(BridgeError::InvalidMerkleProof(format!(
                "proof amount {} does not match asset amount {}",
                proof.amount,
                proof.asset.amount()
            )));
        }

        let leaf = proof.leaf(trust.hash_scheme);
        let computed = proof.merkle_path.compute_root(trust.hash_scheme, &leaf);
        let finalized = self
            .roots
            .finalized_root(proof.source_chain, proof.block_height)
            .await
            .ok_or_else(|| {
                BridgeError::InvalidMerkleProof(format!(
                    "no finalized root for {} at height {}",
                    proof.source_chain, proof.block_height
                ))
            })?;

        if computed != finalized {
            return Err(BridgeError::InvalidMerkleProof(format!(
                "computed root 0x{} does not match finalized root 0x{}",
                hex::encode(computed),
                hex::encode(finalized)
            )));
        }
        Ok(())
    }

    async fn check_signatures(&self, proof: &BridgeProof) -> Result<()> {
        let trust = self.trust_for(proof.source_chain)?;
        let message = proof.signing_message(trust.hash_scheme)?;

        let mut seen = HashSet::new();
        let mut valid = 0usize;
        for signature in &proof.signatures {
            if !seen.insert(signature.signer.as_str()) {
                return Err(BridgeError::DuplicateSigner(signature.signer.clone()));
            }
            let key = trust
                .validators
                .get(&signature.signer)
                .ok_or_else(|| BridgeError::UnknownSigner(signature.signer.clone()))?;

            match crypto::verify_signature(key, &message, &signature.signature) {
                Ok(true) => valid += 1,
                Ok(false) => debug!("Signature from {} does not verify", signature.signer),
                Err(e) => debug!("Malformed signature from {}: {}", signature.signer, e),
            }
        }

        let required = trust.required_signatures();
        if valid < required {
            return Err(BridgeError::InsufficientSignatures { valid, required });
        }
        Ok(())
    }

    async fn check_freshness(&self, proof: &BridgeProof, now: u64) -> Result<()> {
        if now >= proof.timestamp {
            let age_secs = now - proof.timestamp;
            if age_secs > self.max_age_secs {
                return Err(BridgeError::ProofExpired {
                    age_secs,
                    max_age_secs: self.max_age_secs,
                });
            }
        } else {
            let ahead_secs = proof.timestamp - now;
            if ahead_secs > self.max_clock_skew_secs {
                return Err(BridgeError::ProofNotYetValid {
                    ahead_secs,
                    max_skew_secs: self.max_clock_skew_secs,
                });
            }
        }
        Ok(())
    }
}
