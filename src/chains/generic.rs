//! Shared adapter machinery
//!
//! This module contains what every chain adapter does the same way: proof
//! assembly against the chain ledger, validator signature collection, and
//! address format checks.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::asset::Asset;
use crate::crypto::{HashScheme, ValidatorSignature, ValidatorSigner};
use crate::error::{BridgeError, Result};
use crate::proof::{leaf_digest, BridgeProof};
use crate::types::{unix_now, ChainId};

use super::{ChainLedger, ProofRequest, TxReceipt};

// ============================================================================
// ATTESTORS
// ============================================================================

/// A validator that can be asked to sign a proof commitment.
#[async_trait]
pub trait Attestor: Send + Sync {
    fn signer_id(&self) -> String;

    async fn attest(&self, message: &[u8]) -> Result<ValidatorSignature>;
}

/// Attestor holding the validator key in process.
pub struct LocalAttestor {
    signer: ValidatorSigner,
}

impl LocalAttestor {
    pub fn new(signer: ValidatorSigner) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl Attestor for LocalAttestor {
    fn signer_id(&self) -> String {
        self.signer.signer_id()
    }

    async fn attest(&self, message: &[u8]) -> Result<ValidatorSignature> {
        Ok(self.signer.sign(message))
    }
}

/// Asks attestors concurrently until `required` signatures are in.
pub struct SignatureCollector {
    attestors: Vec<Arc<dyn Attestor>>,
    required: usize,
}

impl SignatureCollector {
    pub fn new(attestors: Vec<Arc<dyn Attestor>>, required: usize) -> Self {
        Self { attestors, required }
    }

    pub fn required(&self) -> usize {
        self.required
    }

    /// Collects signatures over `message`.
    ///
    /// Returns as soon as the quorum is reached; outstanding requests are
    /// dropped. Fails with `ProofGenerationFailed` when every attestor has
    /// answered and the quorum is still short.
    pub async fn collect(&self, message: &[u8]) -> Result<Vec<ValidatorSignature>> {
        let mut pending: FuturesUnordered<_> = self
            .attestors
            .iter()
            .map(|attestor| async move { (attestor.signer_id(), attestor.attest(message).await) })
            .collect();

        let mut signatures = Vec::with_capacity(self.required);
        while signatures.len() < self.required {
            match pending.next().await {
                Some((_, Ok(signature))) => signatures.push(signature),
                Some((signer, Err(e))) => warn!("Attestor {} did not sign: {}", signer, e),
                None => {
                    return Err(BridgeError::ProofGenerationFailed(format!(
                        "collected {} of {} required signatures",
                        signatures.len(),
                        self.required
                    )))
                }
            }
        }
        Ok(signatures)
    }
}

// ============================================================================
// ADAPTER CORE
// ============================================================================

/// Proof generation and submission against a [`ChainLedger`].
pub struct AdapterCore {
    chain: ChainId,
    ledger: Arc<ChainLedger>,
    collector: SignatureCollector,
}

impl AdapterCore {
    pub fn new(chain: ChainId, ledger: Arc<ChainLedger>, collector: SignatureCollector) -> Self {
        Self {
            chain,
            ledger,
            collector,
        }
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn hash_scheme(&self) -> HashScheme {
        self.ledger.hash_scheme()
    }

    pub fn ledger(&self) -> &Arc<ChainLedger> {
        &self.ledger
    }

    pub async fn next_nonce(&self, sender: &str) -> u64 {
        self.ledger.next_nonce(sender).await
    }

    /// Commits the escrow leaf, seals its block, and collects signatures.
    pub async fn generate_proof(&self, request: &ProofRequest) -> Result<BridgeProof> {
        if request.source_chain != self.chain {
            return Err(BridgeError::ProofGenerationFailed(format!(
                "request for {} sent to {} adapter",
                request.source_chain, self.chain
            )));
        }

        self.ledger
            .consume_nonce(&request.sender, &request.escrow_id, request.nonce)
            .await?;

        let scheme = self.hash_scheme();
        let amount = request.asset.amount().clone();
        let leaf = leaf_digest(scheme, &request.escrow_id, &amount, &request.recipient);
        let (block_height, leaf_index) = self.ledger.include(leaf).await;
        self.ledger.seal_through(block_height).await?;
        let merkle_path = self.ledger.path(block_height, leaf_index).await?;
        debug!(
            "Escrow {} committed on {} at block {} index {}",
            request.escrow_id, self.chain, block_height, leaf_index
        );

        let mut proof = BridgeProof {
            escrow_id: request.escrow_id.clone(),
            source_chain: request.source_chain,
            target_chain: request.target_chain,
            sender: request.sender.clone(),
            recipient: request.recipient.clone(),
            asset: request.asset.clone(),
            amount,
            nonce: request.nonce,
            block_height,
            merkle_path,
            signatures: Vec::new(),
            timestamp: unix_now(),
        };
        let message = proof.signing_message(scheme)?;
        proof.signatures = self.collector.collect(&message).await?;

        info!(
            "Generated proof for escrow {} ({} signatures)",
            proof.escrow_id,
            proof.signatures.len()
        );
        Ok(proof)
    }

    /// Records the mint of `minted` for the proof's escrow.
    pub async fn submit(&self, proof: &BridgeProof, minted: Asset) -> Result<TxReceipt> {
        if proof.target_chain != self.chain {
            return Err(BridgeError::SubmissionFailed {
                chain: self.chain,
                reason: format!("proof targets {}", proof.target_chain),
            });
        }
        let receipt = self.ledger.record_mint(&proof.escrow_id, minted).await;
        info!(
            "Submitted escrow {} on {}: tx {}",
            proof.escrow_id, self.chain, receipt.tx_hash
        );
        Ok(receipt)
    }
}

// ============================================================================
// ADDRESS VALIDATION UTILITIES
// ============================================================================

/// Pads a hex address to `hex_len` characters and adds the `0x` prefix.
///
/// Move VM addresses may be serialized without leading zeros, so they are
/// normalized before validation or comparison.
pub fn normalize_hex_address(address: &str, hex_len: usize) -> String {
    let address_no_prefix = address.strip_prefix("0x").unwrap_or(address);
    if address_no_prefix.len() < hex_len {
        format!("0x{:0>width$}", address_no_prefix, width = hex_len)
    } else {
        format!("0x{}", address_no_prefix)
    }
}

/// Validates a `0x`-prefixed (or bare) hex address of exactly `hex_len` characters.
pub fn validate_hex_address(address: &str, hex_len: usize, label: &str) -> Result<()> {
    let address_no_prefix = address.strip_prefix("0x").unwrap_or(address);
    if address_no_prefix.len() != hex_len {
        return Err(BridgeError::InvalidRequest(format!(
            "Invalid {} address format: expected {} hex chars, got {} chars. Address: '{}'",
            label,
            hex_len,
            address_no_prefix.len(),
            address
        )));
    }
    if !address_no_prefix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(BridgeError::InvalidRequest(format!(
            "Invalid {} address format: contains non-hexadecimal characters. Address: '{}'",
            label, address
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RefusingAttestor;

    #[async_trait]
    impl Attestor for RefusingAttestor {
        fn signer_id(&self) -> String {
            "refuser".to_string()
        }

        async fn attest(&self, _message: &[u8]) -> Result<ValidatorSignature> {
            Err(BridgeError::ProofGenerationFailed("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_collector_tolerates_minority_failure() {
        let attestors: Vec<Arc<dyn Attestor>> = vec![
            Arc::new(LocalAttestor::new(ValidatorSigner::from_bytes(&[1u8; 32]))),
            Arc::new(RefusingAttestor),
            Arc::new(LocalAttestor::new(ValidatorSigner::from_bytes(&[2u8; 32]))),
        ];
        let collector = SignatureCollector::new(attestors, 2);
        assert_eq!(collector.collect(b"msg").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_collector_fails_short_of_quorum() {
        let attestors: Vec<Arc<dyn Attestor>> = vec![
            Arc::new(LocalAttestor::new(ValidatorSigner::from_bytes(&[1u8; 32]))),
            Arc::new(RefusingAttestor),
        ];
        let collector = SignatureCollector::new(attestors, 2);
        assert!(matches!(
            collector.collect(b"msg").await,
            Err(BridgeError::ProofGenerationFailed(_))
        ));
    }

    #[test]
    fn test_normalize_pads_short_addresses() {
        assert_eq!(normalize_hex_address("0x1", 4), "0x0001");
        assert_eq!(normalize_hex_address("abcd", 4), "0xabcd");
    }
}
