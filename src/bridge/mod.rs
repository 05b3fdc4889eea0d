//! Cross-Chain Bridge Module
//!
//! This module orchestrates one asset transfer across chains: lock on the
//! source chain, prove the lock, validate the proof, mint/unlock on the
//! target chain, and release the escrow.
//!
//! ## Attempt states
//!
//! ```text
//! Requested -> Locked -> ProofGenerated -> Validated -> Released
//!                  |            |
//!                  |            +-> ValidationFailed -> Refunded
//!                  +-> (proof failure / timeout / cancel) -> Refunded
//! Requested -> LockFailed
//! ```
//!
//! Failures before validation unwind the escrow with a refund. Once the
//! proof is validated the escrow is never refunded: submission failures keep
//! the result `Pending` and are retried with backoff, and submissions are
//! idempotent per escrow id.
//!
//! Every path that can settle an escrow (the attempt itself after locking,
//! `relay_proof` and `retry_pending`) runs inside the exclusive section for
//! that escrow id, so an escrow is released or refunded by exactly one caller.

pub mod cancel;
pub mod events;
mod locks;
pub mod request;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::asset::Asset;
use crate::chains::{AdapterRegistry, BridgeAdapter, ProofRequest, TxReceipt};
use crate::config::BridgeOptions;
use crate::error::{BridgeError, Result};
use crate::escrow::{EscrowService, EscrowStatus};
use crate::proof::BridgeProof;
use crate::storage::BridgeResultStore;
use crate::types::{unix_now, Address, ChainId, EscrowId};
use crate::validator::{ProofValidator, ValidationOutcome};

pub use cancel::CancelToken;
pub use events::{BridgeEvent, BridgeObserver, TracingObserver};
pub use request::{BridgeRequest, SwapQuote};

use locks::KeyedLocks;

// ============================================================================
// RESULT STRUCTURES
// ============================================================================

/// Position of a bridge attempt in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptState {
    Requested,
    Locked,
    ProofGenerated,
    Validated,
    Released,
    LockFailed,
    ValidationFailed,
    Refunded,
}

/// Externally visible status of a bridge result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeStatus {
    /// In flight, or validated with submission still outstanding
    Pending,
    /// Released on the target chain
    Confirmed,
    /// Ended without release
    Failed,
}

impl BridgeStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, BridgeStatus::Pending)
    }
}

/// Record of one bridge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeResult {
    pub escrow_id: EscrowId,
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    pub sender: Address,
    pub recipient: Address,
    pub proof: Option<BridgeProof>,
    pub status: BridgeStatus,
    pub state: AttemptState,
    pub receipt: Option<TxReceipt>,
    /// Last failure, kept while retrying and on terminal failure
    pub failure: Option<String>,
    pub submit_attempts: u32,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Outcome of a batch, keyed by input index and in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub successful: Vec<(usize, BridgeResult)>,
    pub failed: Vec<(usize, BridgeError)>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// CROSS-CHAIN BRIDGE
// ============================================================================

pub struct CrossChainBridge {
    options: BridgeOptions,
    escrow: Arc<EscrowService>,
    registry: AdapterRegistry,
    validator: Arc<ProofValidator>,
    results: Arc<BridgeResultStore>,
    observers: Vec<Arc<dyn BridgeObserver>>,
    /// Exclusive section for nonce assignment, per (source chain, sender)
    sender_locks: KeyedLocks<(ChainId, Address)>,
    /// Exclusive section for settling, per escrow id
    settlements: KeyedLocks<EscrowId>,
}

impl CrossChainBridge {
    pub fn new(
        options: BridgeOptions,
        escrow: Arc<EscrowService>,
        registry: AdapterRegistry,
        validator: Arc<ProofValidator>,
        results: Arc<BridgeResultStore>,
    ) -> Self {
        Self {
            options,
            escrow,
            registry,
            validator,
            results,
            observers: Vec::new(),
            sender_locks: KeyedLocks::new(),
            settlements: KeyedLocks::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BridgeObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn escrow(&self) -> &Arc<EscrowService> {
        &self.escrow
    }

    pub fn results(&self) -> &Arc<BridgeResultStore> {
        &self.results
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    // ------------------------------------------------------------------------
    // PUBLIC OPERATIONS
    // ------------------------------------------------------------------------

    /// Bridges one asset. See [`bridge_asset_with_cancel`](Self::bridge_asset_with_cancel).
    pub async fn bridge_asset(&self, request: BridgeRequest) -> Result<BridgeResult> {
        self.bridge_asset_with_cancel(request, &CancelToken::new()).await
    }

    /// Bridges one asset, honouring `cancel` until the proof is validated.
    ///
    /// # Returns
    ///
    /// * `Ok(BridgeResult)` - `Confirmed`, or `Pending` when submission exhausted its attempts
    /// * `Err(BridgeError)` - Validation or lock failure (nothing locked), `AttemptFailed`
    ///   after a refund, or `ReconciliationRequired` when the refund itself failed
    /// * `Err(BridgeError::SettlementInProgress)` - The proof was claimed by another
    ///   caller; the escrow stays locked and nothing is refunded
    pub async fn bridge_asset_with_cancel(
        &self,
        request: BridgeRequest,
        cancel: &CancelToken,
    ) -> Result<BridgeResult> {
        let (source, target, asset) = match self.check_request(&request) {
            Ok(checked) => checked,
            Err(e) => {
                self.emit_failed(None, &e);
                return Err(e);
            }
        };

        // Nonce read, lock, and proof generation share one per-sender section
        let sender_guard = self
            .sender_locks
            .lock((request.source_chain, request.sender.clone()))
            .await;

        if cancel.is_cancelled() {
            info!("Bridge request from {} cancelled before lock", request.sender);
            self.emit_failed(None, &BridgeError::Cancelled);
            return Err(BridgeError::Cancelled);
        }

        let nonce = match source.next_nonce(&request.sender).await {
            Ok(nonce) => nonce,
            Err(e) => {
                self.emit_failed(None, &e);
                return Err(e);
            }
        };
        let escrow_id = match self
            .escrow
            .lock(&asset, asset.amount(), &request.sender, request.target_chain)
            .await
        {
            Ok(escrow_id) => escrow_id,
            Err(e) => {
                warn!("Lock failed for {}: {}", request.sender, e);
                self.emit_failed(None, &e);
                return Err(e);
            }
        };

        let _settlement = self.settlements.lock(escrow_id.clone()).await;
        self.open_attempt(&escrow_id, &request).await?;

        // Locked -> ProofGenerated
        let proof_request = ProofRequest {
            escrow_id: escrow_id.clone(),
            source_chain: request.source_chain,
            target_chain: request.target_chain,
            sender: request.sender.clone(),
            recipient: request.recipient.clone(),
            asset: asset.clone(),
            nonce,
        };
        let generated = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BridgeError::Cancelled),
            outcome = tokio::time::timeout(
                self.options.proof_timeout(),
                source.generate_proof(&proof_request),
            ) => match outcome {
                Ok(result) => result,
                Err(_) => Err(BridgeError::ProofGenerationTimeout {
                    timeout_ms: self.options.proof_timeout_ms,
                }),
            },
        };
        drop(sender_guard);

        let proof = match generated {
            Ok(proof) => proof,
            Err(e) => return Err(self.unwind(&escrow_id, AttemptState::Locked, e).await),
        };
        self.advance(&escrow_id, AttemptState::ProofGenerated, Some(proof.clone()))
            .await?;

        // ProofGenerated -> Validated
        let validated = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BridgeError::Cancelled),
            outcome = self.validator.validate(&proof) => outcome.into_result(),
        };
        let validated = match validated {
            Ok(()) => self.results.claim_proof(&proof).await,
            Err(e) => Err(e),
        };
        match validated {
            Ok(()) => {}
            // The proof was consumed by someone else; refunding now could pay out twice
            Err(e @ BridgeError::ReplayDetected { .. }) => {
                return Err(self.settled_elsewhere(&escrow_id, e).await)
            }
            Err(e) => {
                let state = if e == BridgeError::Cancelled {
                    AttemptState::ProofGenerated
                } else {
                    AttemptState::ValidationFailed
                };
                return Err(self.unwind(&escrow_id, state, e).await);
            }
        }
        self.advance(&escrow_id, AttemptState::Validated, None).await?;

        // Validated -> Released; cancellation no longer applies
        self.submit_and_release(&proof, target.as_ref()).await
    }

    /// Bridges every request concurrently, at most `batch_size` at a time.
    ///
    /// One failure never aborts the others; outcomes are keyed by input index.
    pub async fn batch_bridge_assets(&self, requests: Vec<BridgeRequest>) -> BatchOutcome {
        let total = requests.len();
        let outcomes: Vec<(usize, Result<BridgeResult>)> = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| async move { (index, self.bridge_asset(request).await) })
            .buffered(self.options.batch_size.max(1))
            .collect()
            .await;

        let mut batch = BatchOutcome::default();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(result) => batch.successful.push((index, result)),
                Err(e) => batch.failed.push((index, e)),
            }
        }
        info!(
            "Batch finished: {} of {} succeeded, {} failed",
            batch.successful.len(),
            total,
            batch.failed.len()
        );
        batch
    }

    /// Settles a proof delivered from outside: validate, claim, submit, release.
    ///
    /// A proof that fails validation is rejected without touching the escrow.
    /// Waits while another caller is settling the same escrow.
    pub async fn relay_proof(&self, proof: BridgeProof) -> Result<BridgeResult> {
        let _settlement = self.settlements.lock(proof.escrow_id.clone()).await;
        if self.results.is_claimed(&proof).await {
            return Err(BridgeError::ReplayDetected {
                escrow_id: proof.escrow_id.clone(),
                nonce: proof.nonce,
            });
        }

        let record = self
            .escrow
            .get(&proof.escrow_id)
            .await
            .ok_or_else(|| BridgeError::EscrowNotFound(proof.escrow_id.clone()))?;
        if record.status != EscrowStatus::Locked {
            return Err(BridgeError::EscrowAlreadyFinal {
                escrow_id: record.escrow_id,
                status: record.status,
            });
        }
        if record.amount != proof.amount
            || record.source_chain != proof.source_chain
            || record.target_chain != proof.target_chain
            || record.owner != proof.sender
        {
            return Err(BridgeError::InvalidMerkleProof(format!(
                "proof does not describe escrow {}",
                proof.escrow_id
            )));
        }

        let target = self.registry.get(proof.target_chain)?;
        self.validator.validate(&proof).await.into_result()?;
        self.results.claim_proof(&proof).await?;

        let now = unix_now();
        let relayed = BridgeResult {
            escrow_id: proof.escrow_id.clone(),
            source_chain: proof.source_chain,
            target_chain: proof.target_chain,
            sender: proof.sender.clone(),
            recipient: proof.recipient.clone(),
            proof: Some(proof.clone()),
            status: BridgeStatus::Pending,
            state: AttemptState::Validated,
            receipt: None,
            failure: None,
            submit_attempts: 0,
            created_at: now,
            updated_at: now,
        };
        match self.results.get(&proof.escrow_id).await {
            Some(_) => {
                self.advance(&proof.escrow_id, AttemptState::Validated, Some(proof.clone()))
                    .await?;
            }
            None => self.results.insert(relayed).await?,
        }
        info!("Relayed proof for escrow {} accepted", proof.escrow_id);
        self.submit_and_release(&proof, target.as_ref()).await
    }

    /// Re-drives a validated result whose submission ran out of attempts.
    pub async fn retry_pending(&self, escrow_id: &str) -> Result<BridgeResult> {
        let _settlement = self.settlements.lock(escrow_id.to_string()).await;
        let result = self
            .results
            .get(escrow_id)
            .await
            .ok_or_else(|| BridgeError::EscrowNotFound(escrow_id.to_string()))?;
        if result.status.is_final() {
            return Err(BridgeError::ResultAlreadyFinal(escrow_id.to_string()));
        }
        let proof = match (result.state, result.proof) {
            (AttemptState::Validated, Some(proof)) => proof,
            (state, _) => {
                return Err(BridgeError::InvalidRequest(format!(
                    "escrow {} is in {:?}; only validated results can be retried",
                    escrow_id, state
                )))
            }
        };
        let target = self.registry.get(proof.target_chain)?;
        info!("Retrying submission for escrow {}", escrow_id);
        self.submit_and_release(&proof, target.as_ref()).await
    }

    /// Re-runs proof validation for the stored proof of `escrow_id`.
    pub async fn verify_bridge_transaction(&self, escrow_id: &str) -> Result<ValidationOutcome> {
        let result = self
            .results
            .get(escrow_id)
            .await
            .ok_or_else(|| BridgeError::EscrowNotFound(escrow_id.to_string()))?;
        let proof = result.proof.ok_or_else(|| {
            BridgeError::InvalidRequest(format!("escrow {} has no proof", escrow_id))
        })?;
        Ok(self.validator.validate(&proof).await)
    }

    // ------------------------------------------------------------------------
    // INTERNALS
    // ------------------------------------------------------------------------

    /// Checks a request without side effects. Returns the source adapter, the
    /// target adapter, and the asset to lock.
    fn check_request(
        &self,
        request: &BridgeRequest,
    ) -> Result<(Arc<dyn BridgeAdapter>, Arc<dyn BridgeAdapter>, Asset)> {
        if request.source_chain == request.target_chain {
            return Err(BridgeError::InvalidRequest(format!(
                "source and target are both {}",
                request.source_chain
            )));
        }
        let source = self.registry.get(request.source_chain)?;
        let target = self.registry.get(request.target_chain)?;

        if request.asset.chain() != request.source_chain {
            return Err(BridgeError::InvalidRequest(format!(
                "asset originates on {}, not on source {}",
                request.asset.chain(),
                request.source_chain
            )));
        }
        source.validate_address(&request.sender)?;
        target.validate_address(&request.recipient)?;

        let asset = request.resolved_asset(unix_now())?;
        asset.validate_for(source.chain_type())?;
        target.wrap_asset(&asset).validate_for(target.chain_type())?;
        Ok((source, target, asset))
    }

    /// Records the freshly locked attempt as `Pending`. If the result cannot
    /// be stored the escrow is unwound, since nothing else would track it.
    async fn open_attempt(&self, escrow_id: &str, request: &BridgeRequest) -> Result<()> {
        let now = unix_now();
        let opened = self
            .results
            .insert(BridgeResult {
                escrow_id: escrow_id.to_string(),
                source_chain: request.source_chain,
                target_chain: request.target_chain,
                sender: request.sender.clone(),
                recipient: request.recipient.clone(),
                proof: None,
                status: BridgeStatus::Pending,
                state: AttemptState::Locked,
                receipt: None,
                failure: None,
                submit_attempts: 0,
                created_at: now,
                updated_at: now,
            })
            .await;
        if let Err(e) = opened {
            error!("Could not record attempt for escrow {}: {}", escrow_id, e);
            return Err(self.unwind(escrow_id, AttemptState::Locked, e).await);
        }
        self.emit(BridgeEvent::Initiated {
            escrow_id: escrow_id.to_string(),
            source_chain: request.source_chain,
            target_chain: request.target_chain,
            timestamp: now,
        });
        Ok(())
    }

    async fn advance(
        &self,
        escrow_id: &str,
        state: AttemptState,
        proof: Option<BridgeProof>,
    ) -> Result<BridgeResult> {
        info!("Escrow {} -> {:?}", escrow_id, state);
        self.results
            .update(escrow_id, |result| {
                result.state = state;
                if proof.is_some() {
                    result.proof = proof;
                }
            })
            .await
    }

    /// Submits to the target with bounded retries, then releases the escrow.
    async fn submit_and_release(
        &self,
        proof: &BridgeProof,
        target: &dyn BridgeAdapter,
    ) -> Result<BridgeResult> {
        let attempts = self.options.retry_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            self.results
                .update(&proof.escrow_id, |result| result.submit_attempts += 1)
                .await?;

            let submitted = match tokio::time::timeout(
                self.options.submission_timeout(),
                target.submit(proof),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(BridgeError::SubmissionTimeout {
                    timeout_ms: self.options.submission_timeout_ms,
                }),
            };

            match submitted {
                Ok(receipt) => return self.complete(proof, receipt).await,
                Err(e) => {
                    warn!(
                        "Submission {}/{} for escrow {} failed: {}",
                        attempt, attempts, proof.escrow_id, e
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.options.backoff(attempt)).await;
                    }
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "submission not attempted".to_string());
        warn!(
            "Escrow {} stays pending after {} submission attempts",
            proof.escrow_id, attempts
        );
        self.results
            .update(&proof.escrow_id, |result| result.failure = Some(reason))
            .await
    }

    async fn complete(&self, proof: &BridgeProof, receipt: TxReceipt) -> Result<BridgeResult> {
        match self
            .escrow
            .release(&proof.escrow_id, &proof.recipient, &receipt.minted)
            .await
        {
            Ok(_) => {}
            Err(BridgeError::EscrowAlreadyFinal {
                status: EscrowStatus::Released,
                ..
            }) => info!("Escrow {} was already released", proof.escrow_id),
            Err(e) => {
                error!(
                    "Minted on {} but could not release escrow {}: {}",
                    proof.target_chain, proof.escrow_id, e
                );
                let note = format!("minted in tx {} but release failed: {}", receipt.tx_hash, e);
                if let Err(flag_error) = self.escrow.flag_for_reconciliation(&proof.escrow_id, note).await {
                    error!("Could not flag escrow {}: {}", proof.escrow_id, flag_error);
                }
                return Err(BridgeError::AttemptFailed {
                    escrow_id: proof.escrow_id.clone(),
                    state: AttemptState::Validated,
                    source: Box::new(e),
                });
            }
        }

        let result = self
            .results
            .update(&proof.escrow_id, |result| {
                result.state = AttemptState::Released;
                result.status = BridgeStatus::Confirmed;
                result.receipt = Some(receipt);
                result.failure = None;
            })
            .await?;
        info!(
            "Escrow {} released: {} -> {} for {}",
            proof.escrow_id, proof.source_chain, proof.target_chain, proof.recipient
        );
        self.emit(BridgeEvent::Completed {
            escrow_id: proof.escrow_id.clone(),
            proof: Box::new(proof.clone()),
            timestamp: unix_now(),
        });
        Ok(result)
    }

    /// Refunds the escrow after a pre-validation failure in `state`.
    ///
    /// Returns the error to surface: `AttemptFailed` after a successful
    /// refund, `ReconciliationRequired` when the refund failed.
    async fn unwind(&self, escrow_id: &str, state: AttemptState, cause: BridgeError) -> BridgeError {
        warn!("Unwinding escrow {} from {:?}: {}", escrow_id, state, cause);
        let failure = match self.escrow.refund(escrow_id).await {
            Ok(_) => {
                self.finish_failed(escrow_id, state, AttemptState::Refunded, &cause).await;
                BridgeError::AttemptFailed {
                    escrow_id: escrow_id.to_string(),
                    state,
                    source: Box::new(cause),
                }
            }
            Err(refund_error) => {
                error!("Refund of escrow {} failed: {}", escrow_id, refund_error);
                let note = format!("refund after {:?} failed: {}; cause: {}", state, refund_error, cause);
                if let Err(e) = self.escrow.flag_for_reconciliation(escrow_id, note).await {
                    error!("Could not flag escrow {}: {}", escrow_id, e);
                }
                self.finish_failed(escrow_id, state, state, &refund_error).await;
                BridgeError::ReconciliationRequired {
                    escrow_id: escrow_id.to_string(),
                    cause: Box::new(cause),
                    refund_error: Box::new(refund_error),
                }
            }
        };
        self.emit_failed(Some(escrow_id.to_string()), &failure);
        failure
    }

    /// Stops an attempt whose proof was already claimed elsewhere. The escrow
    /// stays locked and the result stays `Pending` for whoever holds the claim.
    async fn settled_elsewhere(&self, escrow_id: &str, cause: BridgeError) -> BridgeError {
        warn!("Escrow {} is not refunded: {}", escrow_id, cause);
        let failure = format!("{:?}: {}", AttemptState::ProofGenerated, cause);
        if let Err(e) = self
            .results
            .update(escrow_id, |result| result.failure = Some(failure))
            .await
        {
            warn!("Could not record failure of escrow {}: {}", escrow_id, e);
        }
        let error = BridgeError::SettlementInProgress(escrow_id.to_string());
        self.emit_failed(Some(escrow_id.to_string()), &error);
        error
    }

    async fn finish_failed(
        &self,
        escrow_id: &str,
        failed_in: AttemptState,
        final_state: AttemptState,
        error: &BridgeError,
    ) {
        let failure = format!("{:?}: {}", failed_in, error);
        if let Err(e) = self
            .results
            .update(escrow_id, |result| {
                result.state = final_state;
                result.status = BridgeStatus::Failed;
                result.failure = Some(failure);
            })
            .await
        {
            error!("Could not record failure of escrow {}: {}", escrow_id, e);
        }
    }

    fn emit(&self, event: BridgeEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    fn emit_failed(&self, escrow_id: Option<EscrowId>, error: &BridgeError) {
        self.emit(BridgeEvent::Failed {
            escrow_id,
            error: error.to_string(),
            timestamp: unix_now(),
        });
    }
}
