//! Error types

use num_bigint::BigUint;
use thiserror::Error;

use crate::bridge::AttemptState;
use crate::escrow::EscrowStatus;
use crate::types::{ChainId, EscrowId};

/// Coarse failure class, used to decide between rejecting, refunding, and retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any state mutation
    Validation,
    /// Owner cannot cover the requested amount
    InsufficientFunds,
    /// Merkle, signature, or timing failure; triggers a compensating refund
    Proof,
    /// Target-chain failure after validation; triggers bounded retry
    Submission,
    /// Mempool capacity exhausted
    Capacity,
    /// Unknown chain or invalid configuration
    Configuration,
    /// Caller cancelled the attempt
    Cancelled,
    /// A compensating refund failed and needs manual follow-up
    Reconciliation,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // --------------------------- VALIDATION ---------------------------
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    #[error("Invalid bridge request: {0}")]
    InvalidRequest(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Nonce too low: expected at least {expected}, got {actual}")]
    NonceTooLow { expected: u64, actual: u64 },

    #[error("Duplicate transaction {0}")]
    DuplicateTransaction(String),

    #[error("Bridge result for escrow {0} is already final")]
    ResultAlreadyFinal(EscrowId),

    // ---------------------------- BALANCES ----------------------------
    #[error("Insufficient balance for {owner}: available {available}, required {required}")]
    InsufficientBalance {
        owner: String,
        available: BigUint,
        required: BigUint,
    },

    // ----------------------------- ESCROW -----------------------------
    #[error("Escrow {0} not found")]
    EscrowNotFound(EscrowId),

    #[error("Escrow {escrow_id} is already final ({status:?})")]
    EscrowAlreadyFinal {
        escrow_id: EscrowId,
        status: EscrowStatus,
    },

    // ----------------------------- PROOFS -----------------------------
    #[error("Invalid merkle proof: {0}")]
    InvalidMerkleProof(String),

    #[error("Insufficient signatures: {valid} valid, {required} required")]
    InsufficientSignatures { valid: usize, required: usize },

    #[error("Unknown signer {0}")]
    UnknownSigner(String),

    #[error("Signer {0} appears more than once")]
    DuplicateSigner(String),

    #[error("Proof expired: age {age_secs}s exceeds {max_age_secs}s")]
    ProofExpired { age_secs: u64, max_age_secs: u64 },

    #[error("Proof not yet valid: {ahead_secs}s in the future, allowed skew {max_skew_secs}s")]
    ProofNotYetValid { ahead_secs: u64, max_skew_secs: u64 },

    #[error("Replay detected for escrow {escrow_id} with nonce {nonce}")]
    ReplayDetected { escrow_id: EscrowId, nonce: u64 },

    #[error("Proof generation failed: {0}")]
    ProofGenerationFailed(String),

    #[error("Proof generation timed out after {timeout_ms}ms")]
    ProofGenerationTimeout { timeout_ms: u64 },

    // ---------------------------- SUBMISSION --------------------------
    #[error("Submission to {chain} failed: {reason}")]
    SubmissionFailed { chain: ChainId, reason: String },

    #[error("Submission timed out after {timeout_ms}ms")]
    SubmissionTimeout { timeout_ms: u64 },

    // ----------------------------- CAPACITY ---------------------------
    #[error("Mempool full ({capacity} entries): offered price {offered} does not beat lowest {lowest}")]
    MempoolFull {
        capacity: usize,
        lowest: u128,
        offered: u128,
    },

    // -------------------------- CONFIGURATION -------------------------
    #[error("Unsupported chain {0}")]
    UnsupportedChain(ChainId),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // ----------------------------- LIFECYCLE --------------------------
    #[error("Bridge attempt cancelled")]
    Cancelled,

    #[error("Escrow {0} is being settled by another caller")]
    SettlementInProgress(EscrowId),

    #[error("Bridge attempt for escrow {escrow_id} ended in {state:?}: {source}")]
    AttemptFailed {
        escrow_id: EscrowId,
        state: AttemptState,
        #[source]
        source: Box<BridgeError>,
    },

    #[error("Escrow {escrow_id} needs reconciliation: {cause}; refund failed: {refund_error}")]
    ReconciliationRequired {
        escrow_id: EscrowId,
        cause: Box<BridgeError>,
        refund_error: Box<BridgeError>,
    },
}

impl BridgeError {
    /// Classifies the error. Wrapped attempt failures report their root cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidAsset(_)
            | BridgeError::InvalidRequest(_)
            | BridgeError::InvalidTransaction(_)
            | BridgeError::NonceTooLow { .. }
            | BridgeError::DuplicateTransaction(_)
            | BridgeError::ResultAlreadyFinal(_)
            | BridgeError::EscrowNotFound(_)
            | BridgeError::EscrowAlreadyFinal { .. }
            | BridgeError::SettlementInProgress(_) => ErrorKind::Validation,
            BridgeError::InsufficientBalance { .. } => ErrorKind::InsufficientFunds,
            BridgeError::InvalidMerkleProof(_)
            | BridgeError::InsufficientSignatures { .. }
            | BridgeError::UnknownSigner(_)
            | BridgeError::DuplicateSigner(_)
            | BridgeError::ProofExpired { .. }
            | BridgeError::ProofNotYetValid { .. }
            | BridgeError::ReplayDetected { .. }
            | BridgeError::ProofGenerationFailed(_)
            | BridgeError::ProofGenerationTimeout { .. } => ErrorKind::Proof,
            BridgeError::SubmissionFailed { .. } | BridgeError::SubmissionTimeout { .. } => {
                ErrorKind::Submission
            }
            BridgeError::MempoolFull { .. } => ErrorKind::Capacity,
            BridgeError::UnsupportedChain(_) | BridgeError::Configuration(_) => {
                ErrorKind::Configuration
            }
            BridgeError::Cancelled => ErrorKind::Cancelled,
            BridgeError::AttemptFailed { source, .. } => source.kind(),
            BridgeError::ReconciliationRequired { .. } => ErrorKind::Reconciliation,
        }
    }

    /// Whether repeating the same operation later can succeed.
    ///
    /// Submission failures are retried against the same valid proof; a full
    /// mempool may drain. Everything else is terminal for the given input.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Submission | ErrorKind::Capacity)
    }

    /// The innermost error, unwrapping `AttemptFailed` layers.
    pub fn root_cause(&self) -> &BridgeError {
        match self {
            BridgeError::AttemptFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
