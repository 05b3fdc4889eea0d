//! Cross-Chain Bridge Library
//!
//! This crate provides the core of a cross-chain asset bridge: escrow
//! lock/release/refund on the source chain, proof generation and validation
//! (merkle inclusion, validator quorum, freshness), chain adapters, and the
//! transaction admission layer that prices, orders and executes bridge
//! transactions.

pub mod asset;
pub mod bridge;
pub mod chains;
pub mod config;
pub mod crypto;
pub mod error;
pub mod escrow;
pub mod mempool;
pub mod proof;
pub mod storage;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use asset::{Asset, AssetKind};
pub use bridge::{
    AttemptState, BatchOutcome, BridgeEvent, BridgeObserver, BridgeRequest, BridgeResult,
    BridgeStatus, CancelToken, CrossChainBridge, SwapQuote, TracingObserver,
};
pub use chains::{AdapterRegistry, BridgeAdapter, ProofRequest, TxReceipt};
pub use config::{BridgeOptions, ChainConfig, Config};
pub use crypto::{HashScheme, ValidatorSignature, ValidatorSigner};
pub use error::{BridgeError, ErrorKind, Result};
pub use escrow::{EscrowRecord, EscrowService, EscrowStatus};
pub use mempool::{Transaction, TransactionManager, TransactionPayload};
pub use proof::{BridgeProof, MerklePath};
pub use storage::BridgeResultStore;
pub use types::{ChainId, ChainType, NetworkType, TokenStandard};
pub use validator::{ProofValidator, Quorum, ValidationOutcome};
