//! Transactions admitted by the transaction manager

use serde::{Deserialize, Serialize};
use sha3::{Digest as _, Keccak256};
use std::cmp::Reverse;

use crate::asset::Asset;
use crate::bridge::BridgeRequest;
use crate::error::{BridgeError, Result};
use crate::types::Address;

/// What a transaction does once executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPayload {
    /// Starts a cross-chain transfer
    Bridge(BridgeRequest),
    /// Moves an asset between two accounts on one chain
    Transfer { asset: Asset, recipient: Address },
}

/// A signed-off user transaction waiting for admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// `0x`-prefixed Keccak-256 of the BCS-encoded content
    pub hash: String,
    pub sender: Address,
    pub payload: TransactionPayload,
    /// Tip paid on top of the base price
    pub max_priority_fee: u128,
    /// Declared sender nonce
    pub nonce: u64,
}

/// Hashed portion of a transaction.
#[derive(Serialize)]
struct TransactionContent<'a> {
    sender: &'a str,
    payload: &'a TransactionPayload,
    max_priority_fee: u128,
    nonce: u64,
}

impl Transaction {
    /// Builds a transaction and derives its hash from the content.
    pub fn new(
        sender: impl Into<Address>,
        payload: TransactionPayload,
        max_priority_fee: u128,
        nonce: u64,
    ) -> Result<Self> {
        let mut tx = Self {
            hash: String::new(),
            sender: sender.into(),
            payload,
            max_priority_fee,
            nonce,
        };
        tx.hash = tx.compute_hash()?;
        Ok(tx)
    }

    /// Content hash: Keccak-256 over the BCS encoding of sender, payload, fee and nonce.
    pub fn compute_hash(&self) -> Result<String> {
        let content = TransactionContent {
            sender: &self.sender,
            payload: &self.payload,
            max_priority_fee: self.max_priority_fee,
            nonce: self.nonce,
        };
        let bytes = bcs::to_bytes(&content)
            .map_err(|e| BridgeError::InvalidTransaction(format!("Failed to encode transaction: {}", e)))?;
        Ok(format!("0x{}", hex::encode(Keccak256::digest(&bytes))))
    }
}

/// Ordering key: higher price first, then earlier admission.
pub type PriorityKey = (Reverse<u128>, u64);

/// A transaction with its admission-time price and sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrioritizedTransaction {
    pub tx: Transaction,
    pub effective_price: u128,
    /// Admission order, unique per manager
    pub sequence: u64,
    pub admitted_at: u64,
}

impl PrioritizedTransaction {
    pub fn priority_key(&self) -> PriorityKey {
        (Reverse(self.effective_price), self.sequence)
    }

    pub fn hash(&self) -> &str {
        &self.tx.hash
    }
}
