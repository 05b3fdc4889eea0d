//! Escrow Service Module
//!
//! This module holds value while a bridge transfer is in flight. Locking
//! debits the owner's available balance into an escrow record; the record is
//! then settled exactly once, either released to the recipient on the target
//! chain or refunded to the owner.
//!
//! Balances are kept per owner behind a `tokio::sync::Mutex`, so concurrent
//! locks for the same owner serialize and can never overdraw, while different
//! owners proceed in parallel.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::asset::Asset;
use crate::error::{BridgeError, Result};
use crate::types::{amount_serde, unix_now, Address, ChainId, EscrowId};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Lifecycle of an escrow. Transitions only go `Locked -> Released` or
/// `Locked -> Refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Value is held by the bridge
    Locked,
    /// Value was delivered on the target chain
    Released,
    /// Value was returned to the owner
    Refunded,
}

impl EscrowStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, EscrowStatus::Locked)
    }
}

/// Escrow record created by a successful lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// UUID v4 assigned at lock time
    pub escrow_id: EscrowId,
    /// Locked asset (carrying the locked amount)
    pub asset: Asset,
    #[serde(with = "amount_serde")]
    pub amount: BigUint,
    pub owner: Address,
    pub status: EscrowStatus,
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    /// Recipient credited on release
    pub recipient: Option<Address>,
    /// Unix timestamp of the lock
    pub created_at: u64,
    /// Unix timestamp of the last status change
    pub updated_at: u64,
    /// Set when a compensating refund failed and the escrow needs manual follow-up
    pub reconciliation_note: Option<String>,
}

#[derive(Debug, Default)]
struct OwnerAccount {
    /// Asset key -> available amount
    balances: HashMap<String, BigUint>,
}

impl OwnerAccount {
    fn available(&self, asset_key: &str) -> BigUint {
        self.balances.get(asset_key).cloned().unwrap_or_default()
    }

    fn debit(&mut self, owner: &str, asset_key: &str, amount: &BigUint) -> Result<()> {
        let available = self.available(asset_key);
        if &available < amount {
            return Err(BridgeError::InsufficientBalance {
                owner: owner.to_string(),
                available,
                required: amount.clone(),
            });
        }
        self.balances.insert(asset_key.to_string(), available - amount);
        Ok(())
    }

    fn credit(&mut self, asset_key: &str, amount: &BigUint) -> BigUint {
        let balance = self.balances.entry(asset_key.to_string()).or_default();
        *balance += amount;
        balance.clone()
    }
}

// ============================================================================
// ESCROW SERVICE
// ============================================================================

pub struct EscrowService {
    /// Locks below this amount are rejected
    min_lock_amount: BigUint,
    /// Owner address -> account, each behind its own exclusive section
    accounts: RwLock<HashMap<Address, Arc<Mutex<OwnerAccount>>>>,
    /// Escrow id -> record
    records: RwLock<HashMap<EscrowId, EscrowRecord>>,
}

impl EscrowService {
    pub fn new(min_lock_amount: BigUint) -> Self {
        Self {
            min_lock_amount,
            accounts: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
        }
    }

    async fn account(&self, owner: &str) -> Arc<Mutex<OwnerAccount>> {
        if let Some(account) = self.accounts.read().await.get(owner) {
            return account.clone();
        }
        let mut accounts = self.accounts.write().await;
        accounts.entry(owner.to_string()).or_default().clone()
    }

    /// Credits `asset` to the owner's available balance. Returns the new balance.
    pub async fn deposit(&self, owner: &str, asset: &Asset) -> Result<BigUint> {
        asset.validate_shape()?;
        let account = self.account(owner).await;
        let mut account = account.lock().await;
        Ok(account.credit(&asset.key(), asset.amount()))
    }

    /// Available (unlocked) balance of `owner` for an asset key.
    pub async fn balance_of(&self, owner: &str, asset_key: &str) -> BigUint {
        let account = self.account(owner).await;
        let account = account.lock().await;
        account.available(asset_key)
    }

    /// Locks `amount` of `asset` owned by `owner` for a transfer to `target_chain`.
    ///
    /// # Arguments
    ///
    /// * `asset` - Asset to lock; its own amount is ignored in favour of `amount`
    /// * `amount` - Amount to lock
    /// * `owner` - Address whose available balance is debited
    /// * `target_chain` - Chain the value is bridged to
    ///
    /// # Returns
    ///
    /// * `Ok(EscrowId)` - Escrow id of the new `Locked` record
    /// * `Err(BridgeError::InvalidAsset)` - Malformed asset, zero amount, or below minimum
    /// * `Err(BridgeError::InsufficientBalance)` - Owner cannot cover the amount
    pub async fn lock(
        &self,
        asset: &Asset,
        amount: &BigUint,
        owner: &str,
        target_chain: ChainId,
    ) -> Result<EscrowId> {
        asset.validate_shape()?;
        if amount.is_zero() {
            return Err(BridgeError::InvalidAsset(format!(
                "lock amount for {} must be non-zero",
                asset.key()
            )));
        }
        if amount < &self.min_lock_amount {
            return Err(BridgeError::InvalidAsset(format!(
                "lock amount {} is below minimum {}",
                amount, self.min_lock_amount
            )));
        }

        let asset_key = asset.key();
        let account = self.account(owner).await;
        let mut account = account.lock().await;
        account.debit(owner, &asset_key, amount)?;

        let now = unix_now();
        let record = EscrowRecord {
            escrow_id: uuid::Uuid::new_v4().to_string(),
            asset: asset.with_amount(amount.clone()),
            amount: amount.clone(),
            owner: owner.to_string(),
            status: EscrowStatus::Locked,
            source_chain: asset.chain(),
            target_chain,
            recipient: None,
            created_at: now,
            updated_at: now,
            reconciliation_note: None,
        };
        let escrow_id = record.escrow_id.clone();
        self.records.write().await.insert(escrow_id.clone(), record);
        drop(account);

        info!(
            "Locked {} {} from {} in escrow {} for {}",
            amount, asset_key, owner, escrow_id, target_chain
        );
        Ok(escrow_id)
    }

    /// Moves a record out of `Locked`. The records lock is released before the
    /// caller touches any account.
    async fn settle(
        &self,
        escrow_id: &str,
        status: EscrowStatus,
        recipient: Option<&str>,
    ) -> Result<EscrowRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(escrow_id)
            .ok_or_else(|| BridgeError::EscrowNotFound(escrow_id.to_string()))?;
        if record.status.is_final() {
            return Err(BridgeError::EscrowAlreadyFinal {
                escrow_id: escrow_id.to_string(),
                status: record.status,
            });
        }
        record.status = status;
        record.recipient = recipient.map(str::to_string);
        record.updated_at = unix_now();
        Ok(record.clone())
    }

    /// Releases a locked escrow to `recipient`, crediting the target-side asset.
    ///
    /// `minted` is the representation created on the target chain; the
    /// recipient is credited with the escrowed amount under its key.
    pub async fn release(&self, escrow_id: &str, recipient: &str, minted: &Asset) -> Result<EscrowRecord> {
        let record = self.settle(escrow_id, EscrowStatus::Released, Some(recipient)).await?;
        let account = self.account(recipient).await;
        account.lock().await.credit(&minted.key(), &record.amount);
        info!(
            "Released escrow {} to {} as {}",
            escrow_id,
            recipient,
            minted.key()
        );
        Ok(record)
    }

    /// Refunds a locked escrow to its owner.
    pub async fn refund(&self, escrow_id: &str) -> Result<EscrowRecord> {
        let record = self.settle(escrow_id, EscrowStatus::Refunded, None).await?;
        let account = self.account(&record.owner).await;
        account.lock().await.credit(&record.asset.key(), &record.amount);
        info!("Refunded escrow {} to {}", escrow_id, record.owner);
        Ok(record)
    }

    /// Moves `asset` from `owner` to `recipient` on the same chain.
    pub async fn transfer(&self, owner: &str, recipient: &str, asset: &Asset) -> Result<()> {
        asset.validate_shape()?;
        if asset.amount().is_zero() {
            return Err(BridgeError::InvalidAsset(format!(
                "transfer amount for {} must be non-zero",
                asset.key()
            )));
        }
        let asset_key = asset.key();
        {
            let account = self.account(owner).await;
            let mut account = account.lock().await;
            account.debit(owner, &asset_key, asset.amount())?;
        }
        let account = self.account(recipient).await;
        account.lock().await.credit(&asset_key, asset.amount());
        info!("Transferred {} {} from {} to {}", asset.amount(), asset_key, owner, recipient);
        Ok(())
    }

    pub async fn get(&self, escrow_id: &str) -> Option<EscrowRecord> {
        self.records.read().await.get(escrow_id).cloned()
    }

    /// Marks an escrow as needing manual reconciliation.
    pub async fn flag_for_reconciliation(&self, escrow_id: &str, note: impl Into<String>) -> Result<()> {
        let note = note.into();
        let mut records = self.records.write().await;
        let record = records
            .get_mut(escrow_id)
            .ok_or_else(|| BridgeError::EscrowNotFound(escrow_id.to_string()))?;
        warn!("Escrow {} flagged for reconciliation: {}", escrow_id, note);
        record.reconciliation_note = Some(note);
        record.updated_at = unix_now();
        Ok(())
    }

    pub async fn records_needing_reconciliation(&self) -> Vec<EscrowRecord> {
        self.records
            .read()
            .await
            .values()
            .filter(|record| record.reconciliation_note.is_some())
            .cloned()
            .collect()
    }
}
