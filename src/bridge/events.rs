//! Bridge lifecycle events
//!
//! Observers are called synchronously, in registration order, from the task
//! driving the bridge attempt. They must not block.

use serde::Serialize;
use tracing::{error, info};

use crate::proof::BridgeProof;
use crate::types::{ChainId, EscrowId};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum BridgeEvent {
    /// Value was locked and the attempt is under way
    #[serde(rename = "bridgeInitiated")]
    Initiated {
        escrow_id: EscrowId,
        source_chain: ChainId,
        target_chain: ChainId,
        timestamp: u64,
    },
    /// Value was released on the target chain
    #[serde(rename = "bridgeCompleted")]
    Completed {
        escrow_id: EscrowId,
        proof: Box<BridgeProof>,
        timestamp: u64,
    },
    /// The attempt ended without release. `escrow_id` is `None` when the
    /// failure happened before anything was locked.
    #[serde(rename = "bridgeFailed")]
    Failed {
        escrow_id: Option<EscrowId>,
        error: String,
        timestamp: u64,
    },
}

impl BridgeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::Initiated { .. } => "bridgeInitiated",
            BridgeEvent::Completed { .. } => "bridgeCompleted",
            BridgeEvent::Failed { .. } => "bridgeFailed",
        }
    }
}

/// Receives bridge lifecycle events.
pub trait BridgeObserver: Send + Sync {
    fn on_event(&self, event: &BridgeEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl BridgeObserver for TracingObserver {
    fn on_event(&self, event: &BridgeEvent) {
        match event {
            BridgeEvent::Initiated {
                escrow_id,
                source_chain,
                target_chain,
                ..
            } => info!(
                "Bridge initiated: escrow {} from {} to {}",
                escrow_id, source_chain, target_chain
            ),
            BridgeEvent::Completed { escrow_id, proof, .. } => info!(
                "Bridge completed: escrow {} ({} -> {}, nonce {})",
                escrow_id, proof.source_chain, proof.target_chain, proof.nonce
            ),
            BridgeEvent::Failed { escrow_id, error, .. } => error!(
                "Bridge failed: escrow {}: {}",
                escrow_id.as_deref().unwrap_or("<none>"),
                error
            ),
        }
    }
}
