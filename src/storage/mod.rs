//! Storage Module
//!
//! This module provides in-memory storage for bridge results, including the
//! replay guard that makes every accepted proof single-use.

pub mod bridge_results;

// Re-export for convenience
pub use bridge_results::BridgeResultStore;
