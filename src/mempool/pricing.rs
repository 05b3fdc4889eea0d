//! Gas pricing
//!
//! Effective price = base price × demand multiplier + priority fee, with the
//! multiplier expressed in basis points (10_000 = 1x).

use async_trait::async_trait;

use crate::config::MempoolConfig;

pub const BPS_DENOMINATOR: u128 = 10_000;

/// Source of the base price and the demand multiplier.
#[async_trait]
pub trait GasPriceOracle: Send + Sync {
    async fn base_price(&self) -> u128;

    /// Demand multiplier in basis points for a pool holding `occupancy` of `capacity`.
    async fn demand_multiplier_bps(&self, occupancy: usize, capacity: usize) -> u32;
}

pub fn effective_price(base_price: u128, multiplier_bps: u32, priority_fee: u128) -> u128 {
    base_price
        .saturating_mul(multiplier_bps as u128)
        .checked_div(BPS_DENOMINATOR)
        .unwrap_or(0)
        .saturating_add(priority_fee)
}

/// Fixed base price and multiplier.
#[derive(Debug, Clone, Copy)]
pub struct StaticGasOracle {
    pub base_price: u128,
    pub multiplier_bps: u32,
}

impl StaticGasOracle {
    pub fn new(base_price: u128, multiplier_bps: u32) -> Self {
        Self {
            base_price,
            multiplier_bps,
        }
    }
}

#[async_trait]
impl GasPriceOracle for StaticGasOracle {
    async fn base_price(&self) -> u128 {
        self.base_price
    }

    async fn demand_multiplier_bps(&self, _occupancy: usize, _capacity: usize) -> u32 {
        self.multiplier_bps
    }
}

/// Multiplier rising linearly from `min_bps` at an empty pool to `max_bps` at a full one.
#[derive(Debug, Clone, Copy)]
pub struct UtilizationGasOracle {
    pub base_price: u128,
    pub min_bps: u32,
    pub max_bps: u32,
}

impl UtilizationGasOracle {
    pub fn from_config(config: &MempoolConfig) -> Self {
        Self {
            base_price: config.base_price as u128,
            min_bps: config.demand_multiplier_bps,
            max_bps: config.max_demand_multiplier_bps.max(config.demand_multiplier_bps),
        }
    }
}

#[async_trait]
impl GasPriceOracle for UtilizationGasOracle {
    async fn base_price(&self) -> u128 {
        self.base_price
    }

    async fn demand_multiplier_bps(&self, occupancy: usize, capacity: usize) -> u32 {
        if capacity == 0 {
            return self.max_bps;
        }
        let occupancy = occupancy.min(capacity) as u64;
        let span = self.max_bps.saturating_sub(self.min_bps) as u64;
        self.min_bps + (span * occupancy / capacity as u64) as u32
    }
}
