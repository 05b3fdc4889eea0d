//! Bridge requests and swap quotes

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::error::{BridgeError, Result};
use crate::types::{amount_serde, Address, ChainId};

/// Price quote from an external swap provider.
///
/// The bridge treats the quote as opaque input: when a request carries one,
/// its `buy_amount` is the amount bridged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Quote source (e.g., "0x")
    pub provider: String,
    pub sell_token: String,
    /// Must match the identifier of the bridged asset
    pub buy_token: String,
    #[serde(with = "amount_serde")]
    pub sell_amount: BigUint,
    #[serde(with = "amount_serde")]
    pub buy_amount: BigUint,
    /// Unix timestamp after which the quote is void
    pub expires_at: u64,
}

/// One asset transfer from `sender` on the source chain to `recipient` on the target chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    pub sender: Address,
    pub recipient: Address,
    pub asset: Asset,
    #[serde(default)]
    pub swap: Option<SwapQuote>,
}

impl BridgeRequest {
    pub fn new(
        source_chain: ChainId,
        target_chain: ChainId,
        sender: impl Into<Address>,
        recipient: impl Into<Address>,
        asset: Asset,
    ) -> Self {
        Self {
            source_chain,
            target_chain,
            sender: sender.into(),
            recipient: recipient.into(),
            asset,
            swap: None,
        }
    }

    pub fn with_swap(mut self, quote: SwapQuote) -> Self {
        self.swap = Some(quote);
        self
    }

    /// The asset to lock, with the amount taken from the swap quote if present.
    pub fn resolved_asset(&self, now: u64) -> Result<Asset> {
        let Some(quote) = &self.swap else {
            return Ok(self.asset.clone());
        };
        if quote.buy_token != self.asset.identifier() {
            return Err(BridgeError::InvalidRequest(format!(
                "swap quote buys {} but the request bridges {}",
                quote.buy_token,
                self.asset.identifier()
            )));
        }
        if quote.expires_at <= now {
            return Err(BridgeError::InvalidRequest(format!(
                "swap quote from {} expired at {}",
                quote.provider, quote.expires_at
            )));
        }
        Ok(self.asset.with_amount(quote.buy_amount.clone()))
    }
}
