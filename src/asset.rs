//! Asset Model
//!
//! Assets are a closed set of variants: native coins, fungible tokens, and
//! multi-tokens. Each variant carries its chain of origin, its on-chain
//! identifier, and an arbitrary-precision amount. Adding an asset kind means
//! adding a variant here.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BridgeError, Result};
use crate::types::{amount_serde, ChainId, ChainType, TokenStandard};

/// Discriminant of an [`Asset`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Native,
    FungibleToken,
    MultiToken,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Native => f.write_str("native"),
            AssetKind::FungibleToken => f.write_str("fungible-token"),
            AssetKind::MultiToken => f.write_str("multi-token"),
        }
    }
}

/// A quantity of value on a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
    /// Chain-native coin (ETH, BTC, SOL)
    Native {
        chain: ChainId,
        denomination: String,
        #[serde(with = "amount_serde")]
        amount: BigUint,
    },
    /// Fungible token (ERC-20, SPL, Move fungible asset)
    FungibleToken {
        chain: ChainId,
        contract: String,
        #[serde(with = "amount_serde")]
        amount: BigUint,
    },
    /// Multi-token (ERC-1155 style: contract + token id)
    MultiToken {
        chain: ChainId,
        contract: String,
        token_id: String,
        #[serde(with = "amount_serde")]
        amount: BigUint,
    },
}

impl Asset {
    pub fn native(chain: ChainId, denomination: impl Into<String>, amount: impl Into<BigUint>) -> Self {
        Asset::Native {
            chain,
            denomination: denomination.into(),
            amount: amount.into(),
        }
    }

    pub fn fungible(chain: ChainId, contract: impl Into<String>, amount: impl Into<BigUint>) -> Self {
        Asset::FungibleToken {
            chain,
            contract: contract.into(),
            amount: amount.into(),
        }
    }

    pub fn multi_token(
        chain: ChainId,
        contract: impl Into<String>,
        token_id: impl Into<String>,
        amount: impl Into<BigUint>,
    ) -> Self {
        Asset::MultiToken {
            chain,
            contract: contract.into(),
            token_id: token_id.into(),
            amount: amount.into(),
        }
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Native { .. } => AssetKind::Native,
            Asset::FungibleToken { .. } => AssetKind::FungibleToken,
            Asset::MultiToken { .. } => AssetKind::MultiToken,
        }
    }

    /// Chain of origin.
    pub fn chain(&self) -> ChainId {
        match self {
            Asset::Native { chain, .. }
            | Asset::FungibleToken { chain, .. }
            | Asset::MultiToken { chain, .. } => *chain,
        }
    }

    /// Denomination, contract, or mint address.
    pub fn identifier(&self) -> &str {
        match self {
            Asset::Native { denomination, .. } => denomination,
            Asset::FungibleToken { contract, .. } | Asset::MultiToken { contract, .. } => contract,
        }
    }

    /// Token id within a multi-token contract.
    pub fn sub_id(&self) -> Option<&str> {
        match self {
            Asset::MultiToken { token_id, .. } => Some(token_id),
            _ => None,
        }
    }

    pub fn amount(&self) -> &BigUint {
        match self {
            Asset::Native { amount, .. }
            | Asset::FungibleToken { amount, .. }
            | Asset::MultiToken { amount, .. } => amount,
        }
    }

    /// Returns a copy carrying a different amount.
    pub fn with_amount(&self, new_amount: BigUint) -> Self {
        let mut asset = self.clone();
        match &mut asset {
            Asset::Native { amount, .. }
            | Asset::FungibleToken { amount, .. }
            | Asset::MultiToken { amount, .. } => *amount = new_amount,
        }
        asset
    }

    /// Balance-book key identifying the asset independent of amount.
    ///
    /// Format: `<chain id>:<identifier>[:<sub id>]`
    pub fn key(&self) -> String {
        match self.sub_id() {
            Some(sub_id) => format!("{}:{}:{}", self.chain().0, self.identifier(), sub_id),
            None => format!("{}:{}", self.chain().0, self.identifier()),
        }
    }

    /// Validates the asset shape and that a chain of the given family can hold it.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Asset is well-formed and supported
    /// * `Err(BridgeError::InvalidAsset)` - Empty identifiers, zero amount, or unsupported kind
    pub fn validate_for(&self, chain_type: ChainType) -> Result<()> {
        self.validate_shape()?;
        if self.amount().is_zero() {
            return Err(BridgeError::InvalidAsset(format!(
                "{} amount must be non-zero",
                self.key()
            )));
        }
        if !supported_kinds(chain_type).contains(&self.kind()) {
            return Err(BridgeError::InvalidAsset(format!(
                "{} assets are not supported on {} chains",
                self.kind(),
                chain_type
            )));
        }
        Ok(())
    }

    /// Checks that identifiers are present, independent of amount and chain family.
    pub fn validate_shape(&self) -> Result<()> {
        if self.identifier().trim().is_empty() {
            return Err(BridgeError::InvalidAsset(format!(
                "{} asset on {} has an empty identifier",
                self.kind(),
                self.chain()
            )));
        }
        if let Some(sub_id) = self.sub_id() {
            if sub_id.trim().is_empty() {
                return Err(BridgeError::InvalidAsset(format!(
                    "multi-token {} on {} has an empty token id",
                    self.identifier(),
                    self.chain()
                )));
            }
        }
        Ok(())
    }

    /// Representation of this asset once it arrives on `target_chain`.
    ///
    /// Multi-tokens stay multi-tokens only where the target standard is
    /// ERC-1155; everything else arrives as a fungible token whose contract is
    /// derived from the origin chain and identifier.
    pub fn wrapped_for(&self, target_chain: ChainId, standard: TokenStandard) -> Asset {
        let wrapped_contract = match self.sub_id() {
            Some(sub_id) => format!("wrapped:{}:{}:{}", self.chain().0, self.identifier(), sub_id),
            None => format!("wrapped:{}:{}", self.chain().0, self.identifier()),
        };
        match (self, standard) {
            (Asset::MultiToken { contract, token_id, amount, .. }, TokenStandard::Erc1155) => {
                Asset::MultiToken {
                    chain: target_chain,
                    contract: format!("wrapped:{}:{}", self.chain().0, contract),
                    token_id: token_id.clone(),
                    amount: amount.clone(),
                }
            }
            (Asset::Native { denomination, amount, .. }, TokenStandard::Native)
                if self.chain() == target_chain =>
            {
                Asset::Native {
                    chain: target_chain,
                    denomination: denomination.clone(),
                    amount: amount.clone(),
                }
            }
            _ => Asset::FungibleToken {
                chain: target_chain,
                contract: wrapped_contract,
                amount: self.amount().clone(),
            },
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.amount(), self.key(), self.kind())
    }
}

/// Asset kinds a chain family can custody.
pub fn supported_kinds(chain_type: ChainType) -> &'static [AssetKind] {
    match chain_type {
        ChainType::Evm => &[AssetKind::Native, AssetKind::FungibleToken, AssetKind::MultiToken],
        ChainType::Svm => &[AssetKind::Native, AssetKind::FungibleToken, AssetKind::MultiToken],
        ChainType::Mvm => &[AssetKind::Native, AssetKind::FungibleToken],
        ChainType::Utxo => &[AssetKind::Native],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_key_includes_sub_id() {
        let asset = Asset::multi_token(ChainId(1), "0xabc", "7", 10u32);
        assert_eq!(asset.key(), "1:0xabc:7");
        assert_eq!(Asset::native(ChainId(3), "BTC", 1u32).key(), "3:BTC");
    }

    #[test]
    fn test_utxo_rejects_tokens() {
        let token = Asset::fungible(ChainId(3), "0xabc", 10u32);
        assert!(matches!(
            token.validate_for(ChainType::Utxo),
            Err(BridgeError::InvalidAsset(_))
        ));
        assert!(Asset::native(ChainId(3), "BTC", 10u32).validate_for(ChainType::Utxo).is_ok());
    }

    #[test]
    fn test_amount_serializes_as_decimal_string() {
        let asset = Asset::native(ChainId(1), "ETH", 1_000_000_000_000_000_000u128);
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["amount"], "1000000000000000000");
        assert_eq!(json["type"], "native");
        let back: Asset = serde_json::from_value(json).unwrap();
        assert_eq!(back, asset);
    }
}
