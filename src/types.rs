//! Shared identifier types and serde helpers
//!
//! This module contains the small value types used across every component:
//! chain identifiers, chain families, token standards, digests, and the serde
//! helpers that keep amounts and hashes stable on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Escrow identifier (UUID v4, generated at lock time).
pub type EscrowId = String;

/// Chain-native account address, kept in its textual form.
pub type Address = String;

/// 32-byte hash output used for merkle nodes and commitments.
pub type Digest = [u8; 32];

/// Numeric chain identifier (e.g., 1 for Ethereum mainnet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain-{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        ChainId(value)
    }
}

/// Family of blockchain a chain belongs to.
///
/// The family decides address format, supported asset kinds, default hash
/// scheme, and the token standard wrapped assets arrive as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    /// EVM-compatible chain (e.g., Ethereum, Polygon, Arbitrum)
    Evm,
    /// Move VM-based chain (e.g., Aptos)
    Mvm,
    /// Solana chain
    Svm,
    /// UTXO chain (e.g., Bitcoin)
    Utxo,
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainType::Evm => "evm",
            ChainType::Mvm => "mvm",
            ChainType::Svm => "svm",
            ChainType::Utxo => "utxo",
        };
        f.write_str(name)
    }
}

/// Token standard an asset is represented as on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenStandard {
    /// Chain-native coin (ETH, BTC, SOL, APT)
    Native,
    /// EVM fungible token
    Erc20,
    /// EVM multi-token
    Erc1155,
    /// Solana SPL token
    Spl,
    /// Move fungible asset
    FungibleAsset,
}

/// Network mode the bridge runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::Mainnet => f.write_str("mainnet"),
            NetworkType::Testnet => f.write_str("testnet"),
        }
    }
}

/// Current Unix timestamp in seconds.
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

// ============================================================================
// SERDE HELPERS
// ============================================================================

/// Serializes a `BigUint` as a decimal string.
///
/// JSON numbers cannot carry 256-bit token amounts, and BCS has no bignum
/// type, so amounts travel as base-10 strings everywhere.
pub mod amount_serde {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigUint::parse_bytes(text.as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("invalid decimal amount '{}'", text)))
    }
}

/// Serializes a 32-byte digest as a `0x`-prefixed hex string.
pub mod digest_serde {
    use super::Digest;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digest: &Digest, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(digest)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Digest, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_digest(&text).map_err(D::Error::custom)
    }

    pub(crate) fn parse_digest(text: &str) -> Result<Digest, String> {
        let bytes = hex::decode(text.strip_prefix("0x").unwrap_or(text))
            .map_err(|e| format!("invalid hex digest '{}': {}", text, e))?;
        bytes
            .try_into()
            .map_err(|_| format!("digest '{}' is not 32 bytes", text))
    }
}

/// Serializes a list of digests as hex strings.
pub mod digest_vec_serde {
    use super::{digest_serde::parse_digest, Digest};
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digests: &[Digest], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(digests.len()))?;
        for digest in digests {
            seq.serialize_element(&format!("0x{}", hex::encode(digest)))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Digest>, D::Error> {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .iter()
            .map(|text| parse_digest(text).map_err(D::Error::custom))
            .collect()
    }
}
