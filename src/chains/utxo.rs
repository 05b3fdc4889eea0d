//! UTXO chain adapter
//!
//! UTXO chains custody only their native coin, so they can be a bridge
//! source but cannot receive wrapped foreign assets. Addresses are either
//! segwit bech32 (`bc1…`/`tb1…`) or legacy base58check; both are fully
//! decoded, checksum included, and must belong to the configured network.

use async_trait::async_trait;
use bech32::hrp::{self, Hrp};
use bech32::segwit;

use crate::asset::Asset;
use crate::error::{BridgeError, Result};
use crate::proof::BridgeProof;
use crate::types::{ChainId, ChainType, NetworkType, TokenStandard};

use super::generic::AdapterCore;
use super::{BridgeAdapter, ProofRequest, TxReceipt};

/// Base58check version bytes of P2PKH and P2SH addresses
const MAINNET_LEGACY_VERSIONS: [u8; 2] = [0x00, 0x05];
const TESTNET_LEGACY_VERSIONS: [u8; 2] = [0x6f, 0xc4];
/// Version byte followed by a 20-byte hash
const LEGACY_PAYLOAD_LEN: usize = 21;

pub struct UtxoAdapter {
    core: AdapterCore,
    network: NetworkType,
}

impl UtxoAdapter {
    pub fn new(core: AdapterCore, network: NetworkType) -> Self {
        Self { core, network }
    }

    fn segwit_hrp(&self) -> Hrp {
        match self.network {
            NetworkType::Mainnet => hrp::BC,
            NetworkType::Testnet => hrp::TB,
        }
    }

    fn legacy_versions(&self) -> &'static [u8] {
        match self.network {
            NetworkType::Mainnet => &MAINNET_LEGACY_VERSIONS,
            NetworkType::Testnet => &TESTNET_LEGACY_VERSIONS,
        }
    }

    fn invalid(&self, address: &str, reason: impl std::fmt::Display) -> BridgeError {
        BridgeError::InvalidRequest(format!(
            "Invalid UTXO address for {}: '{}' ({})",
            self.network, address, reason
        ))
    }

    /// Decodes a bech32/bech32m segwit address and checks its network prefix.
    fn validate_segwit(&self, address: &str) -> Result<()> {
        let (found, _witness_version, _program) =
            segwit::decode(address).map_err(|e| self.invalid(address, e))?;
        if found != self.segwit_hrp() {
            return Err(self.invalid(address, format!("prefix '{}' belongs to another network", found)));
        }
        Ok(())
    }

    /// Decodes a base58check address and checks its version byte.
    fn validate_legacy(&self, address: &str) -> Result<()> {
        let payload = bs58::decode(address)
            .with_check(None)
            .into_vec()
            .map_err(|e| self.invalid(address, e))?;
        if payload.len() != LEGACY_PAYLOAD_LEN {
            return Err(self.invalid(address, format!("payload is {} bytes", payload.len())));
        }
        if !self.legacy_versions().contains(&payload[0]) {
            return Err(self.invalid(
                address,
                format!("version byte 0x{:02x} belongs to another network", payload[0]),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BridgeAdapter for UtxoAdapter {
    fn chain_id(&self) -> ChainId {
        self.core.chain()
    }

    fn chain_type(&self) -> ChainType {
        ChainType::Utxo
    }

    fn validate_address(&self, address: &str) -> Result<()> {
        let lowered = address.to_ascii_lowercase();
        if lowered.starts_with("bc1") || lowered.starts_with("tb1") {
            self.validate_segwit(address)
        } else {
            self.validate_legacy(address)
        }
    }

    fn target_standard(&self, _asset: &Asset) -> TokenStandard {
        TokenStandard::Native
    }

    async fn next_nonce(&self, sender: &str) -> Result<u64> {
        Ok(self.core.next_nonce(sender).await)
    }

    async fn generate_proof(&self, request: &ProofRequest) -> Result<BridgeProof> {
        self.core.generate_proof(request).await
    }

    async fn submit(&self, proof: &BridgeProof) -> Result<TxReceipt> {
        let minted = self.wrap_asset(&proof.asset);
        if let Err(e) = minted.validate_for(ChainType::Utxo) {
            return Err(BridgeError::SubmissionFailed {
                chain: self.chain_id(),
                reason: e.to_string(),
            });
        }
        self.core.submit(proof, minted).await
    }
}
