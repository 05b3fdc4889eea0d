//! EVM chain adapter
//!
//! Addresses are 20-byte hex. Multi-tokens arrive as ERC-1155, everything
//! else as ERC-20.

use async_trait::async_trait;

use crate::asset::{Asset, AssetKind};
use crate::error::{BridgeError, Result};
use crate::proof::BridgeProof;
use crate::types::{ChainId, ChainType, TokenStandard};

use super::generic::{validate_hex_address, AdapterCore};
use super::{BridgeAdapter, ProofRequest, TxReceipt};

pub struct EvmAdapter {
    core: AdapterCore,
}

impl EvmAdapter {
    pub fn new(core: AdapterCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl BridgeAdapter for EvmAdapter {
    fn chain_id(&self) -> ChainId {
        self.core.chain()
    }

    fn chain_type(&self) -> ChainType {
        ChainType::Evm
    }

    fn validate_address(&self, address: &str) -> Result<()> {
        if !address.starts_with("0x") {
            return Err(BridgeError::InvalidRequest(format!(
                "Invalid EVM address format: missing 0x prefix. Address: '{}'",
                address
            )));
        }
        validate_hex_address(address, 40, "EVM")
    }

    fn target_standard(&self, asset: &Asset) -> TokenStandard {
        match asset.kind() {
            AssetKind::MultiToken => TokenStandard::Erc1155,
            AssetKind::Native if asset.chain() == self.chain_id() => TokenStandard::Native,
            _ => TokenStandard::Erc20,
        }
    }

    async fn next_nonce(&self, sender: &str) -> Result<u64> {
        Ok(self.core.next_nonce(sender).await)
    }

    async fn generate_proof(&self, request: &ProofRequest) -> Result<BridgeProof> {
        self.core.generate_proof(request).await
    }

    async fn submit(&self, proof: &BridgeProof) -> Result<TxReceipt> {
        self.core.submit(proof, self.wrap_asset(&proof.asset)).await
    }
}
