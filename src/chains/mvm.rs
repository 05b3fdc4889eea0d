//! Move VM chain adapter
//!
//! Addresses are 32-byte hex and may be written without leading zeros.
//! Foreign assets arrive as Move fungible assets; multi-tokens cannot be
//! custodied here.

use async_trait::async_trait;

use crate::asset::{Asset, AssetKind};
use crate::error::Result;
use crate::proof::BridgeProof;
use crate::types::{ChainId, ChainType, TokenStandard};

use super::generic::{normalize_hex_address, validate_hex_address, AdapterCore};
use super::{BridgeAdapter, ProofRequest, TxReceipt};

pub struct MvmAdapter {
    core: AdapterCore,
}

impl MvmAdapter {
    pub fn new(core: AdapterCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl BridgeAdapter for MvmAdapter {
    fn chain_id(&self) -> ChainId {
        self.core.chain()
    }

    fn chain_type(&self) -> ChainType {
        ChainType::Mvm
    }

    fn validate_address(&self, address: &str) -> Result<()> {
        validate_hex_address(&normalize_hex_address(address, 64), 64, "Move VM")
    }

    fn target_standard(&self, asset: &Asset) -> TokenStandard {
        match asset.kind() {
            AssetKind::Native if asset.chain() == self.chain_id() => TokenStandard::Native,
            _ => TokenStandard::FungibleAsset,
        }
    }

    async fn next_nonce(&self, sender: &str) -> Result<u64> {
        let sender = normalize_hex_address(sender, 64);
        Ok(self.core.next_nonce(&sender).await)
    }

    async fn generate_proof(&self, request: &ProofRequest) -> Result<BridgeProof> {
        let mut request = request.clone();
        request.sender = normalize_hex_address(&request.sender, 64);
        self.core.generate_proof(&request).await
    }

    async fn submit(&self, proof: &BridgeProof) -> Result<TxReceipt> {
        self.core.submit(proof, self.wrap_asset(&proof.asset)).await
    }
}
