//! Solana chain adapter
//!
//! Addresses are 32-byte public keys in hex form. Every foreign asset,
//! multi-tokens included, arrives as an SPL token.

use async_trait::async_trait;

use crate::asset::{Asset, AssetKind};
use crate::error::Result;
use crate::proof::BridgeProof;
use crate::types::{ChainId, ChainType, TokenStandard};

use super::generic::{validate_hex_address, AdapterCore};
use super::{BridgeAdapter, ProofRequest, TxReceipt};

pub struct SvmAdapter {
    core: AdapterCore,
}

impl SvmAdapter {
    pub fn new(core: AdapterCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl BridgeAdapter for SvmAdapter {
    fn chain_id(&self) -> ChainId {
        self.core.chain()
    }

    fn chain_type(&self) -> ChainType {
        ChainType::Svm
    }

    fn validate_address(&self, address: &str) -> Result<()> {
        validate_hex_address(address, 64, "Solana")
    }

    fn target_standard(&self, asset: &Asset) -> TokenStandard {
        match asset.kind() {
            AssetKind::Native if asset.chain() == self.chain_id() => TokenStandard::Native,
            _ => TokenStandard::Spl,
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
