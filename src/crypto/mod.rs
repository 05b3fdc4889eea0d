//! Cryptographic Operations Module
//!
//! This module handles validator key handling for the bridge: Ed25519 key
//! parsing, signing proof commitments, and verifying validator signatures.
//! Keys and signatures travel base64-encoded; a validator is identified by its
//! base64-encoded public key.
//!
//! ## Security Requirements
//!
//! ⚠️ **CRITICAL**: Private keys must never be exposed or logged. Only the
//! signer id (public key) may appear in logs.

pub mod hash;

use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use hash::HashScheme;

// ============================================================================
// CRYPTOGRAPHIC DATA STRUCTURES
// ============================================================================

/// One validator's signature over a proof commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSignature {
    /// Signer id: base64-encoded Ed25519 public key
    pub signer: String,
    /// Base64-encoded Ed25519 signature
    pub signature: String,
}

// ============================================================================
// VALIDATOR SIGNER
// ============================================================================

/// Holds one validator's signing key.
///
/// In production the validator keys live with the external validator set;
/// this type backs local attestors (devnets, tests).
#[derive(Clone)]
pub struct ValidatorSigner {
    /// Private key for signing operations
    signing_key: SigningKey,
    /// Public key for signature verification
    verifying_key: VerifyingKey,
}

impl ValidatorSigner {
    /// Creates a signer from raw secret key bytes.
    pub fn from_bytes(secret_key_bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret_key_bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Creates a signer from a base64-encoded private key.
    ///
    /// # Arguments
    ///
    /// * `private_key_b64` - Base64-encoded 32-byte Ed25519 secret key
    ///
    /// # Returns
    ///
    /// * `Ok(ValidatorSigner)` - Successfully parsed signer
    /// * `Err(anyhow::Error)` - Invalid base64 or wrong key length
    pub fn from_base64(private_key_b64: &str) -> Result<Self> {
        let private_key_bytes = general_purpose::STANDARD.decode(private_key_b64)?;

        if private_key_bytes.len() != 32 {
            return Err(anyhow::anyhow!(
                "Invalid private key length: expected 32 bytes, got {}",
                private_key_bytes.len()
            ));
        }

        let secret_key_bytes: [u8; 32] = private_key_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Failed to convert private key to array"))?;

        Ok(Self::from_bytes(&secret_key_bytes))
    }

    /// Generates a fresh random signer.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut secret_key_bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret_key_bytes);
        Self::from_bytes(&secret_key_bytes)
    }

    /// Returns the signer id (base64-encoded public key).
    pub fn signer_id(&self) -> String {
        general_purpose::STANDARD.encode(self.verifying_key.to_bytes())
    }

    /// Returns the base64-encoded private key.
    pub fn private_key_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.signing_key.to_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.verifying_key
    }

    /// Signs a commitment message.
    pub fn sign(&self, message: &[u8]) -> ValidatorSignature {
        let signature = self.signing_key.sign(message);
        debug!("Validator {} signed {}-byte commitment", self.signer_id(), message.len());
        ValidatorSignature {
            signer: self.signer_id(),
            signature: general_purpose::STANDARD.encode(signature.to_bytes()),
        }
    }
}

impl std::fmt::Debug for ValidatorSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorSigner")
            .field("signer_id", &self.signer_id())
            .finish()
    }
}

// ============================================================================
// VERIFICATION
// ============================================================================

/// Parses a base64-encoded Ed25519 public key.
pub fn parse_public_key(public_key_b64: &str) -> Result<VerifyingKey> {
    let bytes = general_purpose::STANDARD.decode(public_key_b64)?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Invalid public key length for '{}'", public_key_b64))?;
    Ok(VerifyingKey::from_bytes(&bytes)?)
}

/// Verifies a base64-encoded signature against a message.
///
/// # Returns
///
/// * `Ok(bool)` - True if signature is valid, false otherwise
/// * `Err(anyhow::Error)` - Signature is not valid base64 or has the wrong length
pub fn verify_signature(key: &VerifyingKey, message: &[u8], signature_b64: &str) -> Result<bool> {
    let signature_bytes = general_purpose::STANDARD.decode(signature_b64)?;
    let signature_bytes: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Invalid signature length"))?;
    let signature = Signature::from_bytes(&signature_bytes);

    match key.verify_strict(message, &signature) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}
