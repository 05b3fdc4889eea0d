//! Validator Key Generation Utility
//!
//! This binary generates Ed25519 key pairs for bridge validators.
//!
//! ## Usage
//!
//! ```bash
//! # Generate one key pair
//! cargo run --bin generate_keys
//!
//! # Generate a validator set of three
//! cargo run --bin generate_keys -- 3
//! ```
//!
//! ## Output
//!
//! For each key pair:
//! - Private key (base64 encoded) - for `attestor_private_keys`
//! - Public key (base64 encoded) - for `validator_set`
//!
//! followed by a `[[chains]]` snippet for `config/bridge.toml`.

use cross_chain_bridge::ValidatorSigner;

fn main() {
    let count = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<usize>() {
            Ok(count) if count > 0 => count,
            _ => {
                eprintln!("Usage: generate_keys [COUNT]  (COUNT must be a positive integer)");
                std::process::exit(1);
            }
        },
        None => 1,
    };

    let signers: Vec<ValidatorSigner> = (0..count).map(|_| ValidatorSigner::generate()).collect();

    println!("Generated {} Ed25519 Key Pair(s):", count);
    for (index, signer) in signers.iter().enumerate() {
        println!();
        println!("Validator {}", index + 1);
        println!("Private Key (base64): {}", signer.private_key_base64());
        println!("Public Key (base64): {}", signer.signer_id());
    }

    let quote = |values: Vec<String>| {
        values
            .iter()
            .map(|value| format!("\"{}\"", value))
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!();
    println!("Copy into the [[chains]] entry of your config/bridge.toml:");
    println!(
        "validator_set = [{}]",
        quote(signers.iter().map(ValidatorSigner::signer_id).collect())
    );
    println!(
        "attestor_private_keys = [{}]",
        quote(signers.iter().map(ValidatorSigner::private_key_base64).collect())
    );
}
