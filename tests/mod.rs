//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    btc, build_chain_config, build_env, build_env_with, build_ledgers, build_test_config,
    build_validator, eth, fast_options, validator_signers, RecordingObserver, ScriptedAdapter,
    TestEnv, APTOS, BITCOIN, DUMMY_RECIPIENT_EVM, DUMMY_RECIPIENT_MVM, DUMMY_RECIPIENT_SVM,
    DUMMY_SENDER_BTC, DUMMY_SENDER_EVM, DUMMY_SENDER_SVM, ETHEREUM, SOLANA, VALIDATOR_SEEDS,
};
