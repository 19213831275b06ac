//! StarkNet chain support for the transaction toolkit.
//!
//! This crate provides:
//! - Classification of user tokens into numbers and aliases, and field element parsing
//! - Entry-point selectors (masked Keccak-256)
//! - Multicall encoding into the `__execute__` call-array layout
//! - Pedersen transaction hashes (invoke, declare, deploy-account, legacy multicall)
//! - Stark ECDSA signing with deterministic nonces
//! - Network definitions and chain ids
//! - Universal Deployer Contract calls and address prediction

pub mod call;
pub mod error;
pub mod felt;
pub mod hash;
pub mod networks;
pub mod selector;
pub mod signer;
pub mod udc;

pub use starknet_ff::FieldElement;
