use sha3::{Digest, Keccak256};
use starknet_ff::FieldElement;

/// Entry point every account contract exposes for multicall execution.
pub const EXECUTE_ENTRY_POINT: &str = "__execute__";

/// Keccak-256 of `data` truncated to the low 250 bits, as used for
/// entry-point dispatch across the network.
pub fn starknet_keccak(data: &[u8]) -> FieldElement {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Keccak256::digest(data));
    // Keep the low 250 bits.
    hash[0] &= 0x03;

    // 250 bits always fit below the field modulus.
    match FieldElement::from_bytes_be(&hash) {
        Ok(value) => value,
        Err(_) => unreachable!("250-bit value exceeds the field"),
    }
}

/// Computes the selector of an entry point from its name.
pub fn get_selector_from_name(name: &str) -> FieldElement {
    starknet_keccak(name.as_bytes())
}
