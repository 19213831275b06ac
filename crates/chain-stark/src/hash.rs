//! Transaction hashing.
//!
//! All hashes here are Pedersen chains over already-encoded field elements.
//! The field order inside each chain is fixed by the network and must not be
//! rearranged: the sequencer recomputes the same hash when it verifies the
//! signature.

use starknet_crypto::pedersen_hash;
use starknet_ff::FieldElement;

use crate::call::{encode, Call, CallArrayEntry};
use crate::error::StarkError;
use crate::felt::str_to_felt;
use crate::selector::{get_selector_from_name, EXECUTE_ENTRY_POINT};

/// Version of invoke transactions signed through an account's `__execute__`.
pub const TRANSACTION_VERSION: u64 = 0;

/// Version of declare and deploy-account transactions.
pub const DECLARE_VERSION: u64 = 1;

/// `2^128`, added to the version of transactions that are only estimated or
/// simulated so their signatures can never be replayed as real ones.
pub const QUERY_VERSION_BASE: FieldElement = FieldElement::from_mont([
    18446744073700081665,
    17407,
    18446744073709551584,
    576460752142434320,
]);

/// Addresses are reduced modulo `2^251 - 256`.
pub const ADDR_BOUND: FieldElement = FieldElement::from_mont([
    18446743986131443745,
    160989183,
    18446744073709255680,
    576459263475590224,
]);

/// Short string `"STARKNET_CONTRACT_ADDRESS"`.
const CONTRACT_ADDRESS_PREFIX: FieldElement = FieldElement::from_mont([
    3829237882463328880,
    17289941567720117366,
    8635008616843941496,
    533439743893157637,
]);

/// Short string `"StarkNet Transaction"`.
const MULTICALL_TAG: FieldElement = FieldElement::from_mont([
    312878089121980887,
    10823108295910496339,
    18446744028905198002,
    130780744342863686,
]);

/// Domain-separation prefix of a transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionHashPrefix {
    Invoke,
    Declare,
    DeployAccount,
}

impl TransactionHashPrefix {
    /// The prefix as a field element (its short-string encoding).
    pub fn as_felt(self) -> FieldElement {
        match self {
            // "invoke"
            TransactionHashPrefix::Invoke => FieldElement::from_mont([
                18443034532770911073,
                18446744073709551615,
                18446744073709551615,
                513398556346534256,
            ]),
            // "declare"
            TransactionHashPrefix::Declare => FieldElement::from_mont([
                17542456862011667323,
                18446744073709551615,
                18446744073709551615,
                191557713328401194,
            ]),
            // "deploy_account"
            TransactionHashPrefix::DeployAccount => FieldElement::from_mont([
                3350261884043292318,
                18443211694809419988,
                18446744073709551615,
                461298303000467581,
            ]),
        }
    }
}

/// Pedersen chain over `data` starting from zero, closed with the length.
pub fn compute_hash_on_elements(data: &[FieldElement]) -> FieldElement {
    let acc = data
        .iter()
        .fold(FieldElement::ZERO, |acc, item| pedersen_hash(&acc, item));
    pedersen_hash(&acc, &FieldElement::from(data.len()))
}

/// Version used for fee estimation and simulation of a transaction of the
/// given version.
pub fn query_version(version: u64) -> FieldElement {
    QUERY_VERSION_BASE + FieldElement::from(version)
}

/// The network's common transaction hash:
/// `H(prefix, version, address, selector, H(calldata), max_fee, chain_id, extra...)`.
#[allow(clippy::too_many_arguments)]
pub fn calculate_transaction_hash_common(
    prefix: TransactionHashPrefix,
    version: FieldElement,
    contract_address: FieldElement,
    entry_point_selector: FieldElement,
    calldata: &[FieldElement],
    max_fee: FieldElement,
    chain_id: FieldElement,
    additional_data: &[FieldElement],
) -> FieldElement {
    let mut elements = Vec::with_capacity(7 + additional_data.len());
    elements.push(prefix.as_felt());
    elements.push(version);
    elements.push(contract_address);
    elements.push(entry_point_selector);
    elements.push(compute_hash_on_elements(calldata));
    elements.push(max_fee);
    elements.push(chain_id);
    elements.extend_from_slice(additional_data);
    compute_hash_on_elements(&elements)
}

/// `[len(call_array), entries..., len(calldata), calldata..., nonce]`.
pub fn execute_calldata(
    call_array: &[CallArrayEntry],
    calldata: &[FieldElement],
    nonce: FieldElement,
) -> Vec<FieldElement> {
    let mut out = Vec::with_capacity(3 + call_array.len() * 4 + calldata.len());
    out.push(FieldElement::from(call_array.len()));
    for entry in call_array {
        out.extend_from_slice(&entry.to_felts());
    }
    out.push(FieldElement::from(calldata.len()));
    out.extend_from_slice(calldata);
    out.push(nonce);
    out
}

/// Invoke transaction hash at [`TRANSACTION_VERSION`].
pub fn get_transaction_hash(
    sender: FieldElement,
    call_array: &[CallArrayEntry],
    calldata: &[FieldElement],
    nonce: FieldElement,
    max_fee: FieldElement,
    chain_id: FieldElement,
) -> FieldElement {
    invoke_transaction_hash(
        sender,
        call_array,
        calldata,
        nonce,
        max_fee,
        chain_id,
        FieldElement::from(TRANSACTION_VERSION),
    )
}

/// Invoke transaction hash at an explicit version (use [`query_version`] for
/// estimate/simulate payloads).
pub fn invoke_transaction_hash(
    sender: FieldElement,
    call_array: &[CallArrayEntry],
    calldata: &[FieldElement],
    nonce: FieldElement,
    max_fee: FieldElement,
    chain_id: FieldElement,
    version: FieldElement,
) -> FieldElement {
    calculate_transaction_hash_common(
        TransactionHashPrefix::Invoke,
        version,
        sender,
        get_selector_from_name(EXECUTE_ENTRY_POINT),
        &execute_calldata(call_array, calldata, nonce),
        max_fee,
        chain_id,
        &[],
    )
}

/// Legacy multicall hash. The selector enters the hash as the short-string
/// encoding of its name, not as its keccak selector.
pub fn hash_multicall(
    sender: FieldElement,
    calls: &[Call],
    nonce: FieldElement,
    max_fee: FieldElement,
) -> Result<FieldElement, StarkError> {
    let hash_array = calls
        .iter()
        .map(|call| {
            let selector = str_to_felt(&call.selector_name)?;
            Ok(compute_hash_on_elements(&[
                call.to,
                selector,
                compute_hash_on_elements(&call.calldata),
            ]))
        })
        .collect::<Result<Vec<_>, StarkError>>()?;

    Ok(compute_hash_on_elements(&[
        MULTICALL_TAG,
        sender,
        compute_hash_on_elements(&hash_array),
        nonce,
        max_fee,
        FieldElement::from(TRANSACTION_VERSION),
    ]))
}

/// Convenience: encode then hash, for callers holding logical calls.
pub fn hash_calls(
    sender: FieldElement,
    calls: &[Call],
    nonce: FieldElement,
    max_fee: FieldElement,
    chain_id: FieldElement,
) -> FieldElement {
    let (call_array, calldata) = encode(calls);
    get_transaction_hash(sender, &call_array, &calldata, nonce, max_fee, chain_id)
}

/// Declare transaction hash.
pub fn declare_transaction_hash(
    sender: FieldElement,
    class_hash: FieldElement,
    max_fee: FieldElement,
    chain_id: FieldElement,
    nonce: FieldElement,
    version: FieldElement,
) -> FieldElement {
    calculate_transaction_hash_common(
        TransactionHashPrefix::Declare,
        version,
        sender,
        FieldElement::ZERO,
        &[class_hash],
        max_fee,
        chain_id,
        &[nonce],
    )
}

/// Deploy-account transaction hash. The calldata hashed is
/// `[class_hash, salt, constructor_calldata...]`.
#[allow(clippy::too_many_arguments)]
pub fn deploy_account_transaction_hash(
    contract_address: FieldElement,
    class_hash: FieldElement,
    salt: FieldElement,
    constructor_calldata: &[FieldElement],
    max_fee: FieldElement,
    chain_id: FieldElement,
    nonce: FieldElement,
    version: FieldElement,
) -> FieldElement {
    let mut calldata = Vec::with_capacity(2 + constructor_calldata.len());
    calldata.push(class_hash);
    calldata.push(salt);
    calldata.extend_from_slice(constructor_calldata);

    calculate_transaction_hash_common(
        TransactionHashPrefix::DeployAccount,
        version,
        contract_address,
        FieldElement::ZERO,
        &calldata,
        max_fee,
        chain_id,
        &[nonce],
    )
}

/// Address a contract will have once deployed with the given parameters.
pub fn calculate_contract_address(
    salt: FieldElement,
    class_hash: FieldElement,
    constructor_calldata: &[FieldElement],
    deployer_address: FieldElement,
) -> FieldElement {
    compute_hash_on_elements(&[
        CONTRACT_ADDRESS_PREFIX,
        deployer_address,
        salt,
        class_hash,
        compute_hash_on_elements(constructor_calldata),
    ]) % ADDR_BOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::Network;

    fn felt(hex: &str) -> FieldElement {
        FieldElement::from_hex_be(hex).unwrap()
    }

    fn transfer_calls() -> Vec<Call> {
        vec![Call::new(
            felt("0xabc"),
            "transfer",
            vec![FieldElement::ONE, FieldElement::from(100u64)],
        )]
    }

    #[test]
    fn constants_match_their_short_strings() {
        assert_eq!(TransactionHashPrefix::Invoke.as_felt(), str_to_felt("invoke").unwrap());
        assert_eq!(TransactionHashPrefix::Declare.as_felt(), str_to_felt("declare").unwrap());
        assert_eq!(
            TransactionHashPrefix::DeployAccount.as_felt(),
            str_to_felt("deploy_account").unwrap()
        );
        assert_eq!(
            CONTRACT_ADDRESS_PREFIX,
            str_to_felt("STARKNET_CONTRACT_ADDRESS").unwrap()
        );
        assert_eq!(MULTICALL_TAG, str_to_felt("StarkNet Transaction").unwrap());
    }

    #[test]
    fn numeric_constants() {
        assert_eq!(
            QUERY_VERSION_BASE,
            felt("0x100000000000000000000000000000000")
        );
        assert_eq!(
            ADDR_BOUND,
            felt("0x7ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff00")
        );
        assert_eq!(query_version(1), felt("0x100000000000000000000000000000001"));
    }

    #[test]
    fn hash_on_empty_list() {
        assert_eq!(
            compute_hash_on_elements(&[]),
            felt("0x49ee3eba8c1600700ee1b87eb599f16716b0b1022947733551fde4050ca6804")
        );
    }

    #[test]
    fn hash_on_two_elements() {
        assert_eq!(
            compute_hash_on_elements(&[FieldElement::ONE, FieldElement::TWO]),
            felt("0x501a3a8e6cd4f5241c639c74052aaa34557aafa84dd4ba983d6443c590ab7df")
        );
    }

    #[test]
    fn execute_calldata_layout() {
        let (call_array, calldata) = encode(&transfer_calls());
        let out = execute_calldata(&call_array, &calldata, FieldElement::from(7u64));

        assert_eq!(out.len(), 1 + 4 + 1 + 2 + 1);
        assert_eq!(out[0], FieldElement::ONE);
        assert_eq!(out[1], felt("0xabc"));
        assert_eq!(out[2], get_selector_from_name("transfer"));
        assert_eq!(out[3], FieldElement::ZERO);
        assert_eq!(out[4], FieldElement::TWO);
        assert_eq!(out[5], FieldElement::TWO);
        assert_eq!(out[8], FieldElement::from(7u64));
    }

    #[test]
    fn invoke_hash_golden_value() {
        let (call_array, calldata) = encode(&transfer_calls());
        let hash = get_transaction_hash(
            felt("0x1234"),
            &call_array,
            &calldata,
            FieldElement::ZERO,
            FieldElement::ZERO,
            Network::Goerli.chain_id(),
        );
        assert_eq!(
            hash,
            felt("0x3c4d5f6b50037bf31320058ee553e7401597c7c65b335f69b803560d7b0253e")
        );
    }

    #[test]
    fn invoke_hash_is_deterministic() {
        let (call_array, calldata) = encode(&transfer_calls());
        let chain_id = Network::Goerli.chain_id();
        let a = get_transaction_hash(felt("0x1"), &call_array, &calldata, FieldElement::ONE, FieldElement::ZERO, chain_id);
        let b = get_transaction_hash(felt("0x1"), &call_array, &calldata, FieldElement::ONE, FieldElement::ZERO, chain_id);
        assert_eq!(a, b);
    }

    #[test]
    fn invoke_hash_changes_with_every_field() {
        let calls = vec![
            Call::new(felt("0xa"), "transfer", vec![FieldElement::ONE]),
            Call::new(felt("0xb"), "approve", vec![FieldElement::TWO]),
        ];
        let (call_array, calldata) = encode(&calls);
        let chain_id = Network::Goerli.chain_id();
        let base = get_transaction_hash(felt("0x1"), &call_array, &calldata, FieldElement::ZERO, FieldElement::ZERO, chain_id);

        let other_sender = get_transaction_hash(felt("0x2"), &call_array, &calldata, FieldElement::ZERO, FieldElement::ZERO, chain_id);
        let other_nonce = get_transaction_hash(felt("0x1"), &call_array, &calldata, FieldElement::ONE, FieldElement::ZERO, chain_id);
        let other_fee = get_transaction_hash(felt("0x1"), &call_array, &calldata, FieldElement::ZERO, FieldElement::ONE, chain_id);
        let other_chain = get_transaction_hash(felt("0x1"), &call_array, &calldata, FieldElement::ZERO, FieldElement::ZERO, Network::Mainnet.chain_id());

        let reversed: Vec<_> = calls.iter().rev().cloned().collect();
        let (rev_array, rev_data) = encode(&reversed);
        let other_order = get_transaction_hash(felt("0x1"), &rev_array, &rev_data, FieldElement::ZERO, FieldElement::ZERO, chain_id);

        for other in [other_sender, other_nonce, other_fee, other_chain, other_order] {
            assert_ne!(base, other);
        }
    }

    #[test]
    fn query_version_changes_hash() {
        let (call_array, calldata) = encode(&transfer_calls());
        let chain_id = Network::Goerli.chain_id();
        let real = get_transaction_hash(felt("0x1"), &call_array, &calldata, FieldElement::ZERO, FieldElement::ZERO, chain_id);
        let query = invoke_transaction_hash(
            felt("0x1"),
            &call_array,
            &calldata,
            FieldElement::ZERO,
            FieldElement::ZERO,
            chain_id,
            query_version(TRANSACTION_VERSION),
        );
        assert_ne!(real, query);
    }

    #[test]
    fn multicall_hash_golden_value() {
        let hash = hash_multicall(
            felt("0x1234"),
            &transfer_calls(),
            FieldElement::ZERO,
            FieldElement::ZERO,
        )
        .unwrap();
        assert_eq!(
            hash,
            felt("0x792ef5a19b93a767e20109644c5af6c9abdd09d0ef97fd371c04713211134ea")
        );
    }

    #[test]
    fn multicall_hash_rejects_long_selector_names() {
        let calls = vec![Call::new(felt("0x1"), "x".repeat(40), vec![])];
        assert!(hash_multicall(felt("0x1"), &calls, FieldElement::ZERO, FieldElement::ZERO).is_err());
    }

    #[test]
    fn hash_calls_matches_manual_encoding() {
        let (call_array, calldata) = encode(&transfer_calls());
        let chain_id = Network::Goerli.chain_id();
        assert_eq!(
            hash_calls(felt("0x1234"), &transfer_calls(), FieldElement::ZERO, FieldElement::ZERO, chain_id),
            get_transaction_hash(felt("0x1234"), &call_array, &calldata, FieldElement::ZERO, FieldElement::ZERO, chain_id)
        );
    }

    #[test]
    fn declare_hash_depends_on_nonce_and_class() {
        let chain_id = Network::Goerli.chain_id();
        let version = FieldElement::from(DECLARE_VERSION);
        let a = declare_transaction_hash(felt("0x1"), felt("0x10"), FieldElement::ZERO, chain_id, FieldElement::ZERO, version);
        let b = declare_transaction_hash(felt("0x1"), felt("0x10"), FieldElement::ZERO, chain_id, FieldElement::ONE, version);
        let c = declare_transaction_hash(felt("0x1"), felt("0x11"), FieldElement::ZERO, chain_id, FieldElement::ZERO, version);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn deploy_account_hash_depends_on_salt() {
        let chain_id = Network::Goerli.chain_id();
        let version = FieldElement::from(DECLARE_VERSION);
        let a = deploy_account_transaction_hash(felt("0x5"), felt("0x10"), felt("0x1"), &[felt("0x1")], FieldElement::ZERO, chain_id, FieldElement::ZERO, version);
        let b = deploy_account_transaction_hash(felt("0x5"), felt("0x10"), felt("0x2"), &[felt("0x1")], FieldElement::ZERO, chain_id, FieldElement::ZERO, version);
        assert_ne!(a, b);
    }

    #[test]
    fn contract_address_is_below_bound_and_salted() {
        let class_hash = felt("0x1234");
        let a = calculate_contract_address(FieldElement::ONE, class_hash, &[FieldElement::TWO], FieldElement::ZERO);
        let b = calculate_contract_address(FieldElement::TWO, class_hash, &[FieldElement::TWO], FieldElement::ZERO);
        assert!(a < ADDR_BOUND);
        assert!(b < ADDR_BOUND);
        assert_ne!(a, b);
        assert_eq!(
            a,
            calculate_contract_address(FieldElement::ONE, class_hash, &[FieldElement::TWO], FieldElement::ZERO)
        );
    }

    #[test]
    fn contract_address_depends_on_deployer() {
        let class_hash = felt("0x1234");
        let a = calculate_contract_address(FieldElement::ONE, class_hash, &[], FieldElement::ZERO);
        let b = calculate_contract_address(FieldElement::ONE, class_hash, &[], felt("0x99"));
        assert_ne!(a, b);
    }
}
