//! Universal Deployer Contract helpers.

use starknet_crypto::pedersen_hash;
use starknet_ff::FieldElement;

use crate::call::Call;
use crate::hash::calculate_contract_address;

/// Address of the Universal Deployer Contract, identical on every network.
pub const UDC_ADDRESS: FieldElement = FieldElement::from_mont([
    15144800532519055890,
    15685625669053253235,
    9333317513348225193,
    121672436446604875,
]);

/// UDC entry point that deploys a declared class.
pub const DEPLOY_CONTRACT_ENTRY_POINT: &str = "deployContract";

/// `deployContract(class_hash, salt, unique, calldata_len, calldata...)`.
pub fn deploy_call(
    class_hash: FieldElement,
    salt: FieldElement,
    unique: bool,
    constructor_calldata: &[FieldElement],
) -> Call {
    let mut calldata = Vec::with_capacity(4 + constructor_calldata.len());
    calldata.push(class_hash);
    calldata.push(salt);
    calldata.push(if unique {
        FieldElement::ONE
    } else {
        FieldElement::ZERO
    });
    calldata.push(FieldElement::from(constructor_calldata.len()));
    calldata.extend_from_slice(constructor_calldata);
    Call::new(UDC_ADDRESS, DEPLOY_CONTRACT_ENTRY_POINT, calldata)
}

/// Address the UDC will assign. A unique deployment mixes the caller into
/// the salt and uses the UDC as deployer; otherwise the deployer is zero.
pub fn predict_address(
    caller: FieldElement,
    class_hash: FieldElement,
    salt: FieldElement,
    unique: bool,
    constructor_calldata: &[FieldElement],
) -> FieldElement {
    if unique {
        let salt = pedersen_hash(&caller, &salt);
        calculate_contract_address(salt, class_hash, constructor_calldata, UDC_ADDRESS)
    } else {
        calculate_contract_address(salt, class_hash, constructor_calldata, FieldElement::ZERO)
    }
}
