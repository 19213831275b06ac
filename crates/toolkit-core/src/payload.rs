//! JSON bodies accepted by the gateway's `add_transaction`, `estimate_fee`
//! and `simulate_transaction` endpoints.
//!
//! Addresses, hashes, fees, versions and nonces travel as `0x` hex strings;
//! calldata and signature elements travel as decimal strings.

use chain_stark::felt::to_hex;
use chain_stark::signer::Signature;
use serde::{Serialize, Serializer};
use starknet_ff::FieldElement;

fn hex<S: Serializer>(value: &FieldElement, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_hex(value))
}

fn decimal_list<S: Serializer>(values: &[FieldElement], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(|v| v.to_string()))
}

#[derive(Debug, Clone, Serialize)]
pub struct InvokePayload {
    #[serde(serialize_with = "hex")]
    pub contract_address: FieldElement,
    #[serde(serialize_with = "hex")]
    pub entry_point_selector: FieldElement,
    #[serde(serialize_with = "decimal_list")]
    pub calldata: Vec<FieldElement>,
    #[serde(serialize_with = "decimal_list")]
    pub signature: Vec<FieldElement>,
    #[serde(serialize_with = "hex")]
    pub max_fee: FieldElement,
    #[serde(serialize_with = "hex")]
    pub version: FieldElement,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclarePayload {
    #[serde(serialize_with = "hex")]
    pub sender_address: FieldElement,
    /// Compiled class, passed through untouched.
    pub contract_class: serde_json::Value,
    #[serde(serialize_with = "decimal_list")]
    pub signature: Vec<FieldElement>,
    #[serde(serialize_with = "hex")]
    pub max_fee: FieldElement,
    #[serde(serialize_with = "hex")]
    pub version: FieldElement,
    #[serde(serialize_with = "hex")]
    pub nonce: FieldElement,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployAccountPayload {
    #[serde(serialize_with = "hex")]
    pub class_hash: FieldElement,
    #[serde(serialize_with = "hex")]
    pub contract_address_salt: FieldElement,
    #[serde(serialize_with = "decimal_list")]
    pub constructor_calldata: Vec<FieldElement>,
    #[serde(serialize_with = "decimal_list")]
    pub signature: Vec<FieldElement>,
    #[serde(serialize_with = "hex")]
    pub max_fee: FieldElement,
    #[serde(serialize_with = "hex")]
    pub version: FieldElement,
    #[serde(serialize_with = "hex")]
    pub nonce: FieldElement,
}

/// A signed transaction, tagged with its gateway `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TransactionPayload {
    #[serde(rename = "INVOKE_FUNCTION")]
    Invoke(InvokePayload),
    #[serde(rename = "DECLARE")]
    Declare(DeclarePayload),
    #[serde(rename = "DEPLOY_ACCOUNT")]
    DeployAccount(DeployAccountPayload),
}

impl TransactionPayload {
    pub fn signature(&self) -> &[FieldElement] {
        match self {
            TransactionPayload::Invoke(p) => &p.signature,
            TransactionPayload::Declare(p) => &p.signature,
            TransactionPayload::DeployAccount(p) => &p.signature,
        }
    }

    pub fn version(&self) -> FieldElement {
        match self {
            TransactionPayload::Invoke(p) => p.version,
            TransactionPayload::Declare(p) => p.version,
            TransactionPayload::DeployAccount(p) => p.version,
        }
    }
}

pub(crate) fn signature_felts(signature: &Signature) -> Vec<FieldElement> {
    signature.to_felts().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invoke_wire_format() {
        let payload = TransactionPayload::Invoke(InvokePayload {
            contract_address: FieldElement::from(0x1234u64),
            entry_point_selector: FieldElement::from(0xabcu64),
            calldata: vec![FieldElement::ONE, FieldElement::from(100u64)],
            signature: vec![FieldElement::from(5u64), FieldElement::from(6u64)],
            max_fee: FieldElement::ZERO,
            version: FieldElement::ZERO,
        });

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "type": "INVOKE_FUNCTION",
                "contract_address": "0x1234",
                "entry_point_selector": "0xabc",
                "calldata": ["1", "100"],
                "signature": ["5", "6"],
                "max_fee": "0x0",
                "version": "0x0",
            })
        );
    }

    #[test]
    fn declare_passes_class_through() {
        let payload = TransactionPayload::Declare(DeclarePayload {
            sender_address: FieldElement::from(0x1u64),
            contract_class: json!({"abi": [], "program": "..."}),
            signature: vec![],
            max_fee: FieldElement::from(0x10u64),
            version: FieldElement::ONE,
            nonce: FieldElement::TWO,
        });

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "DECLARE");
        assert_eq!(value["contract_class"]["program"], "...");
        assert_eq!(value["max_fee"], "0x10");
        assert_eq!(value["nonce"], "0x2");
        assert_eq!(payload.version(), FieldElement::ONE);
    }

    #[test]
    fn deploy_account_wire_format() {
        let payload = TransactionPayload::DeployAccount(DeployAccountPayload {
            class_hash: FieldElement::from(0x99u64),
            contract_address_salt: FieldElement::from(0x7u64),
            constructor_calldata: vec![FieldElement::from(42u64)],
            signature: vec![FieldElement::ONE, FieldElement::TWO],
            max_fee: FieldElement::ZERO,
            version: FieldElement::ONE,
            nonce: FieldElement::ZERO,
        });

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "DEPLOY_ACCOUNT");
        assert_eq!(value["contract_address_salt"], "0x7");
        assert_eq!(value["constructor_calldata"], json!(["42"]));
        assert_eq!(payload.signature(), &[FieldElement::ONE, FieldElement::TWO]);
    }
}
