use starknet_ff::FieldElement;

use crate::error::StarkError;
use crate::felt::{parse_felt, prepare_params};
use crate::selector::get_selector_from_name;

/// A single logical invocation: target contract, entry-point name, arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: FieldElement,
    pub selector_name: String,
    pub calldata: Vec<FieldElement>,
}

impl Call {
    pub fn new(to: FieldElement, selector_name: impl Into<String>, calldata: Vec<FieldElement>) -> Self {
        Self {
            to,
            selector_name: selector_name.into(),
            calldata,
        }
    }
}

/// Wire-format projection of a [`Call`].
///
/// `data_offset` is the running offset into the flattened calldata buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallArrayEntry {
    pub to: FieldElement,
    pub selector: FieldElement,
    pub data_offset: FieldElement,
    pub data_len: FieldElement,
}

impl CallArrayEntry {
    /// The entry as the four consecutive felts that appear in `__execute__`
    /// calldata.
    pub fn to_felts(&self) -> [FieldElement; 4] {
        [self.to, self.selector, self.data_offset, self.data_len]
    }
}

/// An untyped call as it arrives from a script or the command line: a list of
/// fields that must be `[target, selector_name, [arguments...]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallField {
    Text(String),
    List(Vec<String>),
}

/// Validates an untyped call and converts it into a [`Call`].
///
/// The target must be a number (aliases are resolved by the registry before
/// this point); arguments go through the number/alias classifier.
pub fn call_from_fields(fields: &[CallField]) -> Result<Call, StarkError> {
    match fields {
        [CallField::Text(to), CallField::Text(selector_name), CallField::List(args)] => {
            let to = parse_felt(to)
                .map_err(|e| StarkError::MalformedCall(format!("invalid target: {e}")))?;
            if selector_name.is_empty() {
                return Err(StarkError::MalformedCall("empty selector name".into()));
            }
            let calldata = prepare_params(args)
                .map_err(|e| StarkError::MalformedCall(format!("invalid argument: {e}")))?;
            Ok(Call::new(to, selector_name.clone(), calldata))
        }
        [_, _, _] => Err(StarkError::MalformedCall(
            "expected (target, selector name, argument list)".into(),
        )),
        _ => Err(StarkError::MalformedCall(format!(
            "expected 3 fields, got {}",
            fields.len()
        ))),
    }
}

/// Flattens calls into the `(call_array, calldata)` layout consumed by an
/// account's `__execute__` entry point. Call order is preserved.
pub fn encode(calls: &[Call]) -> (Vec<CallArrayEntry>, Vec<FieldElement>) {
    let mut call_array = Vec::with_capacity(calls.len());
    let mut calldata = Vec::new();

    for call in calls {
        call_array.push(CallArrayEntry {
            to: call.to,
            selector: get_selector_from_name(&call.selector_name),
            data_offset: FieldElement::from(calldata.len()),
            data_len: FieldElement::from(call.calldata.len()),
        });
        calldata.extend_from_slice(&call.calldata);
    }

    (call_array, calldata)
}

/// Same as [`encode`], starting from untyped calls.
pub fn encode_fields(
    calls: &[Vec<CallField>],
) -> Result<(Vec<CallArrayEntry>, Vec<FieldElement>), StarkError> {
    let calls = calls
        .iter()
        .map(|fields| call_from_fields(fields))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(encode(&calls))
}

/// A call recovered from the wire layout. Only the selector survives
/// encoding, not the entry-point name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCall {
    pub to: FieldElement,
    pub selector: FieldElement,
    pub calldata: Vec<FieldElement>,
}

/// Re-derives each call from `call_array`/`calldata` via `data_offset` and
/// `data_len`.
pub fn decode(
    call_array: &[CallArrayEntry],
    calldata: &[FieldElement],
) -> Result<Vec<DecodedCall>, StarkError> {
    call_array
        .iter()
        .map(|entry| {
            let offset = felt_to_usize(&entry.data_offset)?;
            let len = felt_to_usize(&entry.data_len)?;
            let end = offset
                .checked_add(len)
                .filter(|end| *end <= calldata.len())
                .ok_or_else(|| {
                    StarkError::MalformedCall(format!(
                        "entry [{offset}, {offset}+{len}) exceeds calldata of length {}",
                        calldata.len()
                    ))
                })?;
            Ok(DecodedCall {
                to: entry.to,
                selector: entry.selector,
                calldata: calldata[offset..end].to_vec(),
            })
        })
        .collect()
}

fn felt_to_usize(value: &FieldElement) -> Result<usize, StarkError> {
    u64::try_from(*value)
        .ok()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| StarkError::MalformedCall(format!("{value} is not a valid length")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn felt(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    fn text(s: &str) -> CallField {
        CallField::Text(s.into())
    }

    fn list(items: &[&str]) -> CallField {
        CallField::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn encode_single_transfer() {
        let calls = [Call::new(felt(0xABC), "transfer", vec![felt(0x1), felt(100)])];
        let (call_array, calldata) = encode(&calls);

        assert_eq!(call_array.len(), 1);
        assert_eq!(call_array[0].to, felt(0xABC));
        assert_eq!(call_array[0].selector, get_selector_from_name("transfer"));
        assert_eq!(call_array[0].data_offset, FieldElement::ZERO);
        assert_eq!(call_array[0].data_len, felt(2));
        assert_eq!(calldata, vec![felt(0x1), felt(100)]);
    }

    #[test]
    fn encode_tracks_running_offsets() {
        let calls = [
            Call::new(felt(1), "a", vec![felt(10), felt(11), felt(12)]),
            Call::new(felt(2), "b", vec![]),
            Call::new(felt(3), "c", vec![felt(30)]),
        ];
        let (call_array, calldata) = encode(&calls);

        let offsets: Vec<_> = call_array.iter().map(|e| e.data_offset).collect();
        let lens: Vec<_> = call_array.iter().map(|e| e.data_len).collect();
        assert_eq!(offsets, vec![felt(0), felt(3), felt(3)]);
        assert_eq!(lens, vec![felt(3), felt(0), felt(1)]);
        assert_eq!(calldata.len(), 4);
    }

    #[test]
    fn encode_empty_call_list() {
        let (call_array, calldata) = encode(&[]);
        assert!(call_array.is_empty());
        assert!(calldata.is_empty());
    }

    #[test]
    fn decode_reproduces_original_calls() {
        let calls = vec![
            Call::new(felt(0xABC), "transfer", vec![felt(1), felt(100)]),
            Call::new(felt(0xDEF), "approve", vec![felt(7)]),
            Call::new(felt(0x123), "pause", vec![]),
        ];
        let (call_array, calldata) = encode(&calls);
        let decoded = decode(&call_array, &calldata).unwrap();

        assert_eq!(decoded.len(), calls.len());
        for (original, recovered) in calls.iter().zip(&decoded) {
            assert_eq!(recovered.to, original.to);
            assert_eq!(recovered.selector, get_selector_from_name(&original.selector_name));
            assert_eq!(recovered.calldata, original.calldata);
        }
    }

    #[test]
    fn decode_rejects_out_of_bounds_entry() {
        let entry = CallArrayEntry {
            to: felt(1),
            selector: felt(2),
            data_offset: felt(1),
            data_len: felt(5),
        };
        let result = decode(&[entry], &[felt(0), felt(0)]);
        assert!(matches!(result, Err(StarkError::MalformedCall(_))));
    }

    #[test]
    fn call_from_fields_accepts_well_formed_call() {
        let call = call_from_fields(&[text("0xabc"), text("transfer"), list(&["0x1", "100"])]).unwrap();
        assert_eq!(call.to, felt(0xabc));
        assert_eq!(call.selector_name, "transfer");
        assert_eq!(call.calldata, vec![felt(1), felt(100)]);
    }

    #[test]
    fn call_from_fields_rejects_wrong_arity() {
        let result = call_from_fields(&[text("0xabc"), text("transfer")]);
        assert!(matches!(result, Err(StarkError::MalformedCall(_))));

        let result = call_from_fields(&[
            text("0xabc"),
            text("transfer"),
            list(&[]),
            list(&[]),
        ]);
        assert!(matches!(result, Err(StarkError::MalformedCall(_))));
    }

    #[test]
    fn call_from_fields_rejects_misplaced_fields() {
        let result = call_from_fields(&[text("0xabc"), list(&["1"]), text("transfer")]);
        assert!(matches!(result, Err(StarkError::MalformedCall(_))));
    }

    #[test]
    fn call_from_fields_rejects_alias_target() {
        let result = call_from_fields(&[text("token"), text("transfer"), list(&[])]);
        assert!(matches!(result, Err(StarkError::MalformedCall(_))));
    }

    #[test]
    fn encode_fields_matches_typed_encoding() {
        let typed = encode(&[Call::new(felt(0xabc), "transfer", vec![felt(1), felt(100)])]);
        let untyped =
            encode_fields(&[vec![text("0xabc"), text("transfer"), list(&["1", "0x64"])]]).unwrap();
        assert_eq!(typed, untyped);
    }
}
