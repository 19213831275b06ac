//! Token classification and field element normalization.
//!
//! Every address, hash or positional parameter that enters the toolkit as text
//! goes through [`classify`] first. Numeric tokens are normalized to a canonical
//! [`FieldElement`]; everything else is an alias (or, inside calldata, a short
//! string).

use starknet_ff::FieldElement;

use crate::error::StarkError;

/// Maximum length of a Cairo short string.
pub const MAX_SHORT_STRING_LEN: usize = 31;

/// How a user-supplied token should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Parses fully as a base-10 integer.
    Decimal,
    /// `0x`-prefixed hexadecimal integer.
    HexInt,
    /// Anything else.
    Alias,
}

/// Classifies a token. Total: any parse failure falls through to
/// [`TokenKind::Alias`].
pub fn classify(token: &str) -> TokenKind {
    if is_decimal(token) {
        TokenKind::Decimal
    } else if is_hex(token) {
        TokenKind::HexInt
    } else {
        TokenKind::Alias
    }
}

/// Returns `true` when the token is neither a decimal nor a hex integer.
pub fn is_alias(token: &str) -> bool {
    classify(token) == TokenKind::Alias
}

fn is_decimal(token: &str) -> bool {
    let digits = token
        .strip_prefix('-')
        .or_else(|| token.strip_prefix('+'))
        .unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_hex(token: &str) -> bool {
    match token.strip_prefix("0x") {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// Normalizes a numeric token to its canonical field element.
///
/// Negative decimals wrap to `p - |x|`, the way Cairo represents them.
pub fn parse_felt(token: &str) -> Result<FieldElement, StarkError> {
    match classify(token) {
        TokenKind::Decimal => {
            let (negative, digits) = match token.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, token.strip_prefix('+').unwrap_or(token)),
            };
            let value = FieldElement::from_dec_str(digits)
                .map_err(|e| StarkError::InvalidNumber(format!("{token}: {e}")))?;
            Ok(if negative { -value } else { value })
        }
        TokenKind::HexInt => {
            let digits = token[2..].trim_start_matches('0');
            let digits = if digits.is_empty() { "0" } else { digits };
            FieldElement::from_hex_be(digits)
                .map_err(|e| StarkError::InvalidNumber(format!("{token}: {e}")))
        }
        TokenKind::Alias => Err(StarkError::NotANumber(token.to_string())),
    }
}

/// Encodes an ASCII short string as a field element (big-endian bytes).
pub fn str_to_felt(text: &str) -> Result<FieldElement, StarkError> {
    if !text.is_ascii() {
        return Err(StarkError::InvalidShortString(format!(
            "{text:?} is not ASCII"
        )));
    }
    if text.len() > MAX_SHORT_STRING_LEN {
        return Err(StarkError::InvalidShortString(format!(
            "{text:?} is longer than {MAX_SHORT_STRING_LEN} characters"
        )));
    }
    FieldElement::from_byte_slice_be(text.as_bytes())
        .map_err(|e| StarkError::InvalidShortString(e.to_string()))
}

/// Converts positional parameters into calldata.
///
/// Numbers are normalized, aliases are encoded as short strings.
pub fn prepare_params<S: AsRef<str>>(params: &[S]) -> Result<Vec<FieldElement>, StarkError> {
    params
        .iter()
        .map(|param| {
            let param = param.as_ref();
            match classify(param) {
                TokenKind::Alias => str_to_felt(param),
                _ => parse_felt(param),
            }
        })
        .collect()
}

/// Renders a field element as a `0x`-prefixed lowercase hex string without
/// leading zeros.
pub fn to_hex(value: &FieldElement) -> String {
    format!("{value:#x}")
}
