use starknet_crypto::{get_public_key, rfc6979_generate_k, sign, verify, SignError};
use starknet_ff::FieldElement;
use zeroize::Zeroizing;

use crate::call::{call_from_fields, encode, Call, CallArrayEntry, CallField};
use crate::error::StarkError;
use crate::hash::get_transaction_hash;

/// Order of the Stark curve, big-endian. Valid private keys lie in `[1, n)`.
const EC_ORDER_BE: [u8; 32] = [
    0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xb7, 0x81, 0x12, 0x6d, 0xca, 0xe7, 0xb2, 0x32, 0x1e, 0x66, 0xa2, 0x41, 0xad, 0xc6, 0x4d, 0x2f,
];

/// Upper bound on RFC 6979 retries. A single retry is already astronomically
/// unlikely.
const MAX_NONCE_ATTEMPTS: u64 = 64;

/// A Stark ECDSA signature `(r, s)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: FieldElement,
    pub s: FieldElement,
}

impl Signature {
    /// The two felts as they appear in a transaction's `signature` field.
    pub fn to_felts(&self) -> [FieldElement; 2] {
        [self.r, self.s]
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "0x{}{}",
            hex::encode(self.r.to_bytes_be()),
            hex::encode(self.s.to_bytes_be())
        )
    }
}

/// A signed invoke: the encoded calls plus the signature over their hash.
#[derive(Debug, Clone)]
pub struct SignedInvoke {
    pub call_array: Vec<CallArrayEntry>,
    pub calldata: Vec<FieldElement>,
    pub transaction_hash: FieldElement,
    pub signature: Signature,
}

/// Holds an account private key. The key bytes are zeroized on drop.
pub struct Signer {
    key_bytes: Zeroizing<[u8; 32]>,
    public_key: FieldElement,
}

impl Signer {
    /// Creates a signer from a private key scalar.
    ///
    /// Rejects zero and anything at or above the curve order.
    pub fn new(private_key: FieldElement) -> Result<Self, StarkError> {
        let key_bytes = Zeroizing::new(private_key.to_bytes_be());
        if key_bytes.iter().all(|b| *b == 0) {
            return Err(StarkError::InvalidPrivateKey("key is zero".into()));
        }
        if *key_bytes >= EC_ORDER_BE {
            return Err(StarkError::InvalidPrivateKey(
                "key is not below the curve order".into(),
            ));
        }

        let public_key = get_public_key(&private_key);
        Ok(Self {
            key_bytes,
            public_key,
        })
    }

    /// Creates a signer from a numeric token (decimal or `0x` hex).
    pub fn from_token(token: &str) -> Result<Self, StarkError> {
        let key = crate::felt::parse_felt(token)
            .map_err(|e| StarkError::InvalidPrivateKey(e.to_string()))?;
        Self::new(key)
    }

    /// Public key (x coordinate of `key * G`).
    pub fn public_key(&self) -> FieldElement {
        self.public_key
    }

    fn private_key(&self) -> Result<FieldElement, StarkError> {
        FieldElement::from_bytes_be(&self.key_bytes)
            .map_err(|e| StarkError::InvalidPrivateKey(e.to_string()))
    }

    /// Signs a message hash with a deterministic RFC 6979 nonce.
    ///
    /// When the derived nonce yields an invalid signature, the extra seed is
    /// bumped and a fresh nonce is derived.
    pub fn sign(&self, message_hash: &FieldElement) -> Result<Signature, StarkError> {
        let private_key = self.private_key()?;
        let mut seed: Option<FieldElement> = None;

        let mut result = Err(StarkError::SigningError("no valid nonce found".into()));
        for _ in 0..MAX_NONCE_ATTEMPTS {
            let k = rfc6979_generate_k(message_hash, &private_key, seed.as_ref());
            match sign(&private_key, message_hash, &k) {
                Ok(sig) => {
                    result = Ok(Signature { r: sig.r, s: sig.s });
                    break;
                }
                Err(SignError::InvalidK) => {
                    seed = Some(match seed {
                        Some(prev) => prev + FieldElement::ONE,
                        None => FieldElement::ONE,
                    });
                }
                Err(SignError::InvalidMessageHash) => {
                    result = Err(StarkError::SigningError(format!(
                        "message hash {message_hash:#x} is out of range"
                    )));
                    break;
                }
            }
        }

        result
    }

    /// Checks `signature` over `message_hash` against this signer's public key.
    pub fn verify(&self, message_hash: &FieldElement, signature: &Signature) -> bool {
        verify_signature(&self.public_key, message_hash, signature)
    }

    /// Encodes `calls`, hashes them as an invoke transaction and signs the
    /// hash.
    pub fn sign_transaction(
        &self,
        sender: FieldElement,
        calls: &[Call],
        nonce: FieldElement,
        max_fee: FieldElement,
        chain_id: FieldElement,
    ) -> Result<SignedInvoke, StarkError> {
        let (call_array, calldata) = encode(calls);
        let transaction_hash =
            get_transaction_hash(sender, &call_array, &calldata, nonce, max_fee, chain_id);
        let signature = self.sign(&transaction_hash)?;
        Ok(SignedInvoke {
            call_array,
            calldata,
            transaction_hash,
            signature,
        })
    }

    /// Like [`Signer::sign_transaction`], starting from untyped calls. A call
    /// that does not have the `(target, selector, arguments)` shape fails with
    /// [`StarkError::InvalidCallShape`] before anything is hashed.
    pub fn sign_raw_transaction(
        &self,
        sender: FieldElement,
        calls: &[Vec<CallField>],
        nonce: FieldElement,
        max_fee: FieldElement,
        chain_id: FieldElement,
    ) -> Result<SignedInvoke, StarkError> {
        let calls = calls
            .iter()
            .enumerate()
            .map(|(i, fields)| {
                call_from_fields(fields)
                    .map_err(|e| StarkError::InvalidCallShape(format!("call {i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.sign_transaction(sender, &calls, nonce, max_fee, chain_id)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("public_key", &format_args!("{:#x}", self.public_key))
            .finish_non_exhaustive()
    }
}

/// Verifies a signature against an arbitrary public key. Malformed inputs
/// verify as `false`.
pub fn verify_signature(
    public_key: &FieldElement,
    message_hash: &FieldElement,
    signature: &Signature,
) -> bool {
    verify(public_key, message_hash, &signature.r, &signature.s).unwrap_or(false)
}
