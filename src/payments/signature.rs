use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Lowercase hex HMAC-SHA512 of `payload` keyed with `secret`.
///
/// Returns `None` for an empty secret.
pub fn compute_signature(payload: &[u8], secret: &str) -> Option<String> {
    if secret.is_empty() {
        return None;
    }
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Check an `x-paystack-signature` header value against the raw request body.
///
/// Every failure path (bad secret, wrong length, wrong digest) returns
/// `false`. The digest comparison is constant-time so response timing does
/// not reveal how many leading bytes of a forged signature were correct.
pub fn verify_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let Some(expected) = compute_signature(payload, secret) else {
        return false;
    };

    let expected_bytes = expected.as_bytes();
    let provided_bytes = signature.as_bytes();

    // Length is not secret: a SHA-512 hex digest is always 128 chars
    if expected_bytes.len() != provided_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(provided_bytes).into()
}
