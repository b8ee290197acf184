use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Header carrying the HMAC-SHA256 signature (`sha256=<hex>`).
pub const SIGNATURE_256_HEADER: &str = "x-hub-signature-256";
/// Legacy header carrying the HMAC-SHA1 signature (`sha1=<hex>`).
pub const SIGNATURE_SHA1_HEADER: &str = "x-hub-signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Sha256,
    Sha1,
}

impl SignatureScheme {
    fn prefix(self) -> &'static str {
        match self {
            SignatureScheme::Sha256 => "sha256=",
            SignatureScheme::Sha1 => "sha1=",
        }
    }
}

/// Verify a GitHub webhook signature header against the raw payload.
///
/// GitHub signs with the shared webhook secret and sends `<algorithm>=<hex>`;
/// the prefix must match `scheme`.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
    scheme: SignatureScheme,
) -> Result<()> {
    let signature_hex = signature_header
        .strip_prefix(scheme.prefix())
        .ok_or_else(|| {
            AppError::Unauthorized(format!("Missing {} prefix", scheme.prefix()))
        })?;

    let signature_bytes = hex::decode(signature_hex)
        .map_err(|e| AppError::Unauthorized(format!("Invalid hex in signature: {e}")))?;

    match scheme {
        SignatureScheme::Sha256 => verify_mac::<HmacSha256>(secret, payload, &signature_bytes),
        SignatureScheme::Sha1 => verify_mac::<HmacSha1>(secret, payload, &signature_bytes),
    }
}

fn verify_mac<M>(secret: &str, payload: &[u8], expected: &[u8]) -> Result<()>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as KeyInit>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Unauthorized(format!("Invalid HMAC key: {e}")))?;

    mac.update(payload);

    mac.verify_slice(expected)
        .map_err(|_| AppError::Unauthorized("Signature mismatch".to_string()))
}

#[cfg(test)]
pub(crate) fn sign_sha256(secret: &str, payload: &[u8]) -> String {
    let mut mac = <HmacSha256 as KeyInit>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
