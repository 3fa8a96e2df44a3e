//! LINE webhook signature verification.
//!
//! LINE signs each delivery with HMAC-SHA256 over the raw request body,
//! keyed by the channel secret, and sends the base64 digest in the
//! `x-line-signature` header.
//! Reference: https://developers.line.biz/en/docs/messaging-api/receiving-messages/#verifying-signatures

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Verify a LINE webhook signature.
///
/// # Arguments
///
/// * `channel_secret` - The channel secret from the LINE console
/// * `body` - The raw request body, exactly as received
/// * `signature` - The `x-line-signature` header value
///
/// # Returns
///
/// `true` only if the signature matches. An empty secret never matches.
pub fn verify_line_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    if channel_secret.is_empty() || signature.is_empty() {
        warn!(
            has_channel_secret = !channel_secret.is_empty(),
            has_signature = !signature.is_empty(),
            "line_signature_missing_fields"
        );
        return false;
    }

    let provided = match STANDARD.decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(signature_length = signature.len(), "line_signature_not_base64");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("line_signature_invalid_key");
            return false;
        }
    };

    mac.update(body);

    // Constant-time comparison
    let valid = mac.verify_slice(&provided).is_ok();

    if !valid {
        warn!(
            body_length = body.len(),
            provided_length = provided.len(),
            "line_signature_mismatch"
        );
    }

    valid
}

/// Compute the signature LINE would send for `body`.
pub fn sign_body(channel_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}
