//! Webhook signature verification.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Zendesk signature header (base64 HMAC-SHA256).
pub const ZENDESK_SIGNATURE_HEADER: &str = "x-zendesk-webhook-signature";
/// Zendesk signature timestamp header.
pub const ZENDESK_TIMESTAMP_HEADER: &str = "x-zendesk-webhook-signature-timestamp";
/// HubSpot v1 signature header (hex SHA-256).
pub const HUBSPOT_SIGNATURE_HEADER: &str = "x-hubspot-signature";

/// Verify a Zendesk webhook signature.
///
/// Zendesk signs `timestamp + body` with HMAC-SHA256 and sends the digest
/// base64-encoded.
#[must_use]
pub fn verify_zendesk_signature(body: &[u8], timestamp: &str, signature: &str, secret: &str) -> bool {
    let Ok(signature_bytes) = STANDARD.decode(signature.trim()) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// Verify a HubSpot v1 webhook signature.
///
/// The signature is the hex SHA-256 of `client_secret + body`.
#[must_use]
pub fn verify_hubspot_signature(body: &[u8], signature: &str, client_secret: &str) -> bool {
    let Ok(signature_bytes) = hex::decode(signature.trim()) else {
        return false;
    };

    let mut hasher = Sha256::new();
    hasher.update(client_secret.as_bytes());
    hasher.update(body);
    let computed = hasher.finalize();

    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// Compute a Zendesk signature (for tests and local tooling).
#[must_use]
pub fn sign_zendesk(body: &[u8], timestamp: &str, secret: &str) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.as_bytes());
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Compute a HubSpot v1 signature (for tests and local tooling).
#[must_use]
pub fn sign_hubspot(body: &[u8], client_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(client_secret.as_bytes());
    hasher.update(body);
    hex::encode(hasher.finalize())
}
