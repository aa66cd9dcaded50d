//! Checking and parsing webhook deliveries.
//!
//! The service signs each delivery with HMAC-SHA256 over the raw request body,
//! keyed with the secret returned when the webhook was registered, and sends
//! the hex digest in [`SIGNATURE_HEADER`].

use crate::decode::decode;
use crate::error::UpError;
use crate::models::WebhookEvent;
use hmac::{Hmac, Mac};
use log::{debug, warn};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Up-Authenticity-Signature";

/// Compare `signature` (hex) against the HMAC of `body`, in constant time.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        debug!("Webhook signature is not valid hex");
        return false;
    };
    // HMAC accepts keys of any length.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Hex HMAC-SHA256 of `body`, as the service would send it.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, UpError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| UpError::Config("webhook secret is not a usable HMAC key"))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a delivery and decode it.
pub fn parse_event(secret: &[u8], body: &[u8], signature: &str) -> Result<WebhookEvent, UpError> {
    if !verify_signature(secret, body, signature) {
        warn!("Rejected webhook delivery with bad signature");
        return Err(UpError::InvalidSignature);
    }
    let event: WebhookEvent = decode(body)?;
    debug!(
        "Accepted webhook event {} ({})",
        event.data.id, event.data.attributes.event_type
    );
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WebhookEventType;

    const SECRET: &[u8] = b"webhook-secret";

    fn ping_body() -> Vec<u8> {
        serde_json::json!({
            "data": {
                "type": "webhook-events",
                "id": "evt-1",
                "attributes": { "eventType": "PING", "createdAt": "2021-01-01T10:00:00+10:00" },
                "relationships": {
                    "webhook": {
                        "data": { "type": "webhooks", "id": "wh-1" },
                        "links": { "related": "https://api.up.com.au/api/v1/webhooks/wh-1" }
                    }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn known_digest() {
        // RFC 4231 test case 2.
        assert_eq!(
            sign(b"Jefe", b"what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn accepts_matching_signature() {
        let body = ping_body();
        let signature = sign(SECRET, &body).unwrap();
        assert!(verify_signature(SECRET, &body, &signature));
        assert!(verify_signature(SECRET, &body, &signature.to_uppercase()));
    }

    #[test]
    fn rejects_tampered_body_or_garbage() {
        let body = ping_body();
        let signature = sign(SECRET, &body).unwrap();
        assert!(!verify_signature(SECRET, b"{}", &signature));
        assert!(!verify_signature(b"other", &body, &signature));
        assert!(!verify_signature(SECRET, &body, "zz"));
        assert!(!verify_signature(SECRET, &body, "abc"));
        assert!(!verify_signature(SECRET, &body, "é5"));
    }

    #[test]
    fn accepts_signature_with_surrounding_whitespace() {
        let body = ping_body();
        let signature = format!("  {}\n", sign(SECRET, &body).unwrap());
        assert!(verify_signature(SECRET, &body, &signature));
        // A truncated digest is valid hex but must not verify.
        assert!(!verify_signature(SECRET, &body, &signature.trim()[..62]));
    }

    #[test]
    fn parses_verified_ping() {
        let body = ping_body();
        let event = parse_event(SECRET, &body, &sign(SECRET, &body).unwrap()).unwrap();
        assert_eq!(event.data.attributes.event_type, WebhookEventType::Ping);
        assert_eq!(event.data.relationships.webhook.data.id, "wh-1");
    }

    #[test]
    fn bad_signature_is_an_error() {
        let err = parse_event(SECRET, &ping_body(), "00").unwrap_err();
        assert!(matches!(err, UpError::InvalidSignature));
    }
}
