//! Meta `signed_request` verification.
//!
//! Data-deletion callbacks arrive as `<base64url-signature>.<base64url-json>`
//! where the signature is HMAC-SHA256 over the raw payload segment using the
//! app secret. The payload's `user_id` is the app-scoped Facebook user id.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Decoded payload of a verified deletion request.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletionPayload {
    /// App-scoped Facebook user id the request concerns.
    pub user_id: Option<String>,
    /// Signature algorithm as declared by the sender.
    #[serde(default)]
    pub algorithm: Option<String>,
}

#[derive(Debug, Error)]
pub enum SignedRequestError {
    #[error("malformed signed_request: {0}")]
    Malformed(String),

    #[error("signature mismatch")]
    BadSignature,

    #[error("payload is not valid JSON: {0}")]
    BadPayload(String),
}

/// Verify and decode a Meta `signed_request`.
///
/// The signature bytes are compared against a fresh HMAC over the payload
/// segment; any structural defect is `Malformed`, a verification failure is
/// `BadSignature`.
pub fn parse_signed_request(
    raw: &str,
    app_secret: &str,
) -> Result<DeletionPayload, SignedRequestError> {
    let (encoded_sig, encoded_payload) = raw
        .split_once('.')
        .ok_or_else(|| SignedRequestError::Malformed("expected <sig>.<payload>".into()))?;

    if encoded_sig.is_empty() || encoded_payload.is_empty() {
        return Err(SignedRequestError::Malformed("empty segment".into()));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(encoded_sig.trim_end_matches('='))
        .map_err(|e| SignedRequestError::Malformed(format!("signature base64: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|e| SignedRequestError::Malformed(format!("hmac key: {e}")))?;
    mac.update(encoded_payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| SignedRequestError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD
        .decode(encoded_payload.trim_end_matches('='))
        .map_err(|e| SignedRequestError::Malformed(format!("payload base64: {e}")))?;

    serde_json::from_slice(&payload).map_err(|e| SignedRequestError::BadPayload(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "test-app-secret";

    /// Build a validly signed request for a JSON payload string.
    fn sign(payload_json: &str, secret: &str) -> String {
        let encoded_payload = URL_SAFE_NO_PAD.encode(payload_json);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(encoded_payload.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{sig}.{encoded_payload}")
    }

    #[test]
    fn valid_request_decodes_user_id() {
        let raw = sign(r#"{"user_id":"999","algorithm":"HMAC-SHA256"}"#, SECRET);
        let payload = parse_signed_request(&raw, SECRET).unwrap();
        assert_eq!(payload.user_id.as_deref(), Some("999"));
        assert_eq!(payload.algorithm.as_deref(), Some("HMAC-SHA256"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let raw = sign(r#"{"user_id":"999"}"#, SECRET);
        let err = parse_signed_request(&raw, "other-secret").unwrap_err();
        assert!(matches!(err, SignedRequestError::BadSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let raw = sign(r#"{"user_id":"999"}"#, SECRET);
        let (sig, _) = raw.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(r#"{"user_id":"1000"}"#);
        let err = parse_signed_request(&format!("{sig}.{forged_payload}"), SECRET).unwrap_err();
        assert!(matches!(err, SignedRequestError::BadSignature));
    }

    #[test]
    fn missing_dot_is_malformed() {
        let err = parse_signed_request("nodothere", SECRET).unwrap_err();
        assert!(matches!(err, SignedRequestError::Malformed(_)));
    }

    #[test]
    fn garbage_base64_is_malformed() {
        let err = parse_signed_request("!!!.###", SECRET).unwrap_err();
        assert!(matches!(err, SignedRequestError::Malformed(_)));
    }

    #[test]
    fn payload_without_user_id_still_parses() {
        let raw = sign(r#"{"algorithm":"HMAC-SHA256"}"#, SECRET);
        let payload = parse_signed_request(&raw, SECRET).unwrap();
        assert!(payload.user_id.is_none());
    }
}
