//! Bearer token payload decoding
//!
//! Tokens are `header.payload.signature`. Only the payload is read, and only
//! as advisory client-side data: the signature is never checked here, the
//! backend re-validates every request.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;

/// Padding and trailing bits are optional, as in a browser's `atob`.
const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Expected 3 token segments, found {0}")]
    SegmentCount(usize),

    #[error("Payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,
}

/// Claims read from the middle segment of a token
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPayload {
    /// `username` claim, when it is a string
    pub username: Option<String>,
    /// `exp` claim in Unix seconds, when it is a number
    pub exp: Option<f64>,
}

impl TokenPayload {
    /// A token is live only while `exp` is strictly after `now`.
    /// A missing or non-numeric `exp` counts as expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.exp {
            Some(exp) => exp <= now as f64,
            None => true,
        }
    }
}

/// Decode the payload segment of a token without verifying it
pub fn decode_payload(token: &str) -> Result<TokenPayload, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    let raw = decode_segment(segments[1])?;
    let claims = match serde_json::from_slice::<Value>(&raw)? {
        Value::Object(map) => map,
        _ => return Err(DecodeError::NotAnObject),
    };

    let username = claims
        .get("username")
        .and_then(Value::as_str)
        .map(String::from);
    let exp = claims.get("exp").and_then(Value::as_f64);

    Ok(TokenPayload { username, exp })
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    // Issued tokens use the URL-safe alphabet; plain base64 is accepted too.
    match STANDARD_LENIENT.decode(segment) {
        Ok(bytes) => Ok(bytes),
        Err(standard_err) => URL_SAFE_LENIENT.decode(segment).map_err(|_| standard_err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "header.eyJ1c2VybmFtZSI6ImFsaWNlIiwiZXhwIjo5OTk5OTk5OTk5fQ.sig";

    fn token_with(payload: &str) -> String {
        format!("h.{}.s", URL_SAFE_LENIENT.encode(payload))
    }

    #[test]
    fn test_decode_unpadded_payload() {
        let payload = decode_payload(ALICE).unwrap();
        assert_eq!(payload.username.as_deref(), Some("alice"));
        assert_eq!(payload.exp, Some(9_999_999_999.0));
        assert!(!payload.is_expired_at(1_700_000_000));
    }

    #[test]
    fn test_segment_count() {
        assert!(matches!(decode_payload("only.two"), Err(DecodeError::SegmentCount(2))));
        assert!(matches!(decode_payload("a.b.c.d"), Err(DecodeError::SegmentCount(4))));
        assert!(matches!(decode_payload(""), Err(DecodeError::SegmentCount(1))));
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(decode_payload("h.!!!.s"), Err(DecodeError::Base64(_))));
        assert!(matches!(decode_payload(&token_with("not json")), Err(DecodeError::Json(_))));
        assert!(matches!(decode_payload(&token_with("[1,2]")), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn test_url_safe_alphabet() {
        // encodes with a `-`, which plain base64 rejects
        let token = token_with(r#"{"username":"~~~","exp":10}"#);
        let payload = decode_payload(&token).unwrap();
        assert_eq!(payload.username.as_deref(), Some("~~~"));
    }

    #[test]
    fn test_expiry_boundary() {
        let payload = decode_payload(&token_with(r#"{"exp":100}"#)).unwrap();
        assert!(!payload.is_expired_at(99));
        assert!(payload.is_expired_at(100));
        assert!(payload.is_expired_at(101));
    }

    #[test]
    fn test_missing_or_bad_exp() {
        let payload = decode_payload(&token_with(r#"{"username":"bob"}"#)).unwrap();
        assert!(payload.is_expired_at(0));

        let payload = decode_payload(&token_with(r#"{"exp":"tomorrow"}"#)).unwrap();
        assert_eq!(payload.exp, None);
        assert!(payload.is_expired_at(0));
    }
}
