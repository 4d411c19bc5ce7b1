//! Custom test assertions for expressive tests
//!
//! Inspects tokens without verifying them, for checks on the wire shape.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::{decode_header, TokenHeader};
use serde_json::Value;

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("token has no segment {index}"));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("segment {index} is not base64url: {e}"))
}

fn header(token: &str) -> TokenHeader {
    decode_header(token).unwrap_or_else(|e| panic!("Failed to parse token header: {e:?}"))
}

fn payload(token: &str) -> Value {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse token payload JSON")
}

/// Custom assertions for session tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_compact_format()
///     .assert_signed_by("k2")
///     .assert_for_subject("user-0001");
/// ```
pub trait TokenAssertions {
    /// Assert three base64url segments with a parseable header and payload
    fn assert_compact_format(&self) -> &Self;

    /// Assert the header names key `kid`
    fn assert_signed_by(&self, kid: &str) -> &Self;

    /// Assert the header names algorithm `alg`
    fn assert_algorithm(&self, alg: &str) -> &Self;

    /// Assert the `uid` claim
    fn assert_for_subject(&self, subject_id: &str) -> &Self;

    /// Assert the `exp` claim
    fn assert_expires_at(&self, timestamp: i64) -> &Self;

    /// Assert the `iat` claim
    fn assert_issued_at(&self, timestamp: i64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_compact_format(&self) -> &Self {
        assert_eq!(
            self.split('.').count(),
            3,
            "Token must have 3 parts (header.payload.signature)"
        );
        assert!(
            self.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')),
            "Token must only contain base64url characters and dots"
        );

        let header = header(self);
        assert_eq!(header.typ.as_deref(), Some("JWT"), "Expected JWT type");
        assert!(
            header.kid.is_some_and(|kid| !kid.is_empty()),
            "Expected a key ID"
        );
        assert!(payload(self).is_object(), "Payload must be a JSON object");
        assert!(!segment(self, 2).is_empty(), "Signature must not be empty");
        self
    }

    fn assert_signed_by(&self, kid: &str) -> &Self {
        assert_eq!(
            header(self).kid.as_deref(),
            Some(kid),
            "Token signed by unexpected key"
        );
        self
    }

    fn assert_algorithm(&self, alg: &str) -> &Self {
        assert_eq!(header(self).alg, alg, "Token uses unexpected algorithm");
        self
    }

    fn assert_for_subject(&self, subject_id: &str) -> &Self {
        assert_eq!(payload(self)["uid"], subject_id, "Token for unexpected subject");
        self
    }

    fn assert_expires_at(&self, timestamp: i64) -> &Self {
        assert_eq!(payload(self)["exp"], timestamp, "Unexpected expiry");
        self
    }

    fn assert_issued_at(&self, timestamp: i64) -> &Self {
        assert_eq!(payload(self)["iat"], timestamp, "Unexpected issued-at");
        self
    }
}
