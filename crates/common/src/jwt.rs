//! Compact token format utilities shared by session token producers and
//! verifiers.
//!
//! Signing and signature checks go through `jsonwebtoken`. This module only
//! looks at the *shape* of a token before that happens:
//! - Size limits for DoS prevention
//! - Clock skew constants for `nbf` leeway
//! - Splitting a token into header, payload, and signature segments
//! - Header parsing and key ID extraction, for routing a token to its key
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned here is trusted: callers MUST verify the signature
//!   before using any claim
//! - Error messages are generic; details go to debug logs
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::decode_header;
//!
//! let header = decode_header(token)?;
//! // pick keys by header.alg / header.kid, then verify with jsonwebtoken
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// Tokens larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. A session token with typical claims is ~300 bytes.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Default `nbf` leeway: none. Tokens become valid exactly at `nbf`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum configurable clock skew tolerance (10 minutes).
///
/// Prevents misconfiguration that would let tokens be used long before
/// their `nbf`.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// The only `typ` header value accepted.
pub const TOKEN_TYPE: &str = "JWT";

// =============================================================================
// Error Types
// =============================================================================

/// Errors produced while taking a compact token apart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompactFormatError {
    /// Token size exceeds [`MAX_TOKEN_SIZE_BYTES`].
    #[error("The session token is invalid or expired")]
    TokenTooLarge,

    /// Token is not three non-empty dot-separated base64url segments.
    #[error("The session token is invalid or expired")]
    MalformedToken,

    /// Header segment is not valid unpadded base64url.
    #[error("The session token is invalid or expired")]
    InvalidEncoding,

    /// Header is not the expected JSON object.
    #[error("The session token is invalid or expired")]
    InvalidHeader,

    /// Header is missing a non-empty `kid`.
    #[error("The session token is invalid or expired")]
    MissingKid,
}

// =============================================================================
// Segments
// =============================================================================

/// Borrowed view of the three segments of a compact token.
#[derive(Debug, Clone, Copy)]
pub struct TokenParts<'a> {
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
}

impl<'a> TokenParts<'a> {
    /// Base64url header segment.
    #[must_use]
    pub fn header(&self) -> &'a str {
        self.header
    }

    /// Base64url payload segment.
    #[must_use]
    pub fn payload(&self) -> &'a str {
        self.payload
    }

    /// Base64url signature segment.
    #[must_use]
    pub fn signature(&self) -> &'a str {
        self.signature
    }
}

fn is_base64url_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

/// Split a token into its three segments.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_TOKEN_SIZE_BYTES`]
/// - `MalformedToken` - not exactly three non-empty segments of unpadded
///   base64url characters
pub fn split_token(token: &str) -> Result<TokenParts<'_>, CompactFormatError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(CompactFormatError::TokenTooLarge);
    }

    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(target: "common.jwt", "Token rejected: expected three segments");
        return Err(CompactFormatError::MalformedToken);
    };

    if [header, payload, signature]
        .iter()
        .any(|segment| segment.is_empty() || !segment.bytes().all(is_base64url_byte))
    {
        tracing::debug!(target: "common.jwt", "Token rejected: empty or non-base64url segment");
        return Err(CompactFormatError::MalformedToken);
    }

    Ok(TokenParts {
        header,
        payload,
        signature,
    })
}

// =============================================================================
// Header
// =============================================================================

/// Unverified protected header of a compact token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Signature algorithm as written by the producer.
    pub alg: String,

    /// Token type; `JWT` when present.
    #[serde(default)]
    pub typ: Option<String>,

    /// Key ID of the signing key.
    #[serde(default)]
    pub kid: Option<String>,
}

/// Size-check, split, and parse the header of `token`.
///
/// # Errors
///
/// - Any [`split_token`] error
/// - `InvalidEncoding` - header is not canonical base64url
/// - `InvalidHeader` - header is not JSON, lacks `alg`, or has a `typ` other than `JWT`
pub fn decode_header(token: &str) -> Result<TokenHeader, CompactFormatError> {
    let parts = split_token(token)?;

    let header_bytes = URL_SAFE_NO_PAD.decode(parts.header()).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token header");
        CompactFormatError::InvalidEncoding
    })?;

    let header: TokenHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse token header JSON");
        CompactFormatError::InvalidHeader
    })?;

    if let Some(typ) = &header.typ {
        if typ != TOKEN_TYPE {
            tracing::debug!(target: "common.jwt", typ = %typ, "Token rejected: unexpected typ");
            return Err(CompactFormatError::InvalidHeader);
        }
    }

    Ok(header)
}

/// Extract the `kid` from a token header without verifying the signature.
///
/// Used for routing a token to the right key; the token MUST still be
/// verified afterwards.
///
/// # Errors
///
/// Any [`decode_header`] error, or `MissingKid` when the header has no
/// non-empty `kid`.
pub fn extract_kid(token: &str) -> Result<String, CompactFormatError> {
    decode_header(token)?
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(CompactFormatError::MissingKid)
}

// =============================================================================
// Tests
// =============================================================================
