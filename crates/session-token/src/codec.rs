//! Compact signed token codec.
//!
//! A token is a JWS compact serialization, `base64url(header) "."
//! base64url(payload) "." base64url(signature)`, produced and checked with
//! `jsonwebtoken`. The header carries `alg`, `typ` and the signing key's `kid`.
//!
//! # Security
//!
//! - Size is checked before any decoding
//! - The payload is not trusted until a signature has verified
//! - Only keys whose algorithm matches the header `alg` are tried, so a token
//!   cannot pick its own verification algorithm (`none` is never accepted)
//! - Time claims are left to the lifecycle manager; `jsonwebtoken` only checks
//!   the signature here
//! - Every failure maps to a generic rejection; the reason goes to debug logs

use crate::claims::ClaimSet;
use crate::errors::TokenError;
use crate::keys::{Algorithm, SigningKey};
use common::jwt::decode_header;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Header, Validation};
use std::sync::Arc;
use tracing::instrument;

/// Sign `claims` with `key`.
///
/// Encoding is deterministic: the same claim set and key always produce the
/// same token bytes.
///
/// # Errors
///
/// - `Crypto` - serialization failed or the key cannot sign
#[instrument(skip_all, fields(kid = %key.kid()))]
pub fn encode(claims: &ClaimSet, key: &SigningKey) -> Result<String, TokenError> {
    let encoding_key = key.encoding_key()?;

    let mut header = Header::new(key.algorithm().to_jwt());
    header.typ = Some(common::jwt::TOKEN_TYPE.to_string());
    header.kid = Some(key.kid().to_string());

    jsonwebtoken::encode(&header, claims, &encoding_key)
        .map_err(|e| TokenError::Crypto(format!("Token signing operation failed: {e}")))
}

/// Signature-only validation for `algorithm`. Expiry, `nbf`, audience and
/// issuer are checked by the caller against its own clock and config.
fn signature_validation(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm.to_jwt());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// Verify `token` against `keys` and return its claim set.
///
/// Keys are tried in order, restricted to those whose algorithm matches the
/// header. When the header names a `kid`, only that key is tried.
///
/// # Errors
///
/// - `Malformed` - bad shape, encoding, header, or payload
/// - `InvalidSignature` - no acceptable key verifies the signature
#[instrument(skip_all)]
pub fn decode<'a, I>(token: &str, keys: I) -> Result<ClaimSet, TokenError>
where
    I: IntoIterator<Item = &'a Arc<SigningKey>>,
{
    // Size and shape are checked here, before jsonwebtoken parses anything.
    let header = decode_header(token)?;

    let Some(algorithm) = Algorithm::from_header(&header.alg) else {
        tracing::debug!(target: "session_token.codec", alg = %header.alg, "Token rejected: unsupported algorithm");
        return Err(TokenError::Malformed);
    };

    let validation = signature_validation(algorithm);
    let mut tried = 0usize;

    let candidates = keys
        .into_iter()
        .filter(|key| key.algorithm() == algorithm)
        .filter(|key| header.kid.as_deref().map_or(true, |kid| key.kid() == kid));

    for key in candidates {
        tried += 1;
        match jsonwebtoken::decode::<ClaimSet>(token, &key.decoding_key(), &validation) {
            Ok(data) => {
                let claims = data.claims;
                claims.validate()?;
                return Ok(claims);
            }
            Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => {}
            Err(e) => {
                tracing::debug!(target: "session_token.codec", kid = %key.kid(), error = %e, "Token rejected: undecodable token");
                return Err(TokenError::Malformed);
            }
        }
    }

    if tried == 0 {
        tracing::debug!(
            target: "session_token.codec",
            alg = %header.alg,
            kid = ?header.kid,
            "Token rejected: no acceptable key for header"
        );
    } else {
        tracing::debug!(target: "session_token.codec", kid = ?header.kid, tried, "Token rejected: signature verification failed");
    }

    Err(TokenError::InvalidSignature)
}
