//! Observability for the session token core.
//!
//! # Privacy by Default
//!
//! Instrumentation uses `#[instrument(skip_all)]` and explicit field
//! allow-listing. Fields fall into three groups:
//! - **SAFE**: logged in plaintext (error codes, key IDs, timestamps)
//! - **HASHED**: SHA-256 truncated for correlation (subject IDs)
//! - **NEVER**: must not appear in logs (tokens, secrets, session tokens)

pub mod metrics;

use crate::errors::TokenError;
use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// This is a one-way correlation handle, not a secret-grade hash. The
/// truncation limits reversibility while keeping log lines joinable.
#[must_use]
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Token is structurally bad or its signature does not verify
    Cryptographic,
    /// Token verified but is outside its validity window or revoked
    Validity,
    /// Refresh policy refused a valid token
    Policy,
    /// Key store, registry, or signing failure
    Internal,
}

impl ErrorCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Cryptographic => "cryptographic",
            ErrorCategory::Validity => "validity",
            ErrorCategory::Policy => "policy",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&TokenError> for ErrorCategory {
    fn from(err: &TokenError) -> Self {
        match err {
            TokenError::Malformed | TokenError::InvalidSignature | TokenError::InvalidIssuer => {
                ErrorCategory::Cryptographic
            }
            TokenError::Expired | TokenError::NotYetValid | TokenError::Revoked => {
                ErrorCategory::Validity
            }
            TokenError::RefreshNotEligible
            | TokenError::SessionLifetimeExceeded
            | TokenError::InvalidPrincipal(_) => ErrorCategory::Policy,
            TokenError::RegistryUnavailable(_)
            | TokenError::KeyUnavailable(_)
            | TokenError::Crypto(_) => ErrorCategory::Internal,
        }
    }
}
