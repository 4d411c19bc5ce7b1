use common::jwt::CompactFormatError;
use thiserror::Error;

/// Generic message for every token rejection. Callers may show this to end
/// users; the precise reason is only available via [`TokenError::code`] and
/// debug logs.
pub const TOKEN_REJECTED_MESSAGE: &str = "The session token is invalid or expired";

/// Per-request errors produced while issuing, verifying, or refreshing tokens.
///
/// Every variant is a terminal verdict for the token value involved; none of
/// them is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token does not split into header/payload/signature, or a decoded field
    /// is structurally invalid.
    #[error("The session token is invalid or expired")]
    Malformed,

    /// Signature does not match any acceptable key.
    #[error("The session token is invalid or expired")]
    InvalidSignature,

    /// `now > expires_at`.
    #[error("The session token is invalid or expired")]
    Expired,

    /// `now < not_before` (after clock skew leeway).
    #[error("The session token is invalid or expired")]
    NotYetValid,

    /// Refresh attempted before the trailing refresh window opened.
    #[error("The session token is invalid or expired")]
    RefreshNotEligible,

    /// The bound session was revoked in the session registry.
    #[error("The session token is invalid or expired")]
    Revoked,

    /// Correctly signed token from a different issuer.
    #[error("The session token is invalid or expired")]
    InvalidIssuer,

    /// Refresh refused because the session reached its maximum lifetime.
    #[error("The session token is invalid or expired")]
    SessionLifetimeExceeded,

    /// Principal cannot be bound into a token (empty subject id).
    #[error("Invalid principal: {0}")]
    InvalidPrincipal(String),

    /// Session registry lookup failed; access is denied.
    #[error("Session registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// No usable signing key.
    #[error("Signing key unavailable: {0}")]
    KeyUnavailable(String),

    /// Signing operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),
}

impl TokenError {
    /// Stable label for logs and metrics. Never shown to end users.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Expired => "expired",
            TokenError::NotYetValid => "not_yet_valid",
            TokenError::RefreshNotEligible => "refresh_not_eligible",
            TokenError::Revoked => "revoked",
            TokenError::InvalidIssuer => "invalid_issuer",
            TokenError::SessionLifetimeExceeded => "session_lifetime_exceeded",
            TokenError::InvalidPrincipal(_) => "invalid_principal",
            TokenError::RegistryUnavailable(_) => "registry_unavailable",
            TokenError::KeyUnavailable(_) => "key_unavailable",
            TokenError::Crypto(_) => "crypto",
        }
    }

    /// True for verdicts about the presented token, false for server-side
    /// faults (key store, registry, signing).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TokenError::Malformed
                | TokenError::InvalidSignature
                | TokenError::Expired
                | TokenError::NotYetValid
                | TokenError::RefreshNotEligible
                | TokenError::Revoked
                | TokenError::InvalidIssuer
                | TokenError::SessionLifetimeExceeded
        )
    }
}

impl From<CompactFormatError> for TokenError {
    fn from(_: CompactFormatError) -> Self {
        TokenError::Malformed
    }
}
