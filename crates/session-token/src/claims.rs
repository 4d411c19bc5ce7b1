//! Claim set carried inside a session token.

use crate::errors::TokenError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated principal a token is issued for.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable, never-reused identifier of the principal.
    pub subject_id: String,
    /// Display name. Informational only.
    pub subject_name: String,
    /// Correlator to a server-side session record, enabling revocation.
    pub session_token: Option<String>,
}

impl Principal {
    /// Principal without a bound server-side session.
    pub fn new(subject_id: impl Into<String>, subject_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            subject_name: subject_name.into(),
            session_token: None,
        }
    }

    /// Bind the principal to a server-side session.
    #[must_use]
    pub fn with_session(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("subject_id", &"[REDACTED]")
            .field("subject_name", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Payload bound into a signed token.
///
/// Fields are private: a claim set is never modified after signing. Refresh
/// produces a new value through [`ClaimSet::renewed`].
///
/// Serialized field order is fixed by declaration order, which keeps encoding
/// deterministic. Wire names follow registered JWT claim names where one
/// exists so generic verifiers can read `iat`, `nbf`, `exp`, `iss`, and `sub`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(rename = "uid")]
    subject_id: String,

    #[serde(rename = "name")]
    subject_name: String,

    #[serde(rename = "sid", default, skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,

    #[serde(rename = "iat")]
    issued_at: i64,

    #[serde(rename = "nbf")]
    not_before: i64,

    #[serde(rename = "exp")]
    expires_at: i64,

    #[serde(rename = "iss")]
    issuer: String,

    #[serde(rename = "sub")]
    subject: String,
}

/// Redacts identity fields; timestamps and issuer stay visible for debugging.
impl fmt::Debug for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSet")
            .field("subject_id", &"[REDACTED]")
            .field("subject_name", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("issued_at", &self.issued_at)
            .field("not_before", &self.not_before)
            .field("expires_at", &self.expires_at)
            .field("issuer", &self.issuer)
            .field("subject", &"[REDACTED]")
            .finish()
    }
}

impl ClaimSet {
    /// Build a claim set for `principal`.
    ///
    /// No invariants are checked here; [`ClaimSet::validate`] does that and
    /// decoding always calls it.
    pub fn new(
        principal: Principal,
        issuer: impl Into<String>,
        issued_at: i64,
        not_before: i64,
        expires_at: i64,
    ) -> Self {
        let subject = principal.subject_name.clone();
        Self {
            subject_id: principal.subject_id,
            subject_name: principal.subject_name,
            session_token: principal.session_token,
            issued_at,
            not_before,
            expires_at,
            issuer: issuer.into(),
            subject,
        }
    }

    /// Claim set for a fresh issuance at `now`.
    pub(crate) fn issue(principal: Principal, issuer: &str, now: i64, lifetime_seconds: i64) -> Self {
        Self::new(principal, issuer, now, now, now.saturating_add(lifetime_seconds))
    }

    /// Copy of this claim set with a new expiry. Every other field, including
    /// `issued_at` and `not_before`, is preserved.
    #[must_use]
    pub fn renewed(&self, expires_at: i64) -> Self {
        Self {
            expires_at,
            ..self.clone()
        }
    }

    /// Check the structural invariants every signed claim set must satisfy:
    /// non-empty subject id, `sub` mirroring the subject name, and
    /// `not_before <= issued_at < expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` on the first violated invariant.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.subject_id.is_empty() {
            tracing::debug!(target: "session_token.claims", "Claim set rejected: empty subject id");
            return Err(TokenError::Malformed);
        }

        if self.subject != self.subject_name {
            tracing::debug!(target: "session_token.claims", "Claim set rejected: sub does not mirror name");
            return Err(TokenError::Malformed);
        }

        if self.not_before > self.issued_at || self.issued_at >= self.expires_at {
            tracing::debug!(
                target: "session_token.claims",
                iat = self.issued_at,
                nbf = self.not_before,
                exp = self.expires_at,
                "Claim set rejected: inconsistent validity window"
            );
            return Err(TokenError::Malformed);
        }

        Ok(())
    }

    /// Identifier of the principal.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Display name of the principal.
    #[must_use]
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    /// Server-side session correlator, if bound.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Issued-at, Unix epoch seconds.
    #[must_use]
    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    /// Not-before, Unix epoch seconds.
    #[must_use]
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// Expiry, Unix epoch seconds.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Issuing system.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Generic `sub` claim (mirrors the subject name).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Seconds until expiry as seen at `now`; negative once expired.
    #[must_use]
    pub fn expires_in(&self, now: i64) -> i64 {
        self.expires_at.saturating_sub(now)
    }

    /// The principal this claim set was issued for.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            subject_id: self.subject_id.clone(),
            subject_name: self.subject_name.clone(),
            session_token: self.session_token.clone(),
        }
    }
}
