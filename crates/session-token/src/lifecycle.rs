//! Token lifecycle manager: issue, verify, and refresh session tokens.
//!
//! The manager owns no mutable state. Configuration, keys, time, and the
//! optional session registry are injected at construction, so one instance
//! can be shared across threads and tests can pin every collaborator.

use crate::claims::{ClaimSet, Principal};
use crate::clock::Clock;
use crate::codec;
use crate::config::{ConfigError, TokenConfig};
use crate::errors::TokenError;
use crate::keys::KeyProvider;
use crate::observability::metrics::{
    record_error, record_token_issuance, record_token_refresh, record_token_verification,
};
use crate::observability::{hash_for_correlation, ErrorCategory};
use crate::registry::SessionRegistry;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Token lifecycle for one issuer, over injected keys and time.
///
/// `Send + Sync`; share one instance behind an `Arc`.
pub struct TokenLifecycleManager {
    config: TokenConfig,
    key_provider: Arc<dyn KeyProvider>,
    clock: Arc<dyn Clock>,
    session_registry: Option<Arc<dyn SessionRegistry>>,
}

impl fmt::Debug for TokenLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenLifecycleManager")
            .field("config", &self.config)
            .field("session_registry", &self.session_registry.is_some())
            .finish_non_exhaustive()
    }
}

/// `status` and `error` labels for `result`. Failures are also counted by
/// category under `operation`.
fn outcome<T>(
    operation: &'static str,
    result: &Result<T, TokenError>,
) -> (&'static str, Option<&'static str>) {
    match result {
        Ok(_) => ("success", None),
        Err(e) => {
            record_error(operation, ErrorCategory::from(e).as_str(), e.code());
            ("error", Some(e.code()))
        }
    }
}

impl TokenLifecycleManager {
    /// Manager for `config`, signing with keys from `key_provider` and reading
    /// time from `clock`.
    ///
    /// # Errors
    ///
    /// Any `ConfigError` from [`TokenConfig::validate`].
    pub fn new(
        config: TokenConfig,
        key_provider: Arc<dyn KeyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            config,
            key_provider,
            clock,
            session_registry: None,
        })
    }

    /// Check every session-bound token against `registry` during
    /// verification and refresh.
    #[must_use]
    pub fn with_session_registry(mut self, registry: Arc<dyn SessionRegistry>) -> Self {
        self.session_registry = Some(registry);
        self
    }

    /// Validated configuration this manager runs with.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Issue a token for `principal`, valid from now for `expire_seconds`.
    ///
    /// # Errors
    ///
    /// - `InvalidPrincipal` - empty subject id
    /// - `KeyUnavailable` - no current key, or the current key cannot sign
    /// - `Crypto` - signing failed
    #[instrument(skip_all)]
    pub fn issue(&self, principal: Principal) -> Result<String, TokenError> {
        let start = Instant::now();
        let result = self.issue_at(principal, self.clock.now_timestamp());
        record_token_issuance(outcome("issue", &result).0, start.elapsed());
        result
    }

    /// Verify `token` and return its claim set.
    ///
    /// Side-effect free apart from logs and metrics: verifying the same token
    /// twice at the same instant gives the same result.
    ///
    /// # Errors
    ///
    /// - `Malformed` / `InvalidSignature` - decoding failed
    /// - `InvalidIssuer` - signed by us for a different issuer
    /// - `NotYetValid` - `now + clock_skew < not_before`
    /// - `Expired` - `now > expires_at`
    /// - `Revoked` / `RegistryUnavailable` - session registry verdict
    /// - `KeyUnavailable` - key provider failure
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<ClaimSet, TokenError> {
        let start = Instant::now();
        let result = self.verify_at(token, self.clock.now_timestamp());
        let (status, error) = outcome("verify", &result);
        record_token_verification(status, error, start.elapsed());
        result
    }

    /// Exchange a token near the end of its lifetime for a new one.
    ///
    /// The new token keeps every claim of the old one, including `issued_at`
    /// and `not_before`, with `expires_at` moved to `now + expire_seconds`.
    /// It is signed with the current key. The old token stays valid until its
    /// own expiry.
    ///
    /// # Errors
    ///
    /// - Any [`TokenLifecycleManager::verify`] error
    /// - `RefreshNotEligible` - more than `refresh_window_seconds` remain
    /// - `SessionLifetimeExceeded` - session older than the configured cap
    /// - `KeyUnavailable` / `Crypto` - signing failed
    #[instrument(skip_all)]
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        let start = Instant::now();
        let result = self.refresh_at(token, self.clock.now_timestamp());
        let (status, error) = outcome("refresh", &result);
        record_token_refresh(status, error, start.elapsed());
        result
    }

    fn issue_at(&self, principal: Principal, now: i64) -> Result<String, TokenError> {
        if principal.subject_id.is_empty() {
            tracing::debug!(target: "session_token.lifecycle", "Issue rejected: empty subject id");
            return Err(TokenError::InvalidPrincipal(
                "subject_id must not be empty".to_string(),
            ));
        }

        let subject_hash = hash_for_correlation(&principal.subject_id);
        let claims = ClaimSet::issue(principal, &self.config.issuer, now, self.config.expire_seconds);
        let token = self.sign(&claims)?;

        tracing::debug!(
            target: "session_token.lifecycle",
            subject = %subject_hash,
            expires_at = claims.expires_at(),
            "Session token issued"
        );

        Ok(token)
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<ClaimSet, TokenError> {
        let ring = self.key_provider.key_ring().map_err(|e| {
            tracing::warn!(target: "session_token.lifecycle", error = %e, "Key provider failed");
            e
        })?;

        let claims = codec::decode(token, ring.acceptable_keys()).map_err(|e| {
            tracing::debug!(target: "session_token.lifecycle", error = e.code(), "Token rejected");
            e
        })?;

        let rejection = if claims.issuer() != self.config.issuer {
            Some(TokenError::InvalidIssuer)
        } else if now.saturating_add(self.config.clock_skew_seconds) < claims.not_before() {
            Some(TokenError::NotYetValid)
        } else if now > claims.expires_at() {
            Some(TokenError::Expired)
        } else {
            None
        };

        if let Some(err) = rejection {
            tracing::debug!(
                target: "session_token.lifecycle",
                error = err.code(),
                now = now,
                nbf = claims.not_before(),
                exp = claims.expires_at(),
                "Token rejected"
            );
            return Err(err);
        }

        self.check_session(&claims)?;
        Ok(claims)
    }

    fn check_session(&self, claims: &ClaimSet) -> Result<(), TokenError> {
        let (Some(registry), Some(session)) = (&self.session_registry, claims.session_token())
        else {
            return Ok(());
        };

        match registry.is_revoked(session) {
            Ok(false) => Ok(()),
            Ok(true) => {
                tracing::debug!(
                    target: "session_token.lifecycle",
                    subject = %hash_for_correlation(claims.subject_id()),
                    "Token rejected: session revoked"
                );
                Err(TokenError::Revoked)
            }
            Err(e) => {
                tracing::warn!(target: "session_token.lifecycle", error = %e, "Session registry lookup failed, denying token");
                Err(TokenError::RegistryUnavailable(e.to_string()))
            }
        }
    }

    fn refresh_at(&self, token: &str, now: i64) -> Result<String, TokenError> {
        let claims = self.verify_at(token, now)?;

        let remaining = claims.expires_in(now);
        if remaining > self.config.refresh_window_seconds {
            tracing::debug!(
                target: "session_token.lifecycle",
                remaining_seconds = remaining,
                refresh_window_seconds = self.config.refresh_window_seconds,
                "Refresh rejected: outside refresh window"
            );
            return Err(TokenError::RefreshNotEligible);
        }

        if let Some(max_session) = self.config.max_session_lifetime_seconds {
            let session_age = now.saturating_sub(claims.issued_at());
            if session_age >= max_session {
                tracing::debug!(
                    target: "session_token.lifecycle",
                    session_age_seconds = session_age,
                    max_session_seconds = max_session,
                    "Refresh rejected: session lifetime exceeded"
                );
                return Err(TokenError::SessionLifetimeExceeded);
            }
        }

        let renewed = claims.renewed(now.saturating_add(self.config.expire_seconds));
        let token = self.sign(&renewed)?;

        tracing::debug!(
            target: "session_token.lifecycle",
            subject = %hash_for_correlation(renewed.subject_id()),
            expires_at = renewed.expires_at(),
            "Session token refreshed"
        );

        Ok(token)
    }

    fn sign(&self, claims: &ClaimSet) -> Result<String, TokenError> {
        let key = self.key_provider.current_key()?;
        if !key.can_sign() {
            tracing::warn!(target: "session_token.lifecycle", kid = %key.kid(), "Current key is verification-only");
            return Err(TokenError::KeyUnavailable(format!(
                "current key {} cannot sign",
                key.kid()
            )));
        }

        codec::encode(claims, &key)
    }
}
