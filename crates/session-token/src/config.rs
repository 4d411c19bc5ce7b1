//! Token lifetime policy and signing key configuration.
//!
//! Both halves load from environment variables through `from_env()`, with
//! `from_vars()` taking an explicit map for tests.

use crate::keys::{
    KeyError, KeyRing, RotatingKeyProvider, SigningKey, DEFAULT_MAX_RETIRED_KEYS,
    MIN_HMAC_SECRET_BYTES,
};
use base64::{engine::general_purpose, Engine as _};
use common::jwt::MAX_CLOCK_SKEW;
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use thiserror::Error;

/// Default token lifetime (1 hour).
pub const DEFAULT_EXPIRE_SECONDS: i64 = 3600;

/// Default trailing refresh window (5 minutes).
pub const DEFAULT_REFRESH_WINDOW_SECONDS: i64 = 300;

/// Default key ID for the configured signing secret.
pub const DEFAULT_SIGNING_KEY_ID: &str = "primary";

const ISSUER_VAR: &str = "SESSION_TOKEN_ISSUER";
const EXPIRE_VAR: &str = "SESSION_TOKEN_EXPIRE_SECONDS";
const REFRESH_WINDOW_VAR: &str = "SESSION_TOKEN_REFRESH_WINDOW_SECONDS";
const CLOCK_SKEW_VAR: &str = "SESSION_TOKEN_CLOCK_SKEW_SECONDS";
const MAX_SESSION_VAR: &str = "SESSION_TOKEN_MAX_SESSION_SECONDS";
const SIGNING_SECRET_VAR: &str = "SESSION_TOKEN_SIGNING_SECRET";
const SIGNING_KEY_ID_VAR: &str = "SESSION_TOKEN_SIGNING_KEY_ID";
const RETIRED_SECRETS_VAR: &str = "SESSION_TOKEN_RETIRED_SECRETS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid integer in {var}: {value:?}")]
    InvalidInteger { var: String, value: String },

    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),

    #[error("Invalid token lifetime: {0}")]
    InvalidLifetime(String),

    #[error("Invalid refresh window: {0}")]
    InvalidRefreshWindow(String),

    #[error("Invalid clock skew: {0}")]
    InvalidClockSkew(String),

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid retired key entry: {0}")]
    InvalidRetiredKey(String),

    #[error("Key setup failed: {0}")]
    Key(#[from] KeyError),
}

/// Lifetime policy for issued tokens. All values are seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    /// Value of the `iss` claim; verification rejects any other issuer.
    pub issuer: String,
    /// Lifetime of a freshly issued or refreshed token.
    pub expire_seconds: i64,
    /// Trailing part of the lifetime during which refresh is allowed.
    pub refresh_window_seconds: i64,
    /// Leeway applied to `not_before`.
    pub clock_skew_seconds: i64,
    /// Hard cap on `now - issued_at` at refresh time. `None` is unbounded.
    pub max_session_lifetime_seconds: Option<i64>,
}

impl TokenConfig {
    /// Config with default lifetimes for `issuer`.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
            refresh_window_seconds: DEFAULT_REFRESH_WINDOW_SECONDS,
            clock_skew_seconds: 0,
            max_session_lifetime_seconds: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// See [`TokenConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    ///
    /// # Errors
    ///
    /// Missing issuer, unparseable integers, or values failing
    /// [`TokenConfig::validate`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let issuer = vars
            .get(ISSUER_VAR)
            .ok_or_else(|| ConfigError::MissingEnvVar(ISSUER_VAR.to_string()))?
            .clone();

        let config = Self {
            issuer,
            expire_seconds: parse_seconds(vars, EXPIRE_VAR)?.unwrap_or(DEFAULT_EXPIRE_SECONDS),
            refresh_window_seconds: parse_seconds(vars, REFRESH_WINDOW_VAR)?
                .unwrap_or(DEFAULT_REFRESH_WINDOW_SECONDS),
            clock_skew_seconds: parse_seconds(vars, CLOCK_SKEW_VAR)?.unwrap_or(0),
            max_session_lifetime_seconds: parse_seconds(vars, MAX_SESSION_VAR)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// - `InvalidIssuer` - empty issuer
    /// - `InvalidLifetime` - lifetime not positive, or max session lifetime
    ///   not longer than a single token lifetime
    /// - `InvalidRefreshWindow` - window negative, or not shorter than the
    ///   lifetime (a refresh must always move `expires_at` forward)
    /// - `InvalidClockSkew` - skew negative or above `MAX_CLOCK_SKEW`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::InvalidIssuer("issuer must not be empty".to_string()));
        }

        if self.expire_seconds <= 0 {
            return Err(ConfigError::InvalidLifetime(format!(
                "expire_seconds must be positive, got {}",
                self.expire_seconds
            )));
        }

        if self.refresh_window_seconds < 0 || self.refresh_window_seconds >= self.expire_seconds {
            return Err(ConfigError::InvalidRefreshWindow(format!(
                "refresh window must be in 0..{}, got {}",
                self.expire_seconds, self.refresh_window_seconds
            )));
        }

        let max_skew = i64::try_from(MAX_CLOCK_SKEW.as_secs()).unwrap_or(i64::MAX);
        if self.clock_skew_seconds < 0 || self.clock_skew_seconds > max_skew {
            return Err(ConfigError::InvalidClockSkew(format!(
                "clock skew must be in 0..={max_skew}, got {}",
                self.clock_skew_seconds
            )));
        }

        if let Some(max_session) = self.max_session_lifetime_seconds {
            if max_session <= self.expire_seconds {
                return Err(ConfigError::InvalidLifetime(format!(
                    "max session lifetime {max_session} must exceed expire_seconds {}",
                    self.expire_seconds
                )));
            }
        }

        Ok(())
    }
}

fn parse_seconds(vars: &HashMap<String, String>, var: &str) -> Result<Option<i64>, ConfigError> {
    vars.get(var)
        .map(|value| {
            value.trim().parse::<i64>().map_err(|_| ConfigError::InvalidInteger {
                var: var.to_string(),
                value: value.clone(),
            })
        })
        .transpose()
}

fn decode_secret(label: &str, encoded: &str) -> Result<Vec<u8>, ConfigError> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ConfigError::InvalidSecret(format!("{label}: {e}")))?;

    if bytes.len() < MIN_HMAC_SECRET_BYTES {
        return Err(ConfigError::InvalidSecret(format!(
            "{label}: expected at least {MIN_HMAC_SECRET_BYTES} bytes, got {}",
            bytes.len()
        )));
    }

    Ok(bytes)
}

/// HMAC signing key configuration.
///
/// Secrets are base64 (standard alphabet) and held as `SecretString`, so
/// `Debug` output never contains them.
#[derive(Debug)]
pub struct KeySettings {
    pub signing_key_id: String,
    pub signing_secret: SecretString,
    /// Previous keys still accepted for verification, newest first.
    pub retired: Vec<(String, SecretString)>,
}

impl KeySettings {
    /// Load key settings from environment variables
    ///
    /// # Errors
    ///
    /// See [`KeySettings::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load key settings from a HashMap (for testing)
    ///
    /// `SESSION_TOKEN_RETIRED_SECRETS` is a comma-separated list of
    /// `kid:base64secret` entries.
    ///
    /// # Errors
    ///
    /// - `MissingEnvVar` - no signing secret
    /// - `InvalidSecret` - a secret is not base64 or is shorter than 32 bytes
    /// - `InvalidRetiredKey` - a retired entry lacks `kid:` or reuses a key ID
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let signing_secret = vars
            .get(SIGNING_SECRET_VAR)
            .ok_or_else(|| ConfigError::MissingEnvVar(SIGNING_SECRET_VAR.to_string()))?;
        decode_secret(SIGNING_SECRET_VAR, signing_secret)?;

        let signing_key_id = vars
            .get(SIGNING_KEY_ID_VAR)
            .map(|kid| kid.trim().to_string())
            .unwrap_or_else(|| DEFAULT_SIGNING_KEY_ID.to_string());
        if signing_key_id.is_empty() {
            return Err(ConfigError::Key(KeyError::EmptyKeyId));
        }

        let mut retired: Vec<(String, SecretString)> = Vec::new();
        if let Some(list) = vars.get(RETIRED_SECRETS_VAR) {
            for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let Some((kid, secret)) = entry.split_once(':') else {
                    return Err(ConfigError::InvalidRetiredKey(
                        "expected kid:base64secret".to_string(),
                    ));
                };
                let kid = kid.trim();
                if kid.is_empty() {
                    return Err(ConfigError::InvalidRetiredKey("empty key ID".to_string()));
                }
                if kid == signing_key_id || retired.iter().any(|(k, _)| k == kid) {
                    return Err(ConfigError::InvalidRetiredKey(format!("duplicate key ID {kid}")));
                }
                decode_secret(kid, secret)?;
                retired.push((kid.to_string(), SecretString::from(secret.trim().to_string())));
            }
        }

        Ok(Self {
            signing_key_id,
            signing_secret: SecretString::from(signing_secret.trim().to_string()),
            retired,
        })
    }

    /// Build the key ring these settings describe.
    ///
    /// # Errors
    ///
    /// `InvalidSecret` or `Key` if any secret fails to produce a key.
    pub fn key_ring(&self) -> Result<KeyRing, ConfigError> {
        let current_secret = decode_secret(SIGNING_SECRET_VAR, self.signing_secret.expose_secret())?;
        let current = SigningKey::hmac(self.signing_key_id.clone(), &current_secret)?;

        let retired = self
            .retired
            .iter()
            .map(|(kid, secret)| -> Result<Arc<SigningKey>, ConfigError> {
                let bytes = decode_secret(kid, secret.expose_secret())?;
                Ok(Arc::new(SigningKey::hmac(kid.clone(), &bytes)?))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(KeyRing::with_retired(Arc::new(current), retired)?)
    }

    /// Build a rotating provider seeded with the configured keys. Every
    /// configured retired key is kept until the next rotation trims the ring.
    ///
    /// # Errors
    ///
    /// See [`KeySettings::key_ring`].
    pub fn into_provider(self) -> Result<RotatingKeyProvider, ConfigError> {
        let max_retired = DEFAULT_MAX_RETIRED_KEYS.max(self.retired.len());
        let ring = self.key_ring()?;

        tracing::info!(
            target: "session_token.config",
            kid = %self.signing_key_id,
            retired_keys = self.retired.len(),
            "Signing keys loaded"
        );

        Ok(RotatingKeyProvider::with_max_retired(ring, max_retired))
    }
}
