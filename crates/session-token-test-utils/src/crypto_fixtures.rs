//! Deterministic key fixtures for testing
//!
//! The same seed always yields the same key material, so tokens signed in
//! one test run can be reproduced exactly in the next.

use session_token::{
    KeyError, KeyRing, RotatingKeyProvider, SigningKey, StaticKeyProvider, TokenConfig,
    TokenLifecycleManager,
};
use std::sync::Arc;
use thiserror::Error;

use crate::manual_clock::ManualClock;

/// Issuer used by every fixture manager.
pub const TEST_ISSUER: &str = "session-token-test";

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Key fixture failed: {0}")]
    Key(#[from] KeyError),

    #[error("Manager fixture failed: {0}")]
    Config(#[from] session_token::ConfigError),
}

/// Deterministic 32 bytes derived from `seed`.
///
/// # Example
/// ```rust,ignore
/// assert_eq!(test_secret_bytes(1), test_secret_bytes(1));
/// assert_ne!(test_secret_bytes(1), test_secret_bytes(2));
/// ```
pub fn test_secret_bytes(seed: u8) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = seed;
    for (i, byte) in bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    bytes
}

/// HMAC-SHA256 key with a secret derived from `seed`.
pub fn test_hmac_key(kid: &str, seed: u8) -> Result<SigningKey, FixtureError> {
    Ok(SigningKey::hmac(kid, &test_secret_bytes(seed))?)
}

/// Ed25519 key pair derived from `seed`.
pub fn test_ed25519_key(kid: &str, seed: u8) -> Result<SigningKey, FixtureError> {
    Ok(SigningKey::ed25519_from_seed(kid, &test_secret_bytes(seed))?)
}

/// Provider that never rotates.
pub fn static_provider(key: SigningKey) -> Arc<StaticKeyProvider> {
    Arc::new(StaticKeyProvider::new(KeyRing::new(key)))
}

/// Provider that supports `rotate()`.
pub fn rotating_provider(key: SigningKey) -> Arc<RotatingKeyProvider> {
    Arc::new(RotatingKeyProvider::new(KeyRing::new(key)))
}

/// Manager with default lifetimes, a static provider around `key`, and `clock`.
pub fn test_manager(
    key: SigningKey,
    clock: Arc<ManualClock>,
) -> Result<TokenLifecycleManager, FixtureError> {
    test_manager_with_config(TokenConfig::new(TEST_ISSUER), key, clock)
}

/// Manager with a custom config.
pub fn test_manager_with_config(
    config: TokenConfig,
    key: SigningKey,
    clock: Arc<ManualClock>,
) -> Result<TokenLifecycleManager, FixtureError> {
    Ok(TokenLifecycleManager::new(config, static_provider(key), clock)?)
}
