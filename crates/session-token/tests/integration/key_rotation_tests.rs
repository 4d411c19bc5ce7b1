//! Key rotation continuity.
//!
//! After rotation new tokens are signed with the new key while tokens
//! signed with retired keys keep verifying until the key leaves the ring.

use session_token::{
    KeyRing, RotatingKeyProvider, StaticKeyProvider, TokenConfig, TokenError,
    TokenLifecycleManager,
};
use session_token_test_utils::*;
use std::sync::Arc;

fn manager_with(
    provider: Arc<RotatingKeyProvider>,
    clock: Arc<ManualClock>,
) -> Result<TokenLifecycleManager, anyhow::Error> {
    Ok(TokenLifecycleManager::new(
        TokenConfig::new(TEST_ISSUER),
        provider,
        clock,
    )?)
}

#[test]
fn test_rotation_keeps_old_tokens_valid() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let clock = ManualClock::at_test_epoch();
    let provider = rotating_provider(test_hmac_key("k1", 1)?);
    let manager = manager_with(provider.clone(), clock)?;

    let before = manager.issue(test_principal())?;
    provider.rotate(test_hmac_key("k2", 2)?)?;
    let after = manager.issue(test_principal())?;

    before.assert_signed_by("k1");
    after.assert_signed_by("k2");
    assert!(manager.verify(&before).is_ok());
    assert!(manager.verify(&after).is_ok());
    Ok(())
}

#[test]
fn test_new_key_token_rejected_by_old_key_only() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let provider = rotating_provider(test_hmac_key("k1", 1)?);
    let manager = manager_with(provider.clone(), clock.clone())?;
    provider.rotate(test_hmac_key("k2", 2)?)?;
    let token = manager.issue(test_principal())?;

    let old_only = TokenLifecycleManager::new(
        TokenConfig::new(TEST_ISSUER),
        Arc::new(StaticKeyProvider::new(KeyRing::new(test_hmac_key("k1", 1)?))),
        clock,
    )?;

    assert_eq!(old_only.verify(&token), Err(TokenError::InvalidSignature));
    Ok(())
}

#[test]
fn test_retired_key_dropped_after_limit() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let provider = Arc::new(RotatingKeyProvider::with_max_retired(
        KeyRing::new(test_hmac_key("k1", 1)?),
        1,
    ));
    let manager = manager_with(provider.clone(), clock)?;

    let k1_token = manager.issue(test_principal())?;
    provider.rotate(test_hmac_key("k2", 2)?)?;
    let k2_token = manager.issue(test_principal())?;
    provider.rotate(test_hmac_key("k3", 3)?)?;

    assert_eq!(manager.verify(&k1_token), Err(TokenError::InvalidSignature));
    assert!(manager.verify(&k2_token).is_ok());
    Ok(())
}

#[test]
fn test_explicit_retire_revokes_key() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let provider = rotating_provider(test_hmac_key("k1", 1)?);
    let manager = manager_with(provider.clone(), clock)?;

    let token = manager.issue(test_principal())?;
    provider.rotate(test_hmac_key("k2", 2)?)?;
    assert!(manager.verify(&token).is_ok());

    assert!(provider.retire("k1")?);
    assert_eq!(manager.verify(&token), Err(TokenError::InvalidSignature));
    Ok(())
}

#[test]
fn test_rotation_across_algorithms() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let provider = rotating_provider(test_hmac_key("hs-1", 1)?);
    let manager = manager_with(provider.clone(), clock)?;

    let hmac_token = manager.issue(test_principal())?;
    provider.rotate(test_ed25519_key("ed-1", 2)?)?;
    let ed_token = manager.issue(test_principal())?;

    ed_token.assert_algorithm("EdDSA").assert_signed_by("ed-1");
    assert!(manager.verify(&hmac_token).is_ok());
    assert!(manager.verify(&ed_token).is_ok());
    Ok(())
}

#[test]
fn test_refresh_after_rotation_uses_new_key() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let provider = rotating_provider(test_hmac_key("k1", 1)?);
    let manager = manager_with(provider.clone(), clock.clone())?;

    let token = manager.issue(test_principal())?;
    provider.rotate(test_hmac_key("k2", 2)?)?;

    clock.advance(3500);
    let refreshed = manager.refresh(&token)?;
    refreshed.assert_signed_by("k2");
    Ok(())
}
