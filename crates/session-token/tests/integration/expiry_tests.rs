//! Temporal validity: expiry boundary, not-before, and clock skew leeway.

use session_token::{TokenConfig, TokenError};
use session_token_test_utils::*;

// ============================================================================
// Expiry
// ============================================================================

/// `now == expires_at` is still valid; one second later is not.
#[test]
fn test_expiry_boundary_seconds() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let manager = test_manager(test_hmac_key("k1", 1)?, clock.clone())?;
    let token = manager.issue(test_principal())?;
    let exp = TEST_EPOCH + 3600;

    clock.set(exp - 1);
    assert!(manager.verify(&token).is_ok(), "exp - 1 should be valid");

    clock.set(exp);
    assert!(manager.verify(&token).is_ok(), "exp itself should be valid");

    clock.set(exp + 1);
    assert_eq!(manager.verify(&token), Err(TokenError::Expired));
    Ok(())
}

#[test]
fn test_custom_lifetime_applied() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let mut config = TokenConfig::new(TEST_ISSUER);
    config.expire_seconds = 60;
    config.refresh_window_seconds = 10;
    let manager = test_manager_with_config(config, test_hmac_key("k1", 1)?, clock.clone())?;

    let token = manager.issue(test_principal())?;
    token.assert_expires_at(TEST_EPOCH + 60);

    clock.advance(61);
    assert_eq!(manager.verify(&token), Err(TokenError::Expired));
    Ok(())
}

// ============================================================================
// Not-before and clock skew
// ============================================================================

#[test]
fn test_future_not_before_rejected() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let key = test_hmac_key("k1", 1)?;
    let manager = test_manager(test_hmac_key("k1", 1)?, clock.clone())?;

    let token = TestClaimsBuilder::new()
        .issued_at(TEST_EPOCH + 60)
        .not_before(TEST_EPOCH + 60)
        .expires_at(TEST_EPOCH + 3660)
        .sign(&key)?;

    assert_eq!(manager.verify(&token), Err(TokenError::NotYetValid));

    clock.set(TEST_EPOCH + 60);
    assert!(manager.verify(&token).is_ok());
    Ok(())
}

#[test]
fn test_clock_skew_accepts_within_tolerance() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let key = test_hmac_key("k1", 1)?;
    let mut config = TokenConfig::new(TEST_ISSUER);
    config.clock_skew_seconds = 60;
    let manager = test_manager_with_config(config, test_hmac_key("k1", 1)?, clock.clone())?;

    // Issued by a peer whose clock runs 30 seconds ahead.
    let token = TestClaimsBuilder::new()
        .issued_at(TEST_EPOCH + 30)
        .not_before(TEST_EPOCH + 30)
        .expires_at(TEST_EPOCH + 3630)
        .sign(&key)?;

    assert!(manager.verify(&token).is_ok());
    Ok(())
}

#[test]
fn test_clock_skew_rejects_beyond_tolerance() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let key = test_hmac_key("k1", 1)?;
    let mut config = TokenConfig::new(TEST_ISSUER);
    config.clock_skew_seconds = 60;
    let manager = test_manager_with_config(config, test_hmac_key("k1", 1)?, clock)?;

    let token = TestClaimsBuilder::new()
        .issued_at(TEST_EPOCH + 61)
        .not_before(TEST_EPOCH + 61)
        .expires_at(TEST_EPOCH + 3661)
        .sign(&key)?;

    assert_eq!(manager.verify(&token), Err(TokenError::NotYetValid));
    Ok(())
}

#[test]
fn test_clock_skew_does_not_extend_expiry() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let mut config = TokenConfig::new(TEST_ISSUER);
    config.clock_skew_seconds = 600;
    let manager = test_manager_with_config(config, test_hmac_key("k1", 1)?, clock.clone())?;
    let token = manager.issue(test_principal())?;

    clock.advance(3601);
    assert_eq!(manager.verify(&token), Err(TokenError::Expired));
    Ok(())
}

// ============================================================================
// Structural validity of signed claims
// ============================================================================

#[test]
fn test_signed_claims_with_inverted_window_rejected() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let key = test_hmac_key("k1", 1)?;
    let manager = test_manager(test_hmac_key("k1", 1)?, clock)?;

    let token = TestClaimsBuilder::new()
        .issued_at(TEST_EPOCH)
        .not_before(TEST_EPOCH)
        .expires_at(TEST_EPOCH - 1)
        .sign(&key)?;

    assert_eq!(manager.verify(&token), Err(TokenError::Malformed));
    Ok(())
}
