//! End-to-end issue / verify tests through the public API.

use session_token::errors::TOKEN_REJECTED_MESSAGE;
use session_token::{Principal, TokenError};
use session_token_test_utils::*;

// ============================================================================
// Issue / Verify
// ============================================================================

#[test]
fn test_issue_then_verify_returns_same_principal() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let clock = ManualClock::at_test_epoch();
    let manager = test_manager(test_hmac_key("k1", 1)?, clock)?;

    let principal = Principal::new("user-42", "alice").with_session("sess-42");
    let token = manager.issue(principal.clone())?;

    token
        .assert_compact_format()
        .assert_signed_by("k1")
        .assert_algorithm("HS256")
        .assert_for_subject("user-42")
        .assert_issued_at(TEST_EPOCH)
        .assert_expires_at(TEST_EPOCH + 3600);

    let claims = manager.verify(&token)?;
    assert_eq!(claims.principal(), principal);
    assert_eq!(claims.subject(), "alice");
    assert_eq!(claims.issuer(), TEST_ISSUER);
    Ok(())
}

#[test]
fn test_ed25519_issue_then_verify() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let manager = test_manager(test_ed25519_key("ed-1", 9)?, clock)?;

    let token = manager.issue(test_principal())?;
    token.assert_compact_format().assert_algorithm("EdDSA");

    assert_eq!(manager.verify(&token)?.principal(), test_principal());
    Ok(())
}

#[test]
fn test_verify_is_idempotent() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let manager = test_manager(test_hmac_key("k1", 1)?, clock)?;
    let token = manager.issue(test_principal())?;

    let first = manager.verify(&token)?;
    let second = manager.verify(&token)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_issuing_twice_in_one_second_is_deterministic() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let manager = test_manager(test_hmac_key("k1", 1)?, clock)?;

    assert_eq!(
        manager.issue(test_principal())?,
        manager.issue(test_principal())?
    );
    Ok(())
}

#[test]
fn test_empty_subject_id_rejected() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let manager = test_manager(test_hmac_key("k1", 1)?, clock)?;

    let result = manager.issue(Principal::new("", "ghost"));
    assert!(matches!(result, Err(TokenError::InvalidPrincipal(_))));
    Ok(())
}

// ============================================================================
// Issuer pinning
// ============================================================================

#[test]
fn test_token_from_other_issuer_rejected() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let key = test_hmac_key("k1", 1)?;
    let manager = test_manager(test_hmac_key("k1", 1)?, clock)?;

    let foreign = TestClaimsBuilder::new().with_issuer("someone-else").sign(&key)?;

    assert_eq!(manager.verify(&foreign), Err(TokenError::InvalidIssuer));
    Ok(())
}

// ============================================================================
// Error surface
// ============================================================================

#[test]
fn test_rejections_do_not_leak_reason() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let manager = test_manager(test_hmac_key("k1", 1)?, clock.clone())?;
    let token = manager.issue(test_principal())?;

    clock.advance(3601);
    let expired = manager.verify(&token).unwrap_err();
    let garbage = manager.verify("not-a-token").unwrap_err();

    assert_eq!(expired.code(), "expired");
    assert_eq!(garbage.code(), "malformed");
    assert_eq!(expired.to_string(), TOKEN_REJECTED_MESSAGE);
    assert_eq!(garbage.to_string(), TOKEN_REJECTED_MESSAGE);
    Ok(())
}
