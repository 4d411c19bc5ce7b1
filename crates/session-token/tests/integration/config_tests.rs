//! Building a working manager from environment-style configuration.

use base64::{engine::general_purpose, Engine as _};
use session_token::{KeySettings, TokenConfig, TokenError, TokenLifecycleManager};
use session_token_test_utils::*;
use std::collections::HashMap;
use std::sync::Arc;

fn vars(entries: &[(&str, String)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[test]
fn test_manager_from_vars_with_retired_key() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let old_secret = general_purpose::STANDARD.encode(test_secret_bytes(1));
    let new_secret = general_purpose::STANDARD.encode(test_secret_bytes(2));

    let env = vars(&[
        ("SESSION_TOKEN_ISSUER", TEST_ISSUER.to_string()),
        ("SESSION_TOKEN_EXPIRE_SECONDS", "900".to_string()),
        ("SESSION_TOKEN_REFRESH_WINDOW_SECONDS", "120".to_string()),
        ("SESSION_TOKEN_SIGNING_SECRET", new_secret),
        ("SESSION_TOKEN_SIGNING_KEY_ID", "2026-10".to_string()),
        ("SESSION_TOKEN_RETIRED_SECRETS", format!("2026-09:{old_secret}")),
    ]);

    let config = TokenConfig::from_vars(&env)?;
    let provider = Arc::new(KeySettings::from_vars(&env)?.into_provider()?);
    let manager = TokenLifecycleManager::new(config, provider, clock.clone())?;

    // A token from before the rotation, signed with the retired key.
    let legacy = TestClaimsBuilder::new().sign(&test_hmac_key("2026-09", 1)?)?;
    assert!(manager.verify(&legacy).is_ok());

    let token = manager.issue(test_principal())?;
    token
        .assert_signed_by("2026-10")
        .assert_expires_at(TEST_EPOCH + 900);

    clock.advance(779);
    assert_eq!(manager.refresh(&token), Err(TokenError::RefreshNotEligible));
    clock.advance(1);
    assert!(manager.refresh(&token).is_ok());
    Ok(())
}
