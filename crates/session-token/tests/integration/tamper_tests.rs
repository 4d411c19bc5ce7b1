//! Tamper detection and hostile input handling.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::MAX_TOKEN_SIZE_BYTES;
use session_token::{TokenError, TokenLifecycleManager};
use session_token_test_utils::*;

fn setup() -> Result<(TokenLifecycleManager, String), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let manager = test_manager(test_hmac_key("k1", 1)?, clock)?;
    let token = manager.issue(test_principal().with_session("sess-1"))?;
    Ok((manager, token))
}

/// Flip one bit in every decoded byte of the payload and signature and
/// re-encode; every variant must be rejected.
#[test]
fn test_every_flipped_byte_rejected() -> Result<(), anyhow::Error> {
    let (manager, token) = setup()?;
    let segments: Vec<&str> = token.split('.').collect();
    let (header, payload, signature) = (segments[0], segments[1], segments[2]);

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload)?;
    for i in 0..payload_bytes.len() {
        let mut tampered = payload_bytes.clone();
        tampered[i] ^= 0x01;
        let candidate = format!("{header}.{}.{signature}", URL_SAFE_NO_PAD.encode(&tampered));
        assert!(
            manager.verify(&candidate).is_err(),
            "payload byte {i} flip accepted"
        );
    }

    let signature_bytes = URL_SAFE_NO_PAD.decode(signature)?;
    for i in 0..signature_bytes.len() {
        let mut tampered = signature_bytes.clone();
        tampered[i] ^= 0x80;
        let candidate = format!("{header}.{payload}.{}", URL_SAFE_NO_PAD.encode(&tampered));
        assert_eq!(
            manager.verify(&candidate),
            Err(TokenError::InvalidSignature),
            "signature byte {i} flip accepted"
        );
    }
    Ok(())
}

#[test]
fn test_truncated_signature_rejected() -> Result<(), anyhow::Error> {
    let (manager, token) = setup()?;
    let (input, signature) = token.rsplit_once('.').unwrap();
    let signature_bytes = URL_SAFE_NO_PAD.decode(signature)?;

    let truncated = format!(
        "{input}.{}",
        URL_SAFE_NO_PAD.encode(&signature_bytes[..signature_bytes.len() - 1])
    );
    assert_eq!(manager.verify(&truncated), Err(TokenError::InvalidSignature));
    Ok(())
}

#[test]
fn test_malformed_shapes_rejected() -> Result<(), anyhow::Error> {
    let (manager, token) = setup()?;

    let cases = vec![
        String::new(),
        "garbage".to_string(),
        "a.b".to_string(),
        format!("{token}.extra"),
        token.replacen('.', "", 1),
        format!("{token}="),
    ];

    for case in cases {
        assert_eq!(
            manager.verify(&case),
            Err(TokenError::Malformed),
            "case {case:?} not rejected as malformed"
        );
    }
    Ok(())
}

#[test]
fn test_oversized_token_rejected_before_parsing() -> Result<(), anyhow::Error> {
    let (manager, token) = setup()?;
    let padding = "A".repeat(MAX_TOKEN_SIZE_BYTES);
    let oversized = format!("{token}{padding}");

    assert_eq!(manager.verify(&oversized), Err(TokenError::Malformed));
    Ok(())
}

#[test]
fn test_alg_none_rejected() -> Result<(), anyhow::Error> {
    let (manager, token) = setup()?;
    let payload = token.split('.').nth(1).unwrap();
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT","kid":"k1"}"#);

    let unsigned = format!("{header}.{payload}.AA");
    assert_eq!(manager.verify(&unsigned), Err(TokenError::Malformed));
    Ok(())
}

#[test]
fn test_alg_switch_rejected() -> Result<(), anyhow::Error> {
    let (manager, token) = setup()?;
    let mut segments = token.split('.');
    let _ = segments.next();
    let payload = segments.next().unwrap();
    let signature = segments.next().unwrap();

    // Same kid, claimed EdDSA: the HS256 key is never used to check it.
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"EdDSA","typ":"JWT","kid":"k1"}"#);
    let switched = format!("{header}.{payload}.{signature}");
    assert_eq!(manager.verify(&switched), Err(TokenError::InvalidSignature));
    Ok(())
}

#[test]
fn test_token_signed_with_unknown_key_rejected() -> Result<(), anyhow::Error> {
    let (manager, _) = setup()?;
    let forged = TestClaimsBuilder::new().sign(&test_hmac_key("k1", 99)?)?;
    assert_eq!(manager.verify(&forged), Err(TokenError::InvalidSignature));

    let unknown_kid = TestClaimsBuilder::new().sign(&test_hmac_key("k-unknown", 1)?)?;
    assert_eq!(manager.verify(&unknown_kid), Err(TokenError::InvalidSignature));
    Ok(())
}
