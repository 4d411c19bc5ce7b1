//! Builder patterns for test data construction
//!
//! Provides fluent APIs for creating principals, claim sets, and tokens with
//! arbitrary (including invalid) timestamps.

use crate::crypto_fixtures::TEST_ISSUER;
use crate::manual_clock::TEST_EPOCH;
use session_token::{codec, ClaimSet, Principal, SigningKey, TokenError};

/// Principal used across tests.
pub fn test_principal() -> Principal {
    Principal::new("user-0001", "alice")
}

/// Builder for claim sets the lifecycle manager would never issue itself.
///
/// # Example
/// ```rust,ignore
/// let token = TestClaimsBuilder::new()
///     .for_subject("user-7", "bob")
///     .not_before(TEST_EPOCH + 60)
///     .sign(&key)?;
/// ```
pub struct TestClaimsBuilder {
    subject_id: String,
    subject_name: String,
    session_token: Option<String>,
    issuer: String,
    issued_at: i64,
    not_before: i64,
    expires_at: i64,
}

impl TestClaimsBuilder {
    /// Defaults: [`test_principal`], [`TEST_ISSUER`], issued at
    /// [`TEST_EPOCH`], valid for one hour.
    pub fn new() -> Self {
        let principal = test_principal();
        Self {
            subject_id: principal.subject_id,
            subject_name: principal.subject_name,
            session_token: None,
            issuer: TEST_ISSUER.to_string(),
            issued_at: TEST_EPOCH,
            not_before: TEST_EPOCH,
            expires_at: TEST_EPOCH + 3600,
        }
    }

    pub fn for_subject(mut self, subject_id: &str, subject_name: &str) -> Self {
        self.subject_id = subject_id.to_string();
        self.subject_name = subject_name.to_string();
        self
    }

    pub fn with_session(mut self, session_token: &str) -> Self {
        self.session_token = Some(session_token.to_string());
        self
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.issuer = issuer.to_string();
        self
    }

    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.issued_at = timestamp;
        self
    }

    pub fn not_before(mut self, timestamp: i64) -> Self {
        self.not_before = timestamp;
        self
    }

    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.expires_at = timestamp;
        self
    }

    pub fn build(self) -> ClaimSet {
        let mut principal = Principal::new(self.subject_id, self.subject_name);
        principal.session_token = self.session_token;
        ClaimSet::new(
            principal,
            self.issuer,
            self.issued_at,
            self.not_before,
            self.expires_at,
        )
    }

    /// Build and sign with `key`.
    pub fn sign(self, key: &SigningKey) -> Result<String, TokenError> {
        codec::encode(&self.build(), key)
    }
}

impl Default for TestClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
