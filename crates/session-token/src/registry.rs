//! Server-side session registry used for revocation.
//!
//! A token bound to a session (its claim set carries a `sid`) is only valid
//! while the registry does not report that session as revoked. Tokens without
//! a session skip the check.
//!
//! [`InMemorySessionRegistry`] keeps every revocation made with
//! [`InMemorySessionRegistry::revoke`] until it is reinstated. Revocations
//! made with [`InMemorySessionRegistry::revoke_until`] carry the last expiry
//! of the session's tokens and are dropped by
//! [`InMemorySessionRegistry::prune_expired`] once that time has passed, since
//! expiry alone rejects those tokens from then on.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use uuid::Uuid;

/// Registry lookup failure. Verification treats it as a denial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Session registry lookup failed: {0}")]
    Lookup(String),
}

/// Answers whether a session has been revoked.
pub trait SessionRegistry: Send + Sync {
    /// # Errors
    ///
    /// `RegistryError` when the backing store cannot answer.
    fn is_revoked(&self, session_token: &str) -> Result<bool, RegistryError>;
}

/// In-process registry of revoked session tokens.
///
/// Each entry maps a session to the time after which it may be forgotten
/// (`None`: kept until reinstated).
#[derive(Default)]
pub struct InMemorySessionRegistry {
    revoked: RwLock<HashMap<String, Option<i64>>>,
}

impl fmt::Debug for InMemorySessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .revoked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("InMemorySessionRegistry")
            .field("revoked_sessions", &count)
            .finish()
    }
}

impl InMemorySessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// New random session correlator to bind into a `Principal`.
    #[must_use]
    pub fn create_session(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Revoke `session_token` until it is reinstated. Returns false if it was
    /// already revoked.
    pub fn revoke(&self, session_token: &str) -> bool {
        self.insert(session_token, None)
    }

    /// Revoke `session_token`, keeping the entry until `expires_at` (the
    /// latest `exp` of any token bound to the session) has passed. Returns
    /// false if it was already revoked.
    ///
    /// Re-revoking only ever extends how long the entry is kept.
    pub fn revoke_until(&self, session_token: &str, expires_at: i64) -> bool {
        self.insert(session_token, Some(expires_at))
    }

    fn insert(&self, session_token: &str, keep_until: Option<i64>) -> bool {
        let mut revoked = self.revoked.write().unwrap_or_else(PoisonError::into_inner);

        match revoked.get_mut(session_token) {
            Some(existing) => {
                *existing = match (*existing, keep_until) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    _ => None,
                };
                false
            }
            None => {
                revoked.insert(session_token.to_string(), keep_until);
                tracing::info!(target: "session_token.registry", keep_until = ?keep_until, "Session revoked");
                true
            }
        }
    }

    /// Drop revocations whose tokens have all expired at `now`. Returns the
    /// number of entries removed.
    pub fn prune_expired(&self, now: i64) -> usize {
        let mut revoked = self.revoked.write().unwrap_or_else(PoisonError::into_inner);
        let before = revoked.len();
        revoked.retain(|_, keep_until| keep_until.map_or(true, |until| now <= until));

        let pruned = before - revoked.len();
        if pruned > 0 {
            tracing::debug!(target: "session_token.registry", pruned, remaining = revoked.len(), "Pruned expired revocations");
        }
        pruned
    }

    /// Number of revocations currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.revoked.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Undo a revocation. Returns false if the session was not revoked.
    pub fn reinstate(&self, session_token: &str) -> bool {
        self.revoked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_token)
            .is_some()
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn is_revoked(&self, session_token: &str) -> Result<bool, RegistryError> {
        Ok(self
            .revoked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(session_token))
    }
}
