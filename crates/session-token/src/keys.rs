//! Signing keys, key rings, and key providers.
//!
//! A [`KeyRing`] is an immutable snapshot of one current signing key plus the
//! recently retired keys that are still accepted for verification. Providers
//! hand out whole snapshots, so a caller never sees a half-rotated ring.
//!
//! # Security
//!
//! - HMAC secrets shorter than [`MIN_HMAC_SECRET_BYTES`] are rejected
//! - Key material is held in `SecretBox` and redacted from `Debug`
//! - Random keys come from `ring::rand::SystemRandom`
//! - Ed25519 documents are validated with `ring` before `jsonwebtoken` sees them

use crate::errors::TokenError;
use crate::observability::metrics::{record_key_rotation, set_acceptable_keys};
use arc_swap::ArcSwap;
use common::secret::{ExposeSecret, SecretBox};
use jsonwebtoken::{Algorithm as JwtAlgorithm, DecodingKey, EncodingKey};
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::instrument;

/// Minimum HMAC secret length (256 bits, the HS256 output size).
pub const MIN_HMAC_SECRET_BYTES: usize = 32;

/// Ed25519 public key and seed length.
const ED25519_KEY_BYTES: usize = 32;

/// Retired keys kept by [`RotatingKeyProvider`] unless configured otherwise.
pub const DEFAULT_MAX_RETIRED_KEYS: usize = 2;

/// Errors constructing keys or assembling key rings. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key ID must not be empty")]
    EmptyKeyId,

    #[error("HMAC secret too short: {0} bytes (minimum 32)")]
    SecretTooShort(usize),

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Duplicate key ID in key ring: {0}")]
    DuplicateKeyId(String),

    #[error("Key {0} is the current signing key and cannot be retired")]
    CurrentKey(String),

    #[error("Key generation failed: {0}")]
    Generation(String),
}

/// Signature algorithm of a key, as written in the token header `alg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// HMAC-SHA256 with a shared secret.
    Hs256,
    /// Ed25519 signatures.
    EdDsa,
}

impl Algorithm {
    /// Header value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Hs256 => "HS256",
            Algorithm::EdDsa => "EdDSA",
        }
    }

    /// Parse a header `alg`. Anything else (including `none`) is unsupported.
    #[must_use]
    pub fn from_header(alg: &str) -> Option<Self> {
        match alg {
            "HS256" => Some(Algorithm::Hs256),
            "EdDSA" => Some(Algorithm::EdDsa),
            _ => None,
        }
    }

    pub(crate) fn to_jwt(self) -> JwtAlgorithm {
        match self {
            Algorithm::Hs256 => JwtAlgorithm::HS256,
            Algorithm::EdDsa => JwtAlgorithm::EdDSA,
        }
    }
}

enum KeyMaterial {
    Hmac(SecretBox<[u8]>),
    Ed25519 {
        pkcs8: SecretBox<[u8]>,
        public_key: Vec<u8>,
    },
    Ed25519Public(Vec<u8>),
}

/// A named key used to sign and/or verify tokens.
pub struct SigningKey {
    kid: String,
    material: KeyMaterial,
}

/// Redacts all key material.
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm())
            .field("can_sign", &self.can_sign())
            .field("material", &"[REDACTED]")
            .finish()
    }
}

fn check_kid(kid: &str) -> Result<(), KeyError> {
    if kid.is_empty() {
        return Err(KeyError::EmptyKeyId);
    }
    Ok(())
}

/// Wrap a raw Ed25519 seed in a PKCS#8 v1 document (RFC 8410).
fn pkcs8_from_seed(seed: &[u8]) -> Vec<u8> {
    // SEQUENCE { INTEGER 0, SEQUENCE { OID 1.3.101.112 }, OCTET STRING { OCTET STRING seed } }
    const PREFIX: [u8; 16] = [
        0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04,
        0x20,
    ];

    let mut pkcs8 = Vec::with_capacity(PREFIX.len() + seed.len());
    pkcs8.extend_from_slice(&PREFIX);
    pkcs8.extend_from_slice(seed);
    pkcs8
}

impl SigningKey {
    /// HMAC-SHA256 key from raw secret bytes.
    ///
    /// # Errors
    ///
    /// `EmptyKeyId`, or `SecretTooShort` below [`MIN_HMAC_SECRET_BYTES`].
    pub fn hmac(kid: impl Into<String>, secret: &[u8]) -> Result<Self, KeyError> {
        let kid = kid.into();
        check_kid(&kid)?;

        if secret.len() < MIN_HMAC_SECRET_BYTES {
            return Err(KeyError::SecretTooShort(secret.len()));
        }

        Ok(Self {
            kid,
            material: KeyMaterial::Hmac(SecretBox::new(secret.to_vec().into_boxed_slice())),
        })
    }

    /// HMAC-SHA256 key with a fresh random 256-bit secret.
    ///
    /// # Errors
    ///
    /// `EmptyKeyId`, or `Generation` if the system RNG fails.
    #[instrument(skip_all)]
    pub fn generate_hmac(kid: impl Into<String>) -> Result<Self, KeyError> {
        let mut secret = vec![0u8; MIN_HMAC_SECRET_BYTES];
        SystemRandom::new()
            .fill(&mut secret)
            .map_err(|e| KeyError::Generation(format!("Random bytes generation failed: {e}")))?;

        Self::hmac(kid, &secret)
    }

    /// Ed25519 signing key from a PKCS#8 (v1 or v2) document.
    ///
    /// # Errors
    ///
    /// `EmptyKeyId`, or `InvalidKeyMaterial` if the document does not parse.
    pub fn ed25519_from_pkcs8(kid: impl Into<String>, pkcs8: &[u8]) -> Result<Self, KeyError> {
        let kid = kid.into();
        check_kid(&kid)?;

        // Parse once with ring to reject bad documents up front and derive the public key.
        let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(pkcs8)
            .map_err(|e| KeyError::InvalidKeyMaterial(format!("Invalid private key format: {e}")))?;

        Ok(Self {
            kid,
            material: KeyMaterial::Ed25519 {
                pkcs8: SecretBox::new(pkcs8.to_vec().into_boxed_slice()),
                public_key: key_pair.public_key().as_ref().to_vec(),
            },
        })
    }

    /// Ed25519 signing key from a raw 32-byte seed.
    ///
    /// # Errors
    ///
    /// `EmptyKeyId`, or `InvalidKeyMaterial` if the seed is not 32 bytes.
    pub fn ed25519_from_seed(kid: impl Into<String>, seed: &[u8]) -> Result<Self, KeyError> {
        if seed.len() != ED25519_KEY_BYTES {
            return Err(KeyError::InvalidKeyMaterial(format!(
                "Invalid Ed25519 seed length: {} (expected {})",
                seed.len(),
                ED25519_KEY_BYTES
            )));
        }

        Self::ed25519_from_pkcs8(kid, &pkcs8_from_seed(seed))
    }

    /// Ed25519 key pair generated with the system CSPRNG.
    ///
    /// # Errors
    ///
    /// `EmptyKeyId`, or `Generation` if generation fails.
    #[instrument(skip_all)]
    pub fn generate_ed25519(kid: impl Into<String>) -> Result<Self, KeyError> {
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&SystemRandom::new())
            .map_err(|e| KeyError::Generation(format!("Keypair generation failed: {e}")))?;

        Self::ed25519_from_pkcs8(kid, pkcs8.as_ref())
    }

    /// Verification-only Ed25519 key from raw public key bytes.
    ///
    /// # Errors
    ///
    /// `EmptyKeyId`, or `InvalidKeyMaterial` if the key is not 32 bytes.
    pub fn ed25519_public(kid: impl Into<String>, public_key: &[u8]) -> Result<Self, KeyError> {
        let kid = kid.into();
        check_kid(&kid)?;

        if public_key.len() != ED25519_KEY_BYTES {
            return Err(KeyError::InvalidKeyMaterial(format!(
                "Invalid Ed25519 public key length: {} (expected {})",
                public_key.len(),
                ED25519_KEY_BYTES
            )));
        }

        Ok(Self {
            kid,
            material: KeyMaterial::Ed25519Public(public_key.to_vec()),
        })
    }

    /// Key ID written into the token header.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Signature algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        match self.material {
            KeyMaterial::Hmac(_) => Algorithm::Hs256,
            KeyMaterial::Ed25519 { .. } | KeyMaterial::Ed25519Public(_) => Algorithm::EdDsa,
        }
    }

    /// False for verification-only keys.
    #[must_use]
    pub fn can_sign(&self) -> bool {
        !matches!(self.material, KeyMaterial::Ed25519Public(_))
    }

    /// Raw Ed25519 public key, for publishing to verifiers.
    #[must_use]
    pub fn public_key(&self) -> Option<&[u8]> {
        match &self.material {
            KeyMaterial::Hmac(_) => None,
            KeyMaterial::Ed25519 { public_key, .. } | KeyMaterial::Ed25519Public(public_key) => {
                Some(public_key.as_slice())
            }
        }
    }

    /// The part of this key a verifier needs: the public key for Ed25519, a
    /// copy of the shared secret for HMAC.
    #[must_use]
    pub fn verification_key(&self) -> SigningKey {
        let material = match &self.material {
            KeyMaterial::Hmac(secret) => {
                KeyMaterial::Hmac(SecretBox::new(secret.expose_secret().to_vec().into_boxed_slice()))
            }
            KeyMaterial::Ed25519 { public_key, .. } | KeyMaterial::Ed25519Public(public_key) => {
                KeyMaterial::Ed25519Public(public_key.clone())
            }
        };

        SigningKey {
            kid: self.kid.clone(),
            material,
        }
    }

    /// `jsonwebtoken` signing key.
    ///
    /// # Errors
    ///
    /// `Crypto` for verification-only keys.
    pub(crate) fn encoding_key(&self) -> Result<EncodingKey, TokenError> {
        match &self.material {
            KeyMaterial::Hmac(secret) => Ok(EncodingKey::from_secret(secret.expose_secret())),
            KeyMaterial::Ed25519 { pkcs8, .. } => Ok(EncodingKey::from_ed_der(pkcs8.expose_secret())),
            KeyMaterial::Ed25519Public(_) => Err(TokenError::Crypto(format!(
                "Key {} is verification-only",
                self.kid
            ))),
        }
    }

    /// `jsonwebtoken` verification key.
    pub(crate) fn decoding_key(&self) -> DecodingKey {
        match &self.material {
            KeyMaterial::Hmac(secret) => DecodingKey::from_secret(secret.expose_secret()),
            KeyMaterial::Ed25519 { public_key, .. } | KeyMaterial::Ed25519Public(public_key) => {
                DecodingKey::from_ed_der(public_key)
            }
        }
    }
}

/// Immutable snapshot of the keys in use: one current key for signing, plus
/// retired keys still accepted for verification (newest first).
#[derive(Debug)]
pub struct KeyRing {
    current: Arc<SigningKey>,
    retired: Vec<Arc<SigningKey>>,
}

impl KeyRing {
    /// Ring with a single key.
    #[must_use]
    pub fn new(current: SigningKey) -> Self {
        Self {
            current: Arc::new(current),
            retired: Vec::new(),
        }
    }

    /// Ring with retired keys, newest first.
    ///
    /// # Errors
    ///
    /// `DuplicateKeyId` if two keys share an ID.
    pub fn with_retired(
        current: Arc<SigningKey>,
        retired: Vec<Arc<SigningKey>>,
    ) -> Result<Self, KeyError> {
        let mut seen = HashSet::new();
        for key in std::iter::once(&current).chain(retired.iter()) {
            if !seen.insert(key.kid()) {
                return Err(KeyError::DuplicateKeyId(key.kid().to_string()));
            }
        }

        Ok(Self { current, retired })
    }

    /// Key used for signing.
    #[must_use]
    pub fn current(&self) -> &Arc<SigningKey> {
        &self.current
    }

    /// Retired keys, newest first.
    #[must_use]
    pub fn retired(&self) -> &[Arc<SigningKey>] {
        &self.retired
    }

    /// Every key accepted for verification: current first, then retired.
    pub fn acceptable_keys(&self) -> impl Iterator<Item = &Arc<SigningKey>> {
        std::iter::once(&self.current).chain(self.retired.iter())
    }

    /// Look up an acceptable key by ID.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Arc<SigningKey>> {
        self.acceptable_keys().find(|key| key.kid() == kid)
    }

    /// Number of acceptable keys.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.retired.len()
    }

    /// Always false: a ring has a current key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Source of signing and verification keys.
///
/// Implementations may fetch keys from an external store; failures surface as
/// `TokenError::KeyUnavailable`.
pub trait KeyProvider: Send + Sync {
    /// Consistent snapshot of the current and acceptable keys.
    fn key_ring(&self) -> Result<Arc<KeyRing>, TokenError>;

    /// Key used for signing.
    fn current_key(&self) -> Result<Arc<SigningKey>, TokenError> {
        Ok(Arc::clone(self.key_ring()?.current()))
    }

    /// Keys accepted for verification.
    fn acceptable_keys(&self) -> Result<Vec<Arc<SigningKey>>, TokenError> {
        Ok(self.key_ring()?.acceptable_keys().cloned().collect())
    }
}

/// Provider with a fixed key ring.
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    ring: Arc<KeyRing>,
}

impl StaticKeyProvider {
    /// Provider that always hands out `ring`.
    #[must_use]
    pub fn new(ring: KeyRing) -> Self {
        Self {
            ring: Arc::new(ring),
        }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn key_ring(&self) -> Result<Arc<KeyRing>, TokenError> {
        Ok(Arc::clone(&self.ring))
    }
}

/// Provider supporting zero-downtime key rotation.
///
/// The ring lives behind an `ArcSwap`: readers take a lock-free snapshot and
/// always see either the old or the new ring in full. Writers are serialized
/// by a mutex.
pub struct RotatingKeyProvider {
    ring: ArcSwap<KeyRing>,
    max_retired_keys: usize,
    write_lock: Mutex<()>,
}

impl fmt::Debug for RotatingKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingKeyProvider")
            .field("ring", &self.ring.load_full())
            .field("max_retired_keys", &self.max_retired_keys)
            .finish()
    }
}

impl RotatingKeyProvider {
    /// Provider starting from `ring`, keeping [`DEFAULT_MAX_RETIRED_KEYS`].
    #[must_use]
    pub fn new(ring: KeyRing) -> Self {
        Self::with_max_retired(ring, DEFAULT_MAX_RETIRED_KEYS)
    }

    /// Provider keeping at most `max_retired_keys` retired keys.
    #[must_use]
    pub fn with_max_retired(ring: KeyRing, max_retired_keys: usize) -> Self {
        set_acceptable_keys(ring.len());
        Self {
            ring: ArcSwap::from_pointee(ring),
            max_retired_keys,
            write_lock: Mutex::new(()),
        }
    }

    /// Make `new_key` current. The previous current key becomes the newest
    /// retired key; the oldest retired keys beyond the limit are dropped.
    ///
    /// # Errors
    ///
    /// `DuplicateKeyId` if `new_key` reuses an ID still in the ring.
    #[instrument(skip_all, fields(kid = %new_key.kid()))]
    pub fn rotate(&self, new_key: SigningKey) -> Result<(), KeyError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let old = self.ring.load_full();

        let mut retired = Vec::with_capacity(old.retired().len() + 1);
        retired.push(Arc::clone(old.current()));
        retired.extend(old.retired().iter().cloned());
        retired.truncate(self.max_retired_keys);

        let ring = match KeyRing::with_retired(Arc::new(new_key), retired) {
            Ok(ring) => ring,
            Err(e) => {
                tracing::warn!(target: "session_token.keys", error = %e, "Key rotation rejected");
                record_key_rotation("error");
                return Err(e);
            }
        };

        tracing::info!(
            target: "session_token.keys",
            new_kid = %ring.current().kid(),
            retired_kid = %old.current().kid(),
            acceptable_keys = ring.len(),
            "Signing key rotated"
        );

        set_acceptable_keys(ring.len());
        self.ring.store(Arc::new(ring));
        record_key_rotation("success");
        Ok(())
    }

    /// Stop accepting the retired key `kid`. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// `CurrentKey` if `kid` is the current signing key.
    pub fn retire(&self, kid: &str) -> Result<bool, KeyError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let old = self.ring.load_full();

        if old.current().kid() == kid {
            return Err(KeyError::CurrentKey(kid.to_string()));
        }

        let retired: Vec<_> = old
            .retired()
            .iter()
            .filter(|key| key.kid() != kid)
            .cloned()
            .collect();

        if retired.len() == old.retired().len() {
            return Ok(false);
        }

        let ring = KeyRing::with_retired(Arc::clone(old.current()), retired)?;
        tracing::info!(target: "session_token.keys", kid = %kid, "Retired key dropped from key ring");

        set_acceptable_keys(ring.len());
        self.ring.store(Arc::new(ring));
        Ok(true)
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<KeyRing> {
        self.ring.load_full()
    }
}

impl KeyProvider for RotatingKeyProvider {
    fn key_ring(&self) -> Result<Arc<KeyRing>, TokenError> {
        Ok(self.ring.load_full())
    }
}
