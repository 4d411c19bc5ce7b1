//! Secret types for protecting key material from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for signing secrets, private keys,
//! and configuration values that carry key material.
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so a
//! struct that derives `Debug` and holds one of them logs safely via `{:?}`
//! or `tracing`. Contents are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretBox};
//!
//! let secret: SecretBox<[u8]> = SecretBox::new(b"0123456789abcdef0123456789abcdef".to_vec().into());
//!
//! // Redacted
//! println!("{:?}", secret);
//!
//! // Explicit access only
//! assert_eq!(secret.expose_secret().len(), 32);
//! ```
//!
//! Use `SecretString` for:
//! - Base64-encoded signing secrets read from the environment
//!
//! Use `SecretBox<[u8]>` for:
//! - Raw HMAC key bytes
//! - PKCS#8 private key documents

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
