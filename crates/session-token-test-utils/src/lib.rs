//! # Session Token Test Utilities
//!
//! Shared test utilities for the session token crates.
//!
//! This crate provides:
//! - Deterministic key fixtures (fixed secrets and seeds for reproducible tests)
//! - A manually driven clock for pinning tokens to exact boundaries
//! - Claim set builders (`TestClaimsBuilder`)
//! - Custom assertions (`TokenAssertions` trait)
//! - Test log setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_token_test_utils::*;
//!
//! #[test]
//! fn test_example() -> anyhow::Result<()> {
//!     let clock = ManualClock::at_test_epoch();
//!     let manager = test_manager(test_hmac_key("k1", 1)?, clock.clone())?;
//!
//!     let token = manager.issue(test_principal())?;
//!     token.assert_compact_format().assert_signed_by("k1");
//!
//!     clock.advance(3601);
//!     assert!(manager.verify(&token).is_err());
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod manual_clock;
pub mod token_builders;
pub mod tracing_init;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use manual_clock::*;
pub use token_builders::*;
pub use tracing_init::*;
