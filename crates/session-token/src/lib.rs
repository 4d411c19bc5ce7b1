//! Session Token Library
//!
//! Issues, verifies, and refreshes signed, self-contained session tokens.
//! Any holder of an acceptable key can validate a token without a lookup;
//! an optional session registry adds revocation.
//!
//! # Modules
//!
//! - `claims` - Claim set and principal types
//! - `clock` - Injectable time source
//! - `codec` - Compact signed token encoding and verification
//! - `config` - Lifetime policy and key configuration
//! - `errors` - Error types
//! - `keys` - Signing keys, key rings, and rotation
//! - `lifecycle` - Issue / verify / refresh
//! - `observability` - Log correlation and metrics
//! - `registry` - Session revocation

pub mod claims;
pub mod clock;
pub mod codec;
pub mod config;
pub mod errors;
pub mod keys;
pub mod lifecycle;
pub mod observability;
pub mod registry;

pub use claims::{ClaimSet, Principal};
pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, KeySettings, TokenConfig};
pub use errors::TokenError;
pub use keys::{
    Algorithm, KeyError, KeyProvider, KeyRing, RotatingKeyProvider, SigningKey,
    StaticKeyProvider,
};
pub use lifecycle::TokenLifecycleManager;
pub use registry::{InMemorySessionRegistry, RegistryError, SessionRegistry};
