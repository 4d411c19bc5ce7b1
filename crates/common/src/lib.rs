//! Common utilities shared across the session token crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for compact token format utilities (size limits, segments, headers)
pub mod jwt;
