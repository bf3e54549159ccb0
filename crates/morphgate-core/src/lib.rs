//! morphgate core: filter-policy primitives and error types.
//!
//! This crate defines the admin-facing filter contracts and the error surface
//! shared by the host runtime and tooling. It intentionally carries no
//! transport or runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `MorphGateError`/`Result` so a host
//! process never crashes on malformed configuration.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod filter;

/// Shared result type.
pub use error::{MorphGateError, Result};
