//! Shared error type across morphgate crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, MorphGateError>;

/// Unified error type used by core and host.
#[derive(Debug, Error)]
pub enum MorphGateError {
    /// The settings store could not be reached at all. Fatal at bootstrap.
    #[error("settings unavailable: {0}")]
    SettingsUnavailable(String),
    /// The settings document exists but is not structurally parseable.
    #[error("invalid settings: {0}")]
    BadSettings(String),
    /// A transform step reported failure while handling a request.
    #[error("transform failed: {0}")]
    Transform(String),
    #[error("internal: {0}")]
    Internal(String),
}
