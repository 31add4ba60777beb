//! Platform Error Types

use thiserror::Error;

/// Errors from effect backends and the platform effect host
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    #[error("Failed to create effect backend: {0}")]
    BackendCreation(String),

    #[error("Effect not supported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("Effect {effect} failed: {reason}")]
    EffectFailed { effect: &'static str, reason: String },

    #[error("Invalid equalizer band {band} (backend has {band_count})")]
    InvalidBand { band: usize, band_count: usize },

    #[error("Effect backend already released")]
    Released,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

impl PlatformError {
    /// Shorthand for a failed effect call
    pub fn effect(effect: &'static str, reason: impl Into<String>) -> Self {
        PlatformError::EffectFailed {
            effect,
            reason: reason.into(),
        }
    }
}
