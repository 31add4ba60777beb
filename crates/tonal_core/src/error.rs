//! Core Error Types

use thiserror::Error;

/// Errors surfaced by the coordinator, stores and service
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid session id: {0}")]
    InvalidSession(i32),

    #[error("Channel send error - session worker stopped")]
    ChannelSend,

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(String),

    #[error("Configuration store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("DSP error: {0}")]
    Dsp(#[from] tonal_dsp::DspError),

    #[error("Platform error: {0}")]
    Platform(#[from] tonal_platform::PlatformError),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
