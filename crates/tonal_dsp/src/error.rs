//! DSP Error Types

use thiserror::Error;

/// Errors that can occur in curve evaluation and preset handling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Band count must be at least 1, got {0}")]
    InvalidBandCount(usize),

    #[error("Invalid band index: {index} (device has {band_count} bands)")]
    InvalidBandIndex { index: usize, band_count: usize },

    #[error("Level count mismatch: expected {expected}, got {got}")]
    LevelCountMismatch { expected: usize, got: usize },

    #[error("Invalid frequency range: {min}Hz..{max}Hz")]
    InvalidFrequencyRange { min: f64, max: f64 },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("Malformed preset: {0}")]
    PresetParse(String),

    #[error("Custom preset is locked")]
    PresetLocked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DspError::InvalidBandIndex {
            index: 7,
            band_count: 5,
        };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains('5'));

        let err = DspError::LevelCountMismatch {
            expected: 5,
            got: 10,
        };
        assert!(err.to_string().contains("expected 5"));
    }

    #[test]
    fn test_locked_message() {
        assert!(DspError::PresetLocked.to_string().contains("locked"));
    }
}
