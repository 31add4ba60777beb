//! Effect Backend Trait
//!
//! Defines the interface every effect set attached to a playback session
//! must provide. One backend instance belongs to exactly one session and is
//! only ever driven from a single thread at a time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::OutputDevice;
use crate::error::{PlatformError, PlatformResult};

/// Platform-assigned playback session identifier (valid ids are > 0)
pub type SessionId = i32;

/// Equalizer band layout exposed by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerLayout {
    /// Band centre frequencies in Hz, ascending
    pub center_freqs_hz: Vec<f64>,

    /// Lowest settable band level (dB)
    pub min_level_db: f32,

    /// Highest settable band level (dB)
    pub max_level_db: f32,
}

impl EqualizerLayout {
    pub fn band_count(&self) -> usize {
        self.center_freqs_hz.len()
    }
}

impl Default for EqualizerLayout {
    /// Common 5-band phone layout
    fn default() -> Self {
        Self {
            center_freqs_hz: vec![60.0, 230.0, 910.0, 3600.0, 14000.0],
            min_level_db: -15.0,
            max_level_db: 15.0,
        }
    }
}

/// A live set of effect processors bound to one playback session
///
/// Optional effects default to "absent": `has_*` returns false and the
/// setters return [`PlatformError::Unsupported`].
pub trait EffectBackend: Send {
    /// Backend variant name, for logging
    fn name(&self) -> &'static str;

    /// Session this backend is attached to
    fn session_id(&self) -> SessionId;

    /// Free all underlying effect resources
    fn release(&mut self);

    /// Master switch; when off all effects are bypassed
    fn set_global_enabled(&mut self, enabled: bool) -> PlatformResult<()>;

    /// Inform the backend of the active output device
    fn set_device(&mut self, device: &OutputDevice) -> PlatformResult<()>;

    /// Open a bulk parameter update; returns false if the backend refused
    fn begin_update(&mut self) -> bool {
        true
    }

    /// Close a bulk parameter update; returns false if the flush failed
    fn commit_update(&mut self) -> bool {
        true
    }

    /// How long to keep this backend alive after its session closes
    fn release_delay(&self) -> Duration {
        Duration::ZERO
    }

    // === Equalizer ===

    fn has_equalizer(&self) -> bool {
        true
    }

    fn equalizer_band_count(&self) -> usize;

    fn enable_equalizer(&mut self, enabled: bool) -> PlatformResult<()>;

    /// Set every band at once (dB, one entry per band)
    fn set_equalizer_levels(&mut self, levels_db: &[f32]) -> PlatformResult<()>;

    /// Set a single band (dB)
    fn set_equalizer_band_level(&mut self, band: usize, level_db: f32) -> PlatformResult<()>;

    // === Bass boost ===

    fn has_bass_boost(&self) -> bool {
        false
    }

    fn enable_bass_boost(&mut self, _enabled: bool) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("bass boost"))
    }

    fn set_bass_boost_strength(&mut self, _strength: u16) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("bass boost"))
    }

    // === Virtualizer ===

    fn has_virtualizer(&self) -> bool {
        false
    }

    fn enable_virtualizer(&mut self, _enabled: bool) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("virtualizer"))
    }

    fn set_virtualizer_strength(&mut self, _strength: u16) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("virtualizer"))
    }

    // === Treble boost ===

    fn has_treble_boost(&self) -> bool {
        false
    }

    fn enable_treble_boost(&mut self, _enabled: bool) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("treble boost"))
    }

    fn set_treble_boost_strength(&mut self, _strength: u16) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("treble boost"))
    }

    // === Reverb ===

    fn has_reverb(&self) -> bool {
        false
    }

    fn enable_reverb(&mut self, _enabled: bool) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("reverb"))
    }

    fn set_reverb_preset(&mut self, _preset: u16) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("reverb"))
    }

    // === Volume boost ===

    fn has_volume_boost(&self) -> bool {
        false
    }

    fn enable_volume_boost(&mut self, _enabled: bool) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("volume boost"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EqOnly;

    impl EffectBackend for EqOnly {
        fn name(&self) -> &'static str {
            "eq-only"
        }
        fn session_id(&self) -> SessionId {
            1
        }
        fn release(&mut self) {}
        fn set_global_enabled(&mut self, _enabled: bool) -> PlatformResult<()> {
            Ok(())
        }
        fn set_device(&mut self, _device: &OutputDevice) -> PlatformResult<()> {
            Ok(())
        }
        fn equalizer_band_count(&self) -> usize {
            5
        }
        fn enable_equalizer(&mut self, _enabled: bool) -> PlatformResult<()> {
            Ok(())
        }
        fn set_equalizer_levels(&mut self, _levels_db: &[f32]) -> PlatformResult<()> {
            Ok(())
        }
        fn set_equalizer_band_level(&mut self, _band: usize, _level_db: f32) -> PlatformResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_optional_effects_default_to_absent() {
        let mut backend = EqOnly;
        assert!(backend.has_equalizer());
        assert!(!backend.has_bass_boost());
        assert!(!backend.has_reverb());
        assert_eq!(
            backend.enable_bass_boost(true),
            Err(PlatformError::Unsupported("bass boost"))
        );
        assert_eq!(backend.release_delay(), Duration::ZERO);
        assert!(backend.begin_update());
        assert!(backend.commit_update());
    }

    #[test]
    fn test_default_layout() {
        let layout = EqualizerLayout::default();
        assert_eq!(layout.band_count(), 5);
        assert!(layout.center_freqs_hz.windows(2).all(|w| w[1] > w[0]));
        assert!(layout.min_level_db < layout.max_level_db);
    }
}
