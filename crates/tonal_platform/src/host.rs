//! Platform Effect Primitives
//!
//! The opaque audio-effects API of the host OS, reduced to the handful of
//! capabilities the backends compose. Levels cross this boundary in
//! millibels and strengths in per-mille (0..=1000), the units such APIs use.

use crate::device::OutputDevice;
use crate::error::{PlatformError, PlatformResult};
use crate::traits::{EqualizerLayout, SessionId};

/// Upper bound for strength-style parameters
pub const MAX_STRENGTH: u16 = 1000;

/// Per-session equalizer instance
pub trait EqualizerUnit: Send {
    fn band_count(&self) -> usize;

    /// Settable level range in millibels (min, max)
    fn level_range_mb(&self) -> (i16, i16);

    fn set_enabled(&mut self, enabled: bool) -> PlatformResult<()>;

    fn set_band_level_mb(&mut self, band: usize, level_mb: i16) -> PlatformResult<()>;

    fn release(&mut self);
}

/// Effect driven by an on/off switch and a single strength (bass, virtualizer)
pub trait StrengthUnit: Send {
    fn set_enabled(&mut self, enabled: bool) -> PlatformResult<()>;

    fn set_strength(&mut self, strength: u16) -> PlatformResult<()>;

    fn release(&mut self);
}

/// Preset reverb instance
pub trait ReverbUnit: Send {
    fn set_enabled(&mut self, enabled: bool) -> PlatformResult<()>;

    fn set_preset(&mut self, preset: u16) -> PlatformResult<()>;

    fn release(&mut self);
}

/// One parameter write to a vendor effect bundle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VendorParam {
    BassEnabled(bool),
    BassStrength(u16),
    VirtualizerEnabled(bool),
    VirtualizerStrength(u16),
    TrebleEnabled(bool),
    TrebleStrength(u16),
    VolumeBoostEnabled(bool),
}

/// Vendor effect bundle: one processor with many parameters and a master switch
pub trait VendorBundle: Send {
    fn set_master_enabled(&mut self, enabled: bool) -> PlatformResult<()>;

    fn set_output_device(&mut self, device: &OutputDevice) -> PlatformResult<()>;

    /// Apply a batch of parameter writes in order
    fn apply(&mut self, params: &[VendorParam]) -> PlatformResult<()>;

    fn release(&mut self);
}

/// Factory for the platform's effect primitives
pub trait EffectHost: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Equalizer band layout shared by every session
    fn equalizer_layout(&self) -> EqualizerLayout;

    fn equalizer(&self, session: SessionId) -> PlatformResult<Box<dyn EqualizerUnit>>;

    /// `Ok(None)` when the platform has no such effect
    fn bass_boost(&self, session: SessionId) -> PlatformResult<Option<Box<dyn StrengthUnit>>>;

    fn virtualizer(&self, session: SessionId) -> PlatformResult<Option<Box<dyn StrengthUnit>>>;

    fn reverb(&self, session: SessionId) -> PlatformResult<Option<Box<dyn ReverbUnit>>>;

    fn has_vendor_bundle(&self) -> bool {
        false
    }

    fn vendor_bundle(&self, _session: SessionId) -> PlatformResult<Box<dyn VendorBundle>> {
        Err(PlatformError::Unsupported("vendor bundle"))
    }
}

/// Convert dB to millibels, saturating at the i16 range
pub fn db_to_millibels(level_db: f32) -> i16 {
    (level_db * 100.0)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Clamp a strength to [`MAX_STRENGTH`]
pub fn clamp_strength(strength: u16) -> u16 {
    strength.min(MAX_STRENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_millibels() {
        assert_eq!(db_to_millibels(0.0), 0);
        assert_eq!(db_to_millibels(-15.0), -1500);
        assert_eq!(db_to_millibels(3.456), 346);
        assert_eq!(db_to_millibels(1.0e6), i16::MAX);
        assert_eq!(db_to_millibels(-1.0e6), i16::MIN);
    }

    #[test]
    fn test_clamp_strength() {
        assert_eq!(clamp_strength(50), 50);
        assert_eq!(clamp_strength(1000), 1000);
        assert_eq!(clamp_strength(4000), MAX_STRENGTH);
    }
}
