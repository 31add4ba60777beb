//! Effect Backend Variants
//!
//! A closed set of [`EffectBackend`](crate::EffectBackend) implementations.
//! Each variant embeds an [`EqualizerCapability`] and composes whatever
//! other primitives its host provides.

mod generic;
mod vendor;

pub use generic::GenericEffectSet;
pub use vendor::{VendorEffectSet, VENDOR_RELEASE_DELAY};

use crate::error::{PlatformError, PlatformResult};
use crate::host::{db_to_millibels, EqualizerUnit};

/// Equalizer wrapper shared by all variants: dB in, clamped millibels out
pub struct EqualizerCapability {
    unit: Box<dyn EqualizerUnit>,
    band_count: usize,
    range_mb: (i16, i16),
}

impl EqualizerCapability {
    pub fn new(unit: Box<dyn EqualizerUnit>) -> Self {
        let band_count = unit.band_count();
        let range_mb = unit.level_range_mb();
        Self {
            unit,
            band_count,
            range_mb,
        }
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn set_enabled(&mut self, enabled: bool) -> PlatformResult<()> {
        self.unit.set_enabled(enabled)
    }

    pub fn set_levels(&mut self, levels_db: &[f32]) -> PlatformResult<()> {
        if levels_db.len() != self.band_count {
            return Err(PlatformError::effect(
                "equalizer",
                format!(
                    "expected {} levels, got {}",
                    self.band_count,
                    levels_db.len()
                ),
            ));
        }
        for (band, level_db) in levels_db.iter().enumerate() {
            self.write_band(band, *level_db)?;
        }
        Ok(())
    }

    pub fn set_band_level(&mut self, band: usize, level_db: f32) -> PlatformResult<()> {
        if band >= self.band_count {
            return Err(PlatformError::InvalidBand {
                band,
                band_count: self.band_count,
            });
        }
        self.write_band(band, level_db)
    }

    fn write_band(&mut self, band: usize, level_db: f32) -> PlatformResult<()> {
        let (min, max) = self.range_mb;
        let level_mb = db_to_millibels(level_db).clamp(min, max);
        self.unit.set_band_level_mb(band, level_mb)
    }

    pub fn release(&mut self) {
        self.unit.release();
    }
}
