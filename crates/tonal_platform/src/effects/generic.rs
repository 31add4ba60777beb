//! Generic Effect Set
//!
//! Built from the standard per-session primitives: an equalizer plus
//! whichever of bass boost, virtualizer and preset reverb the host offers.
//! Has no transaction support of its own and needs no release grace period.

use tracing::{debug, warn};

use super::EqualizerCapability;
use crate::device::OutputDevice;
use crate::error::{PlatformError, PlatformResult};
use crate::host::{clamp_strength, EffectHost, ReverbUnit, StrengthUnit};
use crate::traits::{EffectBackend, SessionId};

pub struct GenericEffectSet {
    session: SessionId,
    equalizer: EqualizerCapability,
    bass: Option<Box<dyn StrengthUnit>>,
    virtualizer: Option<Box<dyn StrengthUnit>>,
    reverb: Option<Box<dyn ReverbUnit>>,
    released: bool,
}

impl GenericEffectSet {
    /// Attach to `session`; optional effects that fail to initialise are left out
    pub fn new(host: &dyn EffectHost, session: SessionId) -> PlatformResult<Self> {
        let equalizer = EqualizerCapability::new(host.equalizer(session)?);

        let bass = optional(host.bass_boost(session), session, "bass boost");
        let virtualizer = optional(host.virtualizer(session), session, "virtualizer");
        let reverb = optional(host.reverb(session), session, "reverb");

        debug!(
            "Generic effect set for session {}: bands={} bass={} virtualizer={} reverb={}",
            session,
            equalizer.band_count(),
            bass.is_some(),
            virtualizer.is_some(),
            reverb.is_some()
        );

        Ok(Self {
            session,
            equalizer,
            bass,
            virtualizer,
            reverb,
            released: false,
        })
    }

    fn ensure_live(&self) -> PlatformResult<()> {
        if self.released {
            Err(PlatformError::Released)
        } else {
            Ok(())
        }
    }

    /// Disable every unit, returning the first error after trying them all
    fn disable_all(&mut self) -> PlatformResult<()> {
        let mut results = vec![self.equalizer.set_enabled(false)];
        if let Some(bass) = self.bass.as_mut() {
            results.push(bass.set_enabled(false));
        }
        if let Some(virtualizer) = self.virtualizer.as_mut() {
            results.push(virtualizer.set_enabled(false));
        }
        if let Some(reverb) = self.reverb.as_mut() {
            results.push(reverb.set_enabled(false));
        }
        results.into_iter().collect()
    }
}

fn optional<T: ?Sized>(
    created: PlatformResult<Option<Box<T>>>,
    session: SessionId,
    effect: &str,
) -> Option<Box<T>> {
    match created {
        Ok(unit) => unit,
        Err(e) => {
            warn!("Session {}: {} unavailable: {}", session, effect, e);
            None
        }
    }
}

impl EffectBackend for GenericEffectSet {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn session_id(&self) -> SessionId {
        self.session
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.equalizer.release();
        if let Some(bass) = self.bass.as_mut() {
            bass.release();
        }
        if let Some(virtualizer) = self.virtualizer.as_mut() {
            virtualizer.release();
        }
        if let Some(reverb) = self.reverb.as_mut() {
            reverb.release();
        }
        self.released = true;
    }

    fn set_global_enabled(&mut self, enabled: bool) -> PlatformResult<()> {
        self.ensure_live()?;
        if enabled {
            // Individual enables are pushed right after by the caller
            Ok(())
        } else {
            self.disable_all()
        }
    }

    fn set_device(&mut self, device: &OutputDevice) -> PlatformResult<()> {
        self.ensure_live()?;
        debug!("Session {} now routed to {}", self.session, device);
        Ok(())
    }

    fn equalizer_band_count(&self) -> usize {
        self.equalizer.band_count()
    }

    fn enable_equalizer(&mut self, enabled: bool) -> PlatformResult<()> {
        self.ensure_live()?;
        self.equalizer.set_enabled(enabled)
    }

    fn set_equalizer_levels(&mut self, levels_db: &[f32]) -> PlatformResult<()> {
        self.ensure_live()?;
        self.equalizer.set_levels(levels_db)
    }

    fn set_equalizer_band_level(&mut self, band: usize, level_db: f32) -> PlatformResult<()> {
        self.ensure_live()?;
        self.equalizer.set_band_level(band, level_db)
    }

    fn has_bass_boost(&self) -> bool {
        self.bass.is_some()
    }

    fn enable_bass_boost(&mut self, enabled: bool) -> PlatformResult<()> {
        self.ensure_live()?;
        self.bass
            .as_mut()
            .ok_or(PlatformError::Unsupported("bass boost"))?
            .set_enabled(enabled)
    }

    fn set_bass_boost_strength(&mut self, strength: u16) -> PlatformResult<()> {
        self.ensure_live()?;
        self.bass
            .as_mut()
            .ok_or(PlatformError::Unsupported("bass boost"))?
            .set_strength(clamp_strength(strength))
    }

    fn has_virtualizer(&self) -> bool {
        self.virtualizer.is_some()
    }

    fn enable_virtualizer(&mut self, enabled: bool) -> PlatformResult<()> {
        self.ensure_live()?;
        self.virtualizer
            .as_mut()
            .ok_or(PlatformError::Unsupported("virtualizer"))?
            .set_enabled(enabled)
    }

    fn set_virtualizer_strength(&mut self, strength: u16) -> PlatformResult<()> {
        self.ensure_live()?;
        self.virtualizer
            .as_mut()
            .ok_or(PlatformError::Unsupported("virtualizer"))?
            .set_strength(clamp_strength(strength))
    }

    fn has_reverb(&self) -> bool {
        self.reverb.is_some()
    }

    fn enable_reverb(&mut self, enabled: bool) -> PlatformResult<()> {
        self.ensure_live()?;
        self.reverb
            .as_mut()
            .ok_or(PlatformError::Unsupported("reverb"))?
            .set_enabled(enabled)
    }

    fn set_reverb_preset(&mut self, preset: u16) -> PlatformResult<()> {
        self.ensure_live()?;
        self.reverb
            .as_mut()
            .ok_or(PlatformError::Unsupported("reverb"))?
            .set_preset(preset)
    }
}
