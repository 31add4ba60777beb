//! Vendor Effect Set
//!
//! Drives a vendor processing bundle alongside the standard equalizer.
//! Parameter writes made between `begin_update` and `commit_update` are
//! queued and flushed to the bundle as one batch.

use std::time::Duration;

use tracing::{debug, warn};

use super::EqualizerCapability;
use crate::device::OutputDevice;
use crate::error::{PlatformError, PlatformResult};
use crate::host::{clamp_strength, EffectHost, VendorBundle, VendorParam};
use crate::traits::{EffectBackend, SessionId};

/// Grace period before a closed session's bundle is torn down
///
/// Vendor bundles are slow to build; a session that reopens shortly after
/// closing (track change, seek) keeps its instance.
pub const VENDOR_RELEASE_DELAY: Duration = Duration::from_secs(10);

pub struct VendorEffectSet {
    session: SessionId,
    equalizer: EqualizerCapability,
    bundle: Box<dyn VendorBundle>,
    pending: Vec<VendorParam>,
    in_update: bool,
    released: bool,
}

impl VendorEffectSet {
    pub fn new(host: &dyn EffectHost, session: SessionId) -> PlatformResult<Self> {
        let mut bundle = host.vendor_bundle(session)?;
        let equalizer = match host.equalizer(session) {
            Ok(unit) => EqualizerCapability::new(unit),
            Err(e) => {
                bundle.release();
                return Err(e);
            }
        };
        debug!(
            "Vendor effect set for session {}: bands={}",
            session,
            equalizer.band_count()
        );
        Ok(Self {
            session,
            equalizer,
            bundle,
            pending: Vec::new(),
            in_update: false,
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

    /// Queue inside a transaction, otherwise write straight through
    fn write(&mut self, param: VendorParam) -> PlatformResult<()> {
        self.ensure_live()?;
        if self.in_update {
            self.pending.push(param);
            Ok(())
        } else {
            self.bundle.apply(&[param])
        }
    }
}

impl EffectBackend for VendorEffectSet {
    fn name(&self) -> &'static str {
        "vendor"
    }

    fn session_id(&self) -> SessionId {
        self.session
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if !self.pending.is_empty() {
            debug!(
                "Session {}: dropping {} queued vendor writes on release",
                self.session,
                self.pending.len()
            );
            self.pending.clear();
        }
        self.bundle.release();
        self.equalizer.release();
        self.released = true;
    }

    fn set_global_enabled(&mut self, enabled: bool) -> PlatformResult<()> {
        self.ensure_live()?;
        self.bundle.set_master_enabled(enabled)
    }

    fn set_device(&mut self, device: &OutputDevice) -> PlatformResult<()> {
        self.ensure_live()?;
        self.bundle.set_output_device(device)
    }

    fn begin_update(&mut self) -> bool {
        if self.released {
            return false;
        }
        if self.in_update {
            warn!(
                "Session {}: nested vendor update, discarding {} queued writes",
                self.session,
                self.pending.len()
            );
        }
        self.pending.clear();
        self.in_update = true;
        true
    }

    fn commit_update(&mut self) -> bool {
        if !self.in_update || self.released {
            return false;
        }
        self.in_update = false;
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return true;
        }
        match self.bundle.apply(&batch) {
            Ok(()) => true,
            Err(e) => {
                warn!("Session {}: vendor batch failed: {}", self.session, e);
                false
            }
        }
    }

    fn release_delay(&self) -> Duration {
        VENDOR_RELEASE_DELAY
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
        true
    }

    fn enable_bass_boost(&mut self, enabled: bool) -> PlatformResult<()> {
        self.write(VendorParam::BassEnabled(enabled))
    }

    fn set_bass_boost_strength(&mut self, strength: u16) -> PlatformResult<()> {
        self.write(VendorParam::BassStrength(clamp_strength(strength)))
    }

    fn has_virtualizer(&self) -> bool {
        true
    }

    fn enable_virtualizer(&mut self, enabled: bool) -> PlatformResult<()> {
        self.write(VendorParam::VirtualizerEnabled(enabled))
    }

    fn set_virtualizer_strength(&mut self, strength: u16) -> PlatformResult<()> {
        self.write(VendorParam::VirtualizerStrength(clamp_strength(strength)))
    }

    fn has_treble_boost(&self) -> bool {
        true
    }

    fn enable_treble_boost(&mut self, enabled: bool) -> PlatformResult<()> {
        self.write(VendorParam::TrebleEnabled(enabled))
    }

    fn set_treble_boost_strength(&mut self, strength: u16) -> PlatformResult<()> {
        self.write(VendorParam::TrebleStrength(clamp_strength(strength)))
    }

    fn has_volume_boost(&self) -> bool {
        true
    }

    fn enable_volume_boost(&mut self, enabled: bool) -> PlatformResult<()> {
        self.write(VendorParam::VolumeBoostEnabled(enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubEffectHost;

    fn vendor_set(host: &StubEffectHost, session: SessionId) -> VendorEffectSet {
        VendorEffectSet::new(host, session).unwrap()
    }

    #[test]
    fn test_requires_vendor_bundle() {
        let host = StubEffectHost::new();
        assert!(VendorEffectSet::new(&host, 1).is_err());
    }

    #[test]
    fn test_bundle_released_when_equalizer_fails() {
        let host = StubEffectHost::new().with_vendor_bundle();
        host.fail_equalizer(3);
        assert!(VendorEffectSet::new(&host, 3).is_err());
        assert!(host.session_state(3).unwrap().released);
    }

    #[test]
    fn test_capabilities() {
        let host = StubEffectHost::new().with_vendor_bundle();
        let set = vendor_set(&host, 1);
        assert_eq!(set.name(), "vendor");
        assert!(set.has_treble_boost());
        assert!(set.has_volume_boost());
        assert!(!set.has_reverb());
        assert_eq!(set.release_delay(), VENDOR_RELEASE_DELAY);
    }

    #[test]
    fn test_writes_batched_until_commit() {
        let host = StubEffectHost::new().with_vendor_bundle();
        let mut set = vendor_set(&host, 2);

        assert!(set.begin_update());
        set.enable_bass_boost(true).unwrap();
        set.set_bass_boost_strength(650).unwrap();
        set.enable_treble_boost(true).unwrap();

        let state = host.session_state(2).unwrap();
        assert_eq!(state.vendor_batches, 0);
        assert_eq!(state.bass, (false, 0));

        assert!(set.commit_update());
        let state = host.session_state(2).unwrap();
        assert_eq!(state.vendor_batches, 1);
        assert_eq!(state.bass, (true, 650));
        assert!(state.treble.0);
    }

    #[test]
    fn test_write_through_outside_update() {
        let host = StubEffectHost::new().with_vendor_bundle();
        let mut set = vendor_set(&host, 3);
        set.enable_volume_boost(true).unwrap();
        let state = host.session_state(3).unwrap();
        assert!(state.volume_boost);
        assert_eq!(state.vendor_batches, 1);
    }

    #[test]
    fn test_empty_commit_skips_bundle() {
        let host = StubEffectHost::new().with_vendor_bundle();
        let mut set = vendor_set(&host, 4);
        assert!(set.begin_update());
        assert!(set.commit_update());
        assert_eq!(host.session_state(4).unwrap().vendor_batches, 0);
        // No open transaction
        assert!(!set.commit_update());
    }

    #[test]
    fn test_master_and_device() {
        let host = StubEffectHost::new().with_vendor_bundle();
        let mut set = vendor_set(&host, 5);
        set.set_global_enabled(true).unwrap();
        set.set_device(&OutputDevice::speaker()).unwrap();
        let state = host.session_state(5).unwrap();
        assert!(state.master_enabled);
        assert_eq!(state.device.as_deref(), Some("speaker"));
    }

    #[test]
    fn test_release_refuses_updates() {
        let host = StubEffectHost::new().with_vendor_bundle();
        let mut set = vendor_set(&host, 6);
        set.release();
        assert!(host.session_state(6).unwrap().released);
        assert!(!set.begin_update());
        assert_eq!(set.enable_bass_boost(true), Err(PlatformError::Released));
    }
}
