//! In-Memory Platform
//!
//! A software stand-in for the OS effect API and audio routing, used on
//! hosts without one and throughout the test suites. Every write lands in a
//! per-session [`StubSessionState`] that callers can inspect.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::device::{DeviceKind, DeviceMask, OutputDevice};
use crate::error::{PlatformError, PlatformResult};
use crate::host::{EffectHost, EqualizerUnit, ReverbUnit, StrengthUnit, VendorBundle, VendorParam};
use crate::routing::{RoutingCallback, RoutingSource};
use crate::traits::{EqualizerLayout, SessionId};

/// Everything the stub host has been told about one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StubSessionState {
    pub equalizer_enabled: bool,
    pub band_levels_mb: Vec<i16>,
    /// (enabled, strength)
    pub bass: (bool, u16),
    pub virtualizer: (bool, u16),
    pub treble: (bool, u16),
    /// (enabled, preset)
    pub reverb: (bool, u16),
    pub volume_boost: bool,
    pub master_enabled: bool,
    /// Id of the last output device pushed to the vendor bundle
    pub device: Option<String>,
    /// Number of non-empty batches the vendor bundle applied
    pub vendor_batches: usize,
    pub released: bool,
}

type SessionTable = Arc<Mutex<HashMap<SessionId, StubSessionState>>>;

fn with_state<R>(
    table: &SessionTable,
    session: SessionId,
    f: impl FnOnce(&mut StubSessionState) -> R,
) -> R {
    let mut sessions = table.lock();
    f(sessions.entry(session).or_default())
}

/// Effect host backed by plain memory
pub struct StubEffectHost {
    layout: EqualizerLayout,
    vendor: bool,
    reverb: bool,
    sessions: SessionTable,
    failing: Mutex<HashSet<SessionId>>,
    failing_equalizer: Mutex<HashSet<SessionId>>,
}

impl StubEffectHost {
    pub fn new() -> Self {
        Self::with_layout(EqualizerLayout::default())
    }

    pub fn with_layout(layout: EqualizerLayout) -> Self {
        Self {
            layout,
            vendor: false,
            reverb: true,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            failing: Mutex::new(HashSet::new()),
            failing_equalizer: Mutex::new(HashSet::new()),
        }
    }

    /// Also offer a vendor bundle
    pub fn with_vendor_bundle(mut self) -> Self {
        self.vendor = true;
        self
    }

    pub fn without_reverb(mut self) -> Self {
        self.reverb = false;
        self
    }

    /// Make every future equalizer/bundle creation for `session` fail
    pub fn fail_session(&self, session: SessionId) {
        self.failing.lock().insert(session);
    }

    /// Make only equalizer creation for `session` fail
    pub fn fail_equalizer(&self, session: SessionId) {
        self.failing_equalizer.lock().insert(session);
    }

    pub fn session_state(&self, session: SessionId) -> Option<StubSessionState> {
        self.sessions.lock().get(&session).cloned()
    }

    fn check_session(&self, session: SessionId) -> PlatformResult<()> {
        if self.failing.lock().contains(&session) {
            Err(PlatformError::BackendCreation(format!(
                "session {} rejected by stub host",
                session
            )))
        } else {
            Ok(())
        }
    }
}

impl Default for StubEffectHost {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectHost for StubEffectHost {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn equalizer_layout(&self) -> EqualizerLayout {
        self.layout.clone()
    }

    fn equalizer(&self, session: SessionId) -> PlatformResult<Box<dyn EqualizerUnit>> {
        self.check_session(session)?;
        if self.failing_equalizer.lock().contains(&session) {
            return Err(PlatformError::effect("equalizer", "no free instance"));
        }
        let band_count = self.layout.band_count();
        with_state(&self.sessions, session, |state| {
            state.band_levels_mb = vec![0; band_count];
            state.released = false;
        });
        Ok(Box::new(StubEqualizer {
            session,
            band_count,
            range_mb: (
                crate::host::db_to_millibels(self.layout.min_level_db),
                crate::host::db_to_millibels(self.layout.max_level_db),
            ),
            sessions: Arc::clone(&self.sessions),
        }))
    }

    fn bass_boost(&self, session: SessionId) -> PlatformResult<Option<Box<dyn StrengthUnit>>> {
        Ok(Some(Box::new(StubStrength {
            session,
            slot: StrengthSlot::Bass,
            sessions: Arc::clone(&self.sessions),
        })))
    }

    fn virtualizer(&self, session: SessionId) -> PlatformResult<Option<Box<dyn StrengthUnit>>> {
        Ok(Some(Box::new(StubStrength {
            session,
            slot: StrengthSlot::Virtualizer,
            sessions: Arc::clone(&self.sessions),
        })))
    }

    fn reverb(&self, session: SessionId) -> PlatformResult<Option<Box<dyn ReverbUnit>>> {
        if !self.reverb {
            return Ok(None);
        }
        Ok(Some(Box::new(StubReverb {
            session,
            sessions: Arc::clone(&self.sessions),
        })))
    }

    fn has_vendor_bundle(&self) -> bool {
        self.vendor
    }

    fn vendor_bundle(&self, session: SessionId) -> PlatformResult<Box<dyn VendorBundle>> {
        if !self.vendor {
            return Err(PlatformError::Unsupported("vendor bundle"));
        }
        self.check_session(session)?;
        Ok(Box::new(StubBundle {
            session,
            sessions: Arc::clone(&self.sessions),
        }))
    }
}

struct StubEqualizer {
    session: SessionId,
    band_count: usize,
    range_mb: (i16, i16),
    sessions: SessionTable,
}

impl EqualizerUnit for StubEqualizer {
    fn band_count(&self) -> usize {
        self.band_count
    }

    fn level_range_mb(&self) -> (i16, i16) {
        self.range_mb
    }

    fn set_enabled(&mut self, enabled: bool) -> PlatformResult<()> {
        with_state(&self.sessions, self.session, |s| s.equalizer_enabled = enabled);
        Ok(())
    }

    fn set_band_level_mb(&mut self, band: usize, level_mb: i16) -> PlatformResult<()> {
        with_state(&self.sessions, self.session, |s| {
            if let Some(slot) = s.band_levels_mb.get_mut(band) {
                *slot = level_mb;
            }
        });
        Ok(())
    }

    fn release(&mut self) {
        with_state(&self.sessions, self.session, |s| s.released = true);
    }
}

#[derive(Clone, Copy)]
enum StrengthSlot {
    Bass,
    Virtualizer,
}

struct StubStrength {
    session: SessionId,
    slot: StrengthSlot,
    sessions: SessionTable,
}

impl StubStrength {
    fn slot<'a>(&self, state: &'a mut StubSessionState) -> &'a mut (bool, u16) {
        match self.slot {
            StrengthSlot::Bass => &mut state.bass,
            StrengthSlot::Virtualizer => &mut state.virtualizer,
        }
    }
}

impl StrengthUnit for StubStrength {
    fn set_enabled(&mut self, enabled: bool) -> PlatformResult<()> {
        with_state(&self.sessions, self.session, |s| self.slot(s).0 = enabled);
        Ok(())
    }

    fn set_strength(&mut self, strength: u16) -> PlatformResult<()> {
        with_state(&self.sessions, self.session, |s| self.slot(s).1 = strength);
        Ok(())
    }

    fn release(&mut self) {}
}

struct StubReverb {
    session: SessionId,
    sessions: SessionTable,
}

impl ReverbUnit for StubReverb {
    fn set_enabled(&mut self, enabled: bool) -> PlatformResult<()> {
        with_state(&self.sessions, self.session, |s| s.reverb.0 = enabled);
        Ok(())
    }

    fn set_preset(&mut self, preset: u16) -> PlatformResult<()> {
        with_state(&self.sessions, self.session, |s| s.reverb.1 = preset);
        Ok(())
    }

    fn release(&mut self) {}
}

struct StubBundle {
    session: SessionId,
    sessions: SessionTable,
}

impl VendorBundle for StubBundle {
    fn set_master_enabled(&mut self, enabled: bool) -> PlatformResult<()> {
        with_state(&self.sessions, self.session, |s| s.master_enabled = enabled);
        Ok(())
    }

    fn set_output_device(&mut self, device: &OutputDevice) -> PlatformResult<()> {
        with_state(&self.sessions, self.session, |s| {
            s.device = Some(device.id.clone())
        });
        Ok(())
    }

    fn apply(&mut self, params: &[VendorParam]) -> PlatformResult<()> {
        with_state(&self.sessions, self.session, |s| {
            for param in params {
                match *param {
                    VendorParam::BassEnabled(on) => s.bass.0 = on,
                    VendorParam::BassStrength(v) => s.bass.1 = v,
                    VendorParam::VirtualizerEnabled(on) => s.virtualizer.0 = on,
                    VendorParam::VirtualizerStrength(v) => s.virtualizer.1 = v,
                    VendorParam::TrebleEnabled(on) => s.treble.0 = on,
                    VendorParam::TrebleStrength(v) => s.treble.1 = v,
                    VendorParam::VolumeBoostEnabled(on) => s.volume_boost = on,
                }
            }
            s.vendor_batches += 1;
        });
        Ok(())
    }

    fn release(&mut self) {
        with_state(&self.sessions, self.session, |s| s.released = true);
    }
}

#[derive(Default)]
struct RoutingState {
    outputs: Vec<OutputDevice>,
    route: DeviceMask,
    callback: Option<RoutingCallback>,
}

/// Routing source whose connected outputs are set by hand
///
/// Starts with only the speaker connected and routed.
pub struct StubRoutingSource {
    state: RwLock<RoutingState>,
}

impl StubRoutingSource {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RoutingState {
                outputs: vec![OutputDevice::speaker()],
                route: DeviceMask::from_kinds(&[DeviceKind::Speaker]),
                callback: None,
            }),
        }
    }

    /// Plug in `device` and route music to it
    pub fn connect(&self, device: OutputDevice) {
        {
            let mut state = self.state.write();
            state.route = state.route.with(device.kind);
            state.outputs.retain(|d| !d.same_identity(&device));
            state.outputs.insert(0, device);
        }
        self.notify();
    }

    /// Unplug every output matching `device`
    pub fn disconnect(&self, device: &OutputDevice) {
        {
            let mut state = self.state.write();
            state.outputs.retain(|d| !d.same_identity(device));
            let kinds: Vec<DeviceKind> = state.outputs.iter().map(|d| d.kind).collect();
            state.route = DeviceMask::from_kinds(&kinds);
        }
        self.notify();
    }

    /// Replace the music route without changing what is connected
    pub fn set_route(&self, route: DeviceMask) {
        self.state.write().route = route;
        self.notify();
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.read().callback.is_some()
    }

    fn notify(&self) {
        // Clone out so the callback can query us without deadlocking
        let callback = self.state.read().callback.clone();
        if let Some(callback) = callback {
            debug!("Stub routing changed");
            callback();
        }
    }
}

impl Default for StubRoutingSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingSource for StubRoutingSource {
    fn connected_outputs(&self) -> Vec<OutputDevice> {
        self.state.read().outputs.clone()
    }

    fn music_route(&self) -> DeviceMask {
        self.state.read().route
    }

    fn subscribe(&self, callback: RoutingCallback) {
        self.state.write().callback = Some(callback);
    }

    fn unsubscribe(&self) {
        self.state.write().callback = None;
    }
}
