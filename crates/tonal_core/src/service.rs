//! Effects Service
//!
//! The configuration hub: owns the settings store, the output device
//! tracker and the session coordinator, and wires them together. Built once
//! by the process entry point and passed by reference to whoever needs it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use tonal_dsp::{format_levels, CurvePoint, FrequencyResponseCurve, PresetLibrary};
use tonal_platform::{
    EffectBackendFactory, EqualizerLayout, ListenerId, OutputDevice, OutputDeviceTracker,
    RoutingSource, SessionId,
};

use crate::config::ServiceConfig;
use crate::coordinator::{RecordingProbe, SessionCoordinator};
use crate::device_config::{keys, DeviceConfiguration};
use crate::error::{CoreError, CoreResult};
use crate::flags::ChangeFlags;
use crate::store::DeviceConfigurationStore;

pub struct EffectsService {
    store: Arc<dyn DeviceConfigurationStore>,
    layout: EqualizerLayout,
    tracker: OutputDeviceTracker,
    coordinator: Arc<SessionCoordinator>,
    listener: Mutex<Option<ListenerId>>,
}

impl EffectsService {
    pub fn start(
        factory: Arc<dyn EffectBackendFactory>,
        store: Arc<dyn DeviceConfigurationStore>,
        routing: Arc<dyn RoutingSource>,
        probe: Arc<dyn RecordingProbe>,
        config: ServiceConfig,
    ) -> CoreResult<Self> {
        let layout = factory.equalizer_layout();
        let tracker = OutputDeviceTracker::with_config(routing, config.tracker)?;
        let device = tracker.current_device();

        let coordinator = Arc::new(
            SessionCoordinator::builder(factory, Arc::clone(&store))
                .device(device.clone())
                .config(config.coordinator)
                .recording_probe(probe)
                .spawn()?,
        );
        let listener = tracker.add_listener(coordinator.clone());

        info!(
            "Effects service started on {} ({} equalizer bands)",
            device,
            layout.band_count()
        );

        Ok(Self {
            store,
            layout,
            tracker,
            coordinator,
            listener: Mutex::new(Some(listener)),
        })
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    pub fn open_session(&self, id: SessionId) -> CoreResult<()> {
        self.coordinator.add_session(id)
    }

    pub fn close_session(&self, id: SessionId) {
        self.coordinator.remove_session(id)
    }

    pub fn equalizer_layout(&self) -> &EqualizerLayout {
        &self.layout
    }

    pub fn active_device(&self) -> OutputDevice {
        self.tracker.current_device()
    }

    /// Re-read routing, e.g. after the platform service restarted
    pub fn refresh_device(&self) {
        self.tracker.refresh();
    }

    /// Settings of the active device
    pub fn configuration(&self) -> DeviceConfiguration {
        DeviceConfiguration::load(
            self.store.as_ref(),
            &self.active_device().id,
            self.layout.band_count(),
        )
    }

    /// Persist a boolean for the active device and push just that category
    pub fn write_bool(&self, key: &str, value: bool) -> CoreResult<()> {
        let scope = self.active_device().id;
        self.store.put_bool(&scope, key, value)?;
        debug!("{}/{} = {}", scope, key, value);
        self.coordinator.update(ChangeFlags::for_key(key))
    }

    /// Persist a string value for the active device and push just that category
    ///
    /// `eq_preset` also replaces the stored band levels, which otherwise win.
    pub fn write_string(&self, key: &str, value: &str) -> CoreResult<()> {
        if key == keys::EQ_PRESET {
            return self.select_preset(value);
        }
        let scope = self.active_device().id;
        self.store.put_string(&scope, key, value)?;
        debug!("{}/{} = {:?}", scope, key, value);
        self.coordinator.update(ChangeFlags::for_key(key))
    }

    /// Persist any known key, parsing booleans from their text form
    pub fn write_value(&self, key: &str, value: &str) -> CoreResult<()> {
        if !keys::is_known(key) {
            return Err(CoreError::Config(format!("Unknown setting: {}", key)));
        }
        if keys::is_bool_key(key) {
            let parsed = match value {
                "true" | "on" | "1" => true,
                "false" | "off" | "0" => false,
                other => {
                    return Err(CoreError::Config(format!(
                        "{} expects a boolean, got {:?}",
                        key, other
                    )))
                }
            };
            self.write_bool(key, parsed)
        } else {
            self.write_string(key, value)
        }
    }

    /// Presets for the active equalizer layout
    pub fn presets(&self) -> CoreResult<PresetLibrary> {
        Ok(PresetLibrary::new(self.layout.band_count())?)
    }

    /// Store a preset's name and levels for the active device
    pub fn select_preset(&self, name: &str) -> CoreResult<()> {
        let library = self.presets()?;
        let (_, preset) = library
            .find(name)
            .ok_or_else(|| CoreError::Config(format!("Unknown preset: {}", name)))?;

        let scope = self.active_device().id;
        self.store.put_string(&scope, keys::EQ_PRESET, preset.name())?;
        self.store
            .put_string(&scope, keys::EQ_LEVELS, &format_levels(preset.levels()))?;
        self.coordinator.update(ChangeFlags::EQUALIZER)
    }

    /// Live preview of one band while it is being dragged
    pub fn preview_band(&self, band: usize, level_db: f32) -> CoreResult<()> {
        if band >= self.layout.band_count() {
            return Err(tonal_dsp::DspError::InvalidBandIndex {
                index: band,
                band_count: self.layout.band_count(),
            }
            .into());
        }
        self.coordinator.set_override_levels(band, level_db)
    }

    /// Frequency response of the active device's equalizer settings
    pub fn response_curve(&self, num_points: usize) -> CoreResult<Vec<CurvePoint>> {
        let config = self.configuration();
        let curve = FrequencyResponseCurve::new(self.layout.center_freqs_hz.clone())?
            .with_points(num_points);
        Ok(curve.evaluate(&config.equalizer.levels_db)?)
    }

    /// Detach from routing events and release every session
    pub fn shutdown(&self) {
        if let Some(listener) = self.listener.lock().take() {
            self.tracker.remove_listener(listener);
            self.coordinator.shutdown();
            info!("Effects service stopped");
        }
    }
}

impl Drop for EffectsService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::NeverRecording;
    use crate::store::MemoryConfigStore;
    use std::time::{Duration, Instant};
    use tonal_platform::stub::{StubEffectHost, StubRoutingSource};
    use tonal_platform::{DeviceKind, PlatformEffectFactory};

    struct Fixture {
        host: Arc<StubEffectHost>,
        routing: Arc<StubRoutingSource>,
        store: Arc<MemoryConfigStore>,
        service: EffectsService,
    }

    fn fixture() -> Fixture {
        let host = Arc::new(StubEffectHost::new());
        let routing = Arc::new(StubRoutingSource::new());
        let store = Arc::new(MemoryConfigStore::new());
        let service = EffectsService::start(
            Arc::new(PlatformEffectFactory::new(host.clone())),
            store.clone(),
            routing.clone(),
            Arc::new(NeverRecording),
            ServiceConfig::default(),
        )
        .unwrap();
        Fixture {
            host,
            routing,
            store,
            service,
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        condition()
    }

    #[test]
    fn test_writes_persist_and_apply() {
        let f = fixture();
        f.service.write_bool(keys::GLOBAL_ENABLE, true).unwrap();
        f.service.write_bool(keys::BASS_ENABLE, true).unwrap();
        f.service.write_string(keys::BASS_STRENGTH, "250").unwrap();
        f.service.open_session(21).unwrap();
        f.service.coordinator().flush().unwrap();

        assert_eq!(f.store.get_string("speaker", keys::BASS_STRENGTH, ""), "250");
        assert_eq!(f.host.session_state(21).unwrap().bass, (true, 250));
    }

    #[test]
    fn test_write_value_validation() {
        let f = fixture();
        assert!(f.service.write_value("loudness", "3").is_err());
        assert!(f.service.write_value(keys::EQ_ENABLE, "maybe").is_err());
        f.service.write_value(keys::EQ_ENABLE, "on").unwrap();
        assert!(f.store.get_bool("speaker", keys::EQ_ENABLE, false));
    }

    #[test]
    fn test_device_change_follows_routing() {
        let f = fixture();
        f.store.put_bool("headset", keys::GLOBAL_ENABLE, true).unwrap();
        f.store.put_bool("headset", keys::VIRTUALIZER_ENABLE, true).unwrap();
        f.store
            .put_string("headset", keys::VIRTUALIZER_STRENGTH, "600")
            .unwrap();
        f.service.open_session(22).unwrap();
        f.service.coordinator().flush().unwrap();

        f.routing
            .connect(OutputDevice::new(DeviceKind::Headset, "Jack", None));
        assert_eq!(f.service.active_device().id, "headset");
        assert!(wait_until(|| {
            f.host
                .session_state(22)
                .map(|s| s.virtualizer == (true, 600))
                .unwrap_or(false)
        }));
    }

    #[test]
    fn test_select_preset() {
        let f = fixture();
        f.service.select_preset("Rock").unwrap();
        assert_eq!(
            f.store.get_string("speaker", keys::EQ_PRESET, ""),
            "Rock"
        );
        let levels = f.service.configuration().equalizer.levels_db;
        let library = f.service.presets().unwrap();
        assert_eq!(levels, library.find("Rock").unwrap().1.levels());
        assert!(f.service.select_preset("Polka").is_err());
    }

    #[test]
    fn test_preset_key_replaces_levels() {
        let f = fixture();
        f.service.select_preset("Rock").unwrap();
        f.service.write_value(keys::EQ_PRESET, "Flat").unwrap();

        assert_eq!(f.store.get_string("speaker", keys::EQ_PRESET, ""), "Flat");
        let levels = f.service.configuration().equalizer.levels_db;
        assert!(levels.iter().all(|level| *level == 0.0));
        assert!(f.service.write_value(keys::EQ_PRESET, "Polka").is_err());
    }

    #[test]
    fn test_preview_band_bounds() {
        let f = fixture();
        assert!(f.service.preview_band(0, 3.0).is_ok());
        assert!(matches!(
            f.service.preview_band(99, 3.0),
            Err(CoreError::Dsp(_))
        ));
    }

    #[test]
    fn test_flat_curve() {
        let f = fixture();
        let points = f.service.response_curve(32).unwrap();
        assert_eq!(points.len(), 32);
        assert!(points.iter().all(|p| p.gain_db.abs() < 1e-6));
    }

    #[test]
    fn test_shutdown_unsubscribes() {
        let f = fixture();
        assert!(f.routing.is_subscribed());
        f.service.shutdown();
        assert!(!f.routing.is_subscribed());
        f.service.shutdown();
    }
}
