//! Session Coordinator
//!
//! Owns the session id -> effect backend mapping and keeps every live
//! backend in line with the configuration of the current output device.
//!
//! # Architecture
//!
//! All mutations run on one worker thread, in submission order. Public
//! methods may be called from any thread; they only enqueue tasks.
//!
//! ```text
//! Any thread                       Session worker
//! ──────────                       ──────────────
//! SessionCoordinator               Worker::run()
//!   ├── task_tx ────────────────►  AddSession / RemoveSession / Update ...
//!   └── sessions (Mutex) ◄───────  inserts, state changes, removals
//!                                  releases (deadline timers)
//! ```
//!
//! The session map lock is only held for map reads and writes, never across
//! a backend call.
//!
//! # Session states
//!
//! ```text
//! ∅ ──add──► Active ──remove──► PendingRemoval ──delay elapsed──► ∅
//!              ▲                      │
//!              └──────── add ─────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use tonal_platform::{
    DeviceChangeListener, EffectBackend, EffectBackendFactory, OutputDevice, SessionId,
};

use crate::config::CoordinatorConfig;
use crate::device_config::DeviceConfiguration;
use crate::error::{CoreError, CoreResult};
use crate::flags::ChangeFlags;
use crate::message::Task;
use crate::push::{push_configuration, AppliedState};
use crate::store::DeviceConfigurationStore;

/// Backend handle shared between the worker and introspection callers
pub type SharedBackend = Arc<Mutex<Box<dyn EffectBackend>>>;

/// Reports whether audio is currently being captured
pub trait RecordingProbe: Send + Sync {
    fn is_recording(&self) -> bool;
}

/// Probe for hosts that cannot tell
pub struct NeverRecording;

impl RecordingProbe for NeverRecording {
    fn is_recording(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    PendingRemoval,
}

struct SessionEntry {
    state: SessionState,
    backend: SharedBackend,
}

type SessionMap = Arc<Mutex<HashMap<SessionId, SessionEntry>>>;

/// Builder for [`SessionCoordinator`]
pub struct CoordinatorBuilder {
    factory: Arc<dyn EffectBackendFactory>,
    store: Arc<dyn DeviceConfigurationStore>,
    device: OutputDevice,
    config: CoordinatorConfig,
    probe: Arc<dyn RecordingProbe>,
}

impl CoordinatorBuilder {
    /// Output device in effect when the coordinator starts
    pub fn device(mut self, device: OutputDevice) -> Self {
        self.device = device;
        self
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn recording_probe(mut self, probe: Arc<dyn RecordingProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Start the worker thread
    pub fn spawn(self) -> CoreResult<SessionCoordinator> {
        self.config.validate().map_err(CoreError::Config)?;

        let (task_tx, task_rx) = bounded::<Task>(self.config.queue_capacity);
        let sessions: SessionMap = Arc::new(Mutex::new(HashMap::new()));
        let band_count = self.factory.equalizer_layout().band_count();

        let worker = Worker {
            factory: self.factory,
            store: self.store,
            probe: self.probe,
            suppress_while_recording: self.config.suppress_attach_while_recording,
            sessions: Arc::clone(&sessions),
            device: self.device,
            band_count,
            applied: HashMap::new(),
            releases: HashMap::new(),
        };

        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker.run(task_rx))
            .map_err(|e| CoreError::WorkerSpawn(e.to_string()))?;

        Ok(SessionCoordinator {
            task_tx,
            sessions,
            worker: Mutex::new(Some(handle)),
        })
    }
}

/// Single authority over session backends
pub struct SessionCoordinator {
    task_tx: Sender<Task>,
    sessions: SessionMap,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionCoordinator {
    pub fn builder(
        factory: Arc<dyn EffectBackendFactory>,
        store: Arc<dyn DeviceConfigurationStore>,
    ) -> CoordinatorBuilder {
        CoordinatorBuilder {
            factory,
            store,
            device: OutputDevice::speaker(),
            config: CoordinatorConfig::default(),
            probe: Arc::new(NeverRecording),
        }
    }

    /// Coordinator with default configuration, starting on `device`
    pub fn new(
        factory: Arc<dyn EffectBackendFactory>,
        store: Arc<dyn DeviceConfigurationStore>,
        device: OutputDevice,
    ) -> CoreResult<Self> {
        Self::builder(factory, store).device(device).spawn()
    }

    /// A session opened; attach effects (or keep the ones pending release)
    pub fn add_session(&self, id: SessionId) -> CoreResult<()> {
        if id <= 0 {
            return Err(CoreError::InvalidSession(id));
        }
        self.send(Task::AddSession(id))
    }

    /// A session closed; release its effects after the backend's grace period
    ///
    /// Invalid ids are ignored. Duplicates are dropped by the worker, since
    /// the map may not yet reflect an add queued ahead of this removal.
    pub fn remove_session(&self, id: SessionId) {
        if id <= 0 {
            debug!("Ignoring removal of invalid session {}", id);
            return;
        }
        if let Err(e) = self.send(Task::RemoveSession(id)) {
            warn!("Could not queue removal of session {}: {}", id, e);
        }
    }

    /// Re-push the categories in `flags` to every active session
    pub fn update(&self, flags: ChangeFlags) -> CoreResult<()> {
        self.send(Task::Update(flags))
    }

    /// Preview one equalizer band on every active session without persisting
    pub fn set_override_levels(&self, band: usize, level_db: f32) -> CoreResult<()> {
        self.send(Task::SetOverride { band, level_db })
    }

    pub fn device_changed(&self, device: OutputDevice) -> CoreResult<()> {
        self.send(Task::DeviceChanged(device))
    }

    /// Any session entry, active or pending removal
    pub fn has_active_sessions(&self) -> bool {
        !self.sessions.lock().is_empty()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn session_state(&self, id: SessionId) -> Option<SessionState> {
        self.sessions.lock().get(&id).map(|entry| entry.state)
    }

    /// Point-in-time lookup; a just-added session may not be visible yet
    pub fn get_effect_for_session(&self, id: SessionId) -> Option<SharedBackend> {
        self.sessions
            .lock()
            .get(&id)
            .map(|entry| Arc::clone(&entry.backend))
    }

    /// Block until every task queued so far has been processed
    pub fn flush(&self) -> CoreResult<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(Task::Flush(reply_tx))?;
        reply_rx.recv().map_err(|_| CoreError::ChannelSend)
    }

    /// Release every backend and stop the worker
    pub fn shutdown(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if self.task_tx.send(Task::Shutdown).is_err() {
                debug!("Session worker already gone");
            }
            let _ = handle.join();
        }
    }

    fn send(&self, task: Task) -> CoreResult<()> {
        self.task_tx.send(task).map_err(|_| CoreError::ChannelSend)
    }
}

impl DeviceChangeListener for SessionCoordinator {
    fn on_output_device_changed(&self, device: &OutputDevice) {
        if let Err(e) = self.device_changed(device.clone()) {
            warn!("Dropping device change to {}: {}", device, e);
        }
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by the worker thread
struct Worker {
    factory: Arc<dyn EffectBackendFactory>,
    store: Arc<dyn DeviceConfigurationStore>,
    probe: Arc<dyn RecordingProbe>,
    suppress_while_recording: bool,
    sessions: SessionMap,
    device: OutputDevice,
    band_count: usize,
    applied: HashMap<SessionId, AppliedState>,
    /// Release deadlines of sessions pending removal
    releases: HashMap<SessionId, Instant>,
}

impl Worker {
    fn run(mut self, task_rx: Receiver<Task>) {
        info!("Session worker started on {}", self.device);

        loop {
            let received = match self.next_release() {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    match task_rx.recv_timeout(timeout) {
                        Ok(task) => Some(task),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match task_rx.recv() {
                    Ok(task) => Some(task),
                    Err(_) => break,
                },
            };

            if let Some(task) = received {
                if !self.handle(task) {
                    break;
                }
            }
            self.release_due(Instant::now());
        }

        self.release_all();
        info!("Session worker stopped");
    }

    /// Returns false when the worker should stop
    fn handle(&mut self, task: Task) -> bool {
        match task {
            Task::AddSession(id) => self.add_session(id),
            Task::RemoveSession(id) => self.remove_session(id),
            Task::Update(flags) => self.update(flags),
            Task::SetOverride { band, level_db } => self.set_override(band, level_db),
            Task::DeviceChanged(device) => self.device_changed(device),
            Task::Flush(reply) => {
                let _ = reply.send(());
            }
            Task::Shutdown => return false,
        }
        true
    }

    fn configuration(&self) -> DeviceConfiguration {
        DeviceConfiguration::load(self.store.as_ref(), &self.device.id, self.band_count)
    }

    /// Active sessions in id order
    fn active_backends(&self) -> Vec<(SessionId, SharedBackend)> {
        let mut active: Vec<_> = self
            .sessions
            .lock()
            .iter()
            .filter(|(_, entry)| entry.state == SessionState::Active)
            .map(|(id, entry)| (*id, Arc::clone(&entry.backend)))
            .collect();
        active.sort_by_key(|(id, _)| *id);
        active
    }

    fn add_session(&mut self, id: SessionId) {
        let previous = self
            .sessions
            .lock()
            .get_mut(&id)
            .map(|entry| std::mem::replace(&mut entry.state, SessionState::Active));

        match previous {
            Some(SessionState::PendingRemoval) => {
                self.releases.remove(&id);
                info!("Session {} reopened, pending release cancelled", id);
                return;
            }
            Some(SessionState::Active) => {
                debug!("Session {} already active", id);
                return;
            }
            None => {}
        }

        if self.suppress_while_recording && self.probe.is_recording() {
            warn!("Recording in progress, not attaching effects to session {}", id);
            return;
        }

        let mut backend = match self.factory.create_effect_set(id, &self.device) {
            Ok(backend) => backend,
            Err(e) => {
                error!("Failed to attach effects to session {}: {}", id, e);
                return;
            }
        };

        let config = self.configuration();
        let mut applied = AppliedState::default();
        push_configuration(&mut *backend, ChangeFlags::ALL, &config, &mut applied);

        info!(
            "Session {} attached ({} backend on {})",
            id,
            backend.name(),
            self.device
        );
        self.sessions.lock().insert(
            id,
            SessionEntry {
                state: SessionState::Active,
                backend: Arc::new(Mutex::new(backend)),
            },
        );
        self.applied.insert(id, applied);
    }

    fn remove_session(&mut self, id: SessionId) {
        let backend = {
            let mut sessions = self.sessions.lock();
            match sessions.get_mut(&id) {
                Some(entry) if entry.state == SessionState::Active => {
                    entry.state = SessionState::PendingRemoval;
                    Arc::clone(&entry.backend)
                }
                Some(_) => {
                    debug!("Session {} already pending removal", id);
                    return;
                }
                None => {
                    debug!("Ignoring removal of unknown session {}", id);
                    return;
                }
            }
        };

        let delay = backend.lock().release_delay();
        if delay.is_zero() {
            self.release(id);
        } else {
            info!("Session {} closed, releasing in {:?}", id, delay);
            self.releases.insert(id, Instant::now() + delay);
        }
    }

    fn next_release(&self) -> Option<Instant> {
        self.releases.values().min().copied()
    }

    fn release_due(&mut self, now: Instant) {
        let due: Vec<SessionId> = self
            .releases
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in due {
            self.release(id);
        }
    }

    /// Tear down `id` if it is still pending removal
    fn release(&mut self, id: SessionId) {
        self.releases.remove(&id);

        let entry = {
            let mut sessions = self.sessions.lock();
            match sessions.get(&id) {
                Some(entry) if entry.state == SessionState::PendingRemoval => sessions.remove(&id),
                _ => None,
            }
        };

        if let Some(entry) = entry {
            self.applied.remove(&id);
            entry.backend.lock().release();
            info!("Session {} released", id);
        }
    }

    fn release_all(&mut self) {
        let entries: Vec<(SessionId, SessionEntry)> = self.sessions.lock().drain().collect();
        for (id, entry) in entries {
            entry.backend.lock().release();
            debug!("Session {} released on shutdown", id);
        }
        self.applied.clear();
        self.releases.clear();
    }

    fn update(&mut self, flags: ChangeFlags) {
        let config = self.configuration();
        for (id, backend) in self.active_backends() {
            let mut backend = backend.lock();
            let applied = self.applied.entry(id).or_default();
            push_configuration(&mut **backend, flags, &config, applied);
        }
    }

    fn set_override(&mut self, band: usize, level_db: f32) {
        let config = self.configuration();
        if !config.global_enabled {
            debug!("Effects bypassed on {}, ignoring band preview", self.device);
            return;
        }

        for (id, backend) in self.active_backends() {
            if let Err(e) = backend.lock().set_equalizer_band_level(band, level_db) {
                warn!("Session {}: band {} preview failed: {}", id, band, e);
            }
            self.applied.entry(id).or_default().invalidate_equalizer();
        }
    }

    fn device_changed(&mut self, device: OutputDevice) {
        info!("Applying configuration for {}", device);
        self.device = device;
        let config = self.configuration();

        for (id, backend) in self.active_backends() {
            let mut backend = backend.lock();
            if let Err(e) = backend.set_device(&self.device) {
                warn!("Session {}: failed to set device: {}", id, e);
            }
            let applied = self.applied.entry(id).or_default();
            applied.clear_effects();
            push_configuration(&mut **backend, ChangeFlags::ALL, &config, applied);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_config::keys;
    use crate::store::MemoryConfigStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tonal_platform::stub::StubEffectHost;
    use tonal_platform::{DeviceKind, PlatformEffectFactory};

    struct Fixture {
        host: Arc<StubEffectHost>,
        store: Arc<MemoryConfigStore>,
        coordinator: SessionCoordinator,
    }

    fn fixture_with(configure: impl FnOnce(CoordinatorBuilder) -> CoordinatorBuilder) -> Fixture {
        let host = Arc::new(StubEffectHost::new());
        let store = Arc::new(MemoryConfigStore::new());
        store.put_bool("speaker", keys::GLOBAL_ENABLE, true).unwrap();
        store.put_bool("speaker", keys::BASS_ENABLE, true).unwrap();
        store.put_string("speaker", keys::BASS_STRENGTH, "300").unwrap();

        let factory = Arc::new(PlatformEffectFactory::new(host.clone()));
        let coordinator = configure(SessionCoordinator::builder(factory, store.clone()))
            .spawn()
            .unwrap();
        Fixture {
            host,
            store,
            coordinator,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(|builder| builder)
    }

    #[test]
    fn test_invalid_session_rejected() {
        let f = fixture();
        assert!(matches!(
            f.coordinator.add_session(0),
            Err(CoreError::InvalidSession(0))
        ));
        assert!(f.coordinator.add_session(-4).is_err());
        f.coordinator.remove_session(-4);
        f.coordinator.flush().unwrap();
        assert!(!f.coordinator.has_active_sessions());
    }

    #[test]
    fn test_add_pushes_configuration() {
        let f = fixture();
        f.coordinator.add_session(5).unwrap();
        f.coordinator.flush().unwrap();

        assert!(f.coordinator.get_effect_for_session(5).is_some());
        assert_eq!(f.coordinator.session_state(5), Some(SessionState::Active));
        assert_eq!(f.host.session_state(5).unwrap().bass, (true, 300));
    }

    #[test]
    fn test_generic_backend_released_immediately() {
        let f = fixture();
        f.coordinator.add_session(6).unwrap();
        f.coordinator.remove_session(6);
        f.coordinator.flush().unwrap();

        assert!(f.coordinator.get_effect_for_session(6).is_none());
        assert!(f.host.session_state(6).unwrap().released);
    }

    #[test]
    fn test_creation_failure_leaves_no_entry() {
        let f = fixture();
        f.host.fail_session(8);
        f.coordinator.add_session(8).unwrap();
        f.coordinator.flush().unwrap();
        assert!(f.coordinator.get_effect_for_session(8).is_none());
        assert!(!f.coordinator.has_active_sessions());
    }

    struct Recording(AtomicBool);

    impl RecordingProbe for Recording {
        fn is_recording(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_recording_suppresses_attach() {
        let probe = Arc::new(Recording(AtomicBool::new(true)));
        let f = fixture_with(|b| b.recording_probe(probe.clone()));

        f.coordinator.add_session(9).unwrap();
        f.coordinator.flush().unwrap();
        assert!(f.coordinator.get_effect_for_session(9).is_none());

        probe.0.store(false, Ordering::SeqCst);
        f.coordinator.add_session(9).unwrap();
        f.coordinator.flush().unwrap();
        assert!(f.coordinator.get_effect_for_session(9).is_some());
    }

    #[test]
    fn test_recording_check_can_be_disabled() {
        let probe = Arc::new(Recording(AtomicBool::new(true)));
        let config = CoordinatorConfig {
            suppress_attach_while_recording: false,
            ..Default::default()
        };
        let f = fixture_with(|b| b.recording_probe(probe).config(config));

        f.coordinator.add_session(10).unwrap();
        f.coordinator.flush().unwrap();
        assert!(f.coordinator.get_effect_for_session(10).is_some());
    }

    #[test]
    fn test_update_pushes_new_values() {
        let f = fixture();
        f.coordinator.add_session(11).unwrap();
        f.store.put_string("speaker", keys::BASS_STRENGTH, "900").unwrap();
        f.coordinator.update(ChangeFlags::BASS).unwrap();
        f.coordinator.flush().unwrap();
        assert_eq!(f.host.session_state(11).unwrap().bass, (true, 900));
    }

    #[test]
    fn test_device_change_uses_new_scope() {
        let f = fixture();
        f.store.put_bool("headset", keys::GLOBAL_ENABLE, true).unwrap();
        f.store.put_bool("headset", keys::BASS_ENABLE, true).unwrap();
        f.store.put_string("headset", keys::BASS_STRENGTH, "700").unwrap();

        f.coordinator.add_session(12).unwrap();
        f.coordinator
            .device_changed(OutputDevice::new(DeviceKind::Headset, "Jack", None))
            .unwrap();
        f.coordinator.flush().unwrap();
        assert_eq!(f.host.session_state(12).unwrap().bass, (true, 700));
    }

    #[test]
    fn test_band_preview() {
        let f = fixture();
        f.coordinator.add_session(13).unwrap();
        f.coordinator.set_override_levels(1, 4.0).unwrap();
        f.coordinator.flush().unwrap();
        assert_eq!(f.host.session_state(13).unwrap().band_levels_mb[1], 400);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let f = fixture();
        f.coordinator.add_session(1).unwrap();
        f.coordinator.add_session(2).unwrap();
        f.coordinator.flush().unwrap();

        f.coordinator.shutdown();
        assert!(f.host.session_state(1).unwrap().released);
        assert!(f.host.session_state(2).unwrap().released);
        assert!(!f.coordinator.has_active_sessions());
        assert!(matches!(
            f.coordinator.add_session(3),
            Err(CoreError::ChannelSend)
        ));
    }
}
