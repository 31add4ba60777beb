//! Output Device Tracker
//!
//! Follows the platform routing state and reports the output device that
//! music is currently played through.
//!
//! # Threading
//!
//! Routing events arrive on whatever thread the platform uses. Resolution
//! happens inline on that thread; listener callbacks are handed to a
//! dedicated dispatcher thread so they run asynchronously and in the order
//! listeners were registered.
//!
//! ```text
//! Routing thread                 Dispatcher thread
//! ──────────────                 ─────────────────
//! RoutingCallback
//!   └── refresh()
//!         ├── current (Mutex)
//!         └── dispatch_tx ─────► listener 1, listener 2, ...
//! ```
//!
//! Lock order is `current` then `listeners`.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::device::OutputDevice;
use crate::error::{PlatformError, PlatformResult};
use crate::routing::{RoutingCallback, RoutingSource};

/// Receives output device changes
pub trait DeviceChangeListener: Send + Sync {
    fn on_output_device_changed(&self, device: &OutputDevice);
}

/// Handle returned by [`OutputDeviceTracker::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Name of the listener dispatch thread
    pub thread_name: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            thread_name: "tonal-device-events".into(),
        }
    }
}

enum Dispatch {
    Notify {
        device: OutputDevice,
        listeners: Vec<Arc<dyn DeviceChangeListener>>,
    },
    Shutdown,
}

#[derive(Default)]
struct ListenerSet {
    next_id: u64,
    entries: Vec<(ListenerId, Arc<dyn DeviceChangeListener>)>,
}

struct TrackerShared {
    routing: Arc<dyn RoutingSource>,
    current: Mutex<Option<OutputDevice>>,
    listeners: Mutex<ListenerSet>,
    dispatch_tx: Sender<Dispatch>,
}

impl TrackerShared {
    fn resolve(&self) -> OutputDevice {
        let route = self.routing.music_route();
        self.routing
            .connected_outputs()
            .into_iter()
            .find(|device| route.contains(device.kind))
            .unwrap_or_else(OutputDevice::speaker)
    }

    fn refresh(&self) {
        let mut current = self.current.lock();
        let resolved = self.resolve();

        if let Some(previous) = current.as_ref() {
            if previous.same_identity(&resolved) {
                debug!("Output device unchanged: {}", resolved);
                return;
            }
        }

        info!("Output device changed to {}", resolved);
        *current = Some(resolved.clone());

        let listeners: Vec<_> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        if listeners.is_empty() {
            return;
        }

        if self
            .dispatch_tx
            .send(Dispatch::Notify {
                device: resolved,
                listeners,
            })
            .is_err()
        {
            debug!("Device event dispatcher gone, dropping notification");
        }
    }
}

/// Reports the preferred music output device to registered listeners
pub struct OutputDeviceTracker {
    shared: Arc<TrackerShared>,
    dispatcher: Option<JoinHandle<()>>,
}

impl OutputDeviceTracker {
    pub fn new(routing: Arc<dyn RoutingSource>) -> PlatformResult<Self> {
        Self::with_config(routing, TrackerConfig::default())
    }

    pub fn with_config(
        routing: Arc<dyn RoutingSource>,
        config: TrackerConfig,
    ) -> PlatformResult<Self> {
        let (dispatch_tx, dispatch_rx) = unbounded::<Dispatch>();

        let dispatcher = thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || Self::dispatcher_main(dispatch_rx))
            .map_err(|e| PlatformError::Internal(format!("dispatcher thread: {}", e)))?;

        Ok(Self {
            shared: Arc::new(TrackerShared {
                routing,
                current: Mutex::new(None),
                listeners: Mutex::new(ListenerSet::default()),
                dispatch_tx,
            }),
            dispatcher: Some(dispatcher),
        })
    }

    fn dispatcher_main(dispatch_rx: Receiver<Dispatch>) {
        while let Ok(dispatch) = dispatch_rx.recv() {
            match dispatch {
                Dispatch::Notify { device, listeners } => {
                    for listener in listeners {
                        listener.on_output_device_changed(&device);
                    }
                }
                Dispatch::Shutdown => break,
            }
        }
        debug!("Device event dispatcher exiting");
    }

    /// Register a listener; the first one subscribes to routing events
    pub fn add_listener(&self, listener: Arc<dyn DeviceChangeListener>) -> ListenerId {
        let id = {
            let mut set = self.shared.listeners.lock();
            let id = ListenerId(set.next_id);
            set.next_id += 1;
            set.entries.push((id, listener));

            if set.entries.len() == 1 {
                debug!("First device listener, subscribing to routing events");
                self.shared.routing.subscribe(self.routing_callback());
            }
            id
        };

        self.shared.refresh();
        id
    }

    /// Remove a listener; the last one unsubscribes. Returns false if unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut set = self.shared.listeners.lock();
        let before = set.entries.len();
        set.entries.retain(|(existing, _)| *existing != id);
        let removed = set.entries.len() != before;

        if removed && set.entries.is_empty() {
            debug!("Last device listener gone, unsubscribing from routing events");
            self.shared.routing.unsubscribe();
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().entries.len()
    }

    /// Re-evaluate routing without waiting for a platform event
    pub fn refresh(&self) {
        self.shared.refresh();
    }

    /// Most recently resolved device, resolving now if nothing has been yet
    pub fn current_device(&self) -> OutputDevice {
        if let Some(device) = self.shared.current.lock().clone() {
            return device;
        }
        self.shared.refresh();
        self.shared
            .current
            .lock()
            .clone()
            .unwrap_or_else(OutputDevice::speaker)
    }

    fn routing_callback(&self) -> RoutingCallback {
        let weak: Weak<TrackerShared> = Arc::downgrade(&self.shared);
        Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.refresh();
            }
        })
    }
}

impl Drop for OutputDeviceTracker {
    fn drop(&mut self) {
        if !self.shared.listeners.lock().entries.is_empty() {
            self.shared.routing.unsubscribe();
        }

        if self.shared.dispatch_tx.send(Dispatch::Shutdown).is_err() {
            warn!("Device event dispatcher already stopped");
        }

        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }
    }
}
