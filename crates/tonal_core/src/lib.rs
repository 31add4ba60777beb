//! Tonal Core - Session Coordination
//!
//! This crate keeps playback-session effects consistent with per-device
//! settings:
//! - Session lifecycle (attach, deferred release, reopen cancellation)
//! - Ordered, single-worker task execution
//! - Minimal pushes driven by change flags and an applied-state cache
//! - Device-scoped settings storage (memory or JSON file)
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────┐
//! │        EffectsService         │
//! │  store ─ tracker ─ coordinator│
//! └──────────────┬────────────────┘
//!                │ Task queue (crossbeam)
//! ┌──────────────▼────────────────┐
//! │        Session worker         │
//! │  push_configuration()         │
//! │  deferred releases            │
//! └──────────────┬────────────────┘
//!                │ EffectBackend calls
//!        tonal_platform backends
//! ```

mod config;
mod coordinator;
mod device_config;
mod error;
mod flags;
mod message;
mod push;
mod service;
mod store;

pub use config::{CoordinatorConfig, ServiceConfig};
pub use coordinator::{
    CoordinatorBuilder, NeverRecording, RecordingProbe, SessionCoordinator, SessionState,
    SharedBackend,
};
pub use device_config::{
    keys, DeviceConfiguration, EqualizerSettings, ReverbSettings, StrengthSettings,
    DEFAULT_EQ_PRESET,
};
pub use error::{CoreError, CoreResult};
pub use flags::ChangeFlags;
pub use push::{plan_push, push_configuration, AppliedState, Category, PushReport};
pub use service::EffectsService;
pub use store::{DeviceConfigurationStore, JsonConfigStore, MemoryConfigStore};

// Re-export sibling crates for convenience
pub use tonal_dsp;
pub use tonal_platform;
