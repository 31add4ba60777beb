//! Tonal Platform - Effect Backends and Audio Routing
//!
//! This crate sits between the session coordinator and the host OS:
//! - The `EffectBackend` capability interface and its variants
//! - The factory that picks a variant for each new session
//! - Output device model and the routing-driven device tracker
//! - An in-memory stub platform for hosts without an effects API
//!
//! # Backend Variants
//!
//! | Variant  | Equalizer | Bass | Virtualizer | Treble | Reverb | Volume boost | Release delay |
//! |----------|-----------|------|-------------|--------|--------|--------------|---------------|
//! | Generic  | Yes       | Host | Host        | No     | Host   | No           | 0             |
//! | Vendor   | Yes       | Yes  | Yes         | Yes    | No     | Yes          | 10 s          |
//!
//! # Architecture
//!
//! Variants compose host primitives (`EffectHost`) rather than inheriting
//! from one another; each embeds an `EqualizerCapability`.

mod device;
mod effects;
mod error;
mod factory;
mod host;
mod routing;
pub mod stub;
mod tracker;
mod traits;

pub use device::{DeviceKind, DeviceMask, OutputDevice};
pub use effects::{EqualizerCapability, GenericEffectSet, VendorEffectSet, VENDOR_RELEASE_DELAY};
pub use error::{PlatformError, PlatformResult};
pub use factory::{EffectBackendFactory, PlatformEffectFactory};
pub use host::{
    clamp_strength, db_to_millibels, EffectHost, EqualizerUnit, ReverbUnit, StrengthUnit,
    VendorBundle, VendorParam, MAX_STRENGTH,
};
pub use routing::{RoutingCallback, RoutingSource};
pub use tracker::{DeviceChangeListener, ListenerId, OutputDeviceTracker, TrackerConfig};
pub use traits::{EffectBackend, EqualizerLayout, SessionId};
