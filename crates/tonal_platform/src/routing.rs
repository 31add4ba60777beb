//! Audio Routing Source
//!
//! Read side of the OS audio routing service: which outputs are connected,
//! where the music stream is going, and a single change subscription.

use std::sync::Arc;

use crate::device::{DeviceMask, OutputDevice};

/// Invoked by the routing source whenever the device set or route changes
pub type RoutingCallback = Arc<dyn Fn() + Send + Sync>;

pub trait RoutingSource: Send + Sync {
    /// Outputs currently connected, in platform preference order
    fn connected_outputs(&self) -> Vec<OutputDevice>;

    /// Kinds the music stream is routed to right now
    fn music_route(&self) -> DeviceMask;

    /// Register the change callback, replacing any previous one
    ///
    /// Implementations must not invoke the callback from inside this call.
    fn subscribe(&self, callback: RoutingCallback);

    fn unsubscribe(&self);
}
