//! Effect Backend Factory
//!
//! Picks and builds the backend variant for a new session.

use std::sync::Arc;

use tracing::{debug, info};

use crate::device::OutputDevice;
use crate::effects::{GenericEffectSet, VendorEffectSet};
use crate::error::PlatformResult;
use crate::host::EffectHost;
use crate::traits::{EffectBackend, EqualizerLayout, SessionId};

/// Creates effect backends for playback sessions
pub trait EffectBackendFactory: Send + Sync {
    /// Build a backend for `session`, already bound to `device`
    fn create_effect_set(
        &self,
        session: SessionId,
        device: &OutputDevice,
    ) -> PlatformResult<Box<dyn EffectBackend>>;

    /// Band layout every backend from this factory exposes
    fn equalizer_layout(&self) -> EqualizerLayout;
}

/// Vendor bundle when the host has one (and it is wanted), generic otherwise
pub struct PlatformEffectFactory {
    host: Arc<dyn EffectHost>,
    prefer_vendor: bool,
}

impl PlatformEffectFactory {
    pub fn new(host: Arc<dyn EffectHost>) -> Self {
        Self {
            host,
            prefer_vendor: true,
        }
    }

    pub fn with_vendor_preference(mut self, prefer_vendor: bool) -> Self {
        self.prefer_vendor = prefer_vendor;
        self
    }

    pub fn uses_vendor(&self) -> bool {
        self.prefer_vendor && self.host.has_vendor_bundle()
    }
}

impl EffectBackendFactory for PlatformEffectFactory {
    fn create_effect_set(
        &self,
        session: SessionId,
        device: &OutputDevice,
    ) -> PlatformResult<Box<dyn EffectBackend>> {
        let mut backend: Box<dyn EffectBackend> = if self.uses_vendor() {
            Box::new(VendorEffectSet::new(self.host.as_ref(), session)?)
        } else {
            Box::new(GenericEffectSet::new(self.host.as_ref(), session)?)
        };

        if let Err(e) = backend.set_device(device) {
            backend.release();
            return Err(e);
        }

        info!(
            "Created {} effect set for session {} on {} (host: {})",
            backend.name(),
            session,
            device,
            self.host.name()
        );
        debug!(
            "Session {} equalizer has {} bands",
            session,
            backend.equalizer_band_count()
        );
        Ok(backend)
    }

    fn equalizer_layout(&self) -> EqualizerLayout {
        self.host.equalizer_layout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::stub::StubEffectHost;

    #[test]
    fn test_generic_without_vendor_bundle() {
        let factory = PlatformEffectFactory::new(Arc::new(StubEffectHost::new()));
        let backend = factory
            .create_effect_set(1, &OutputDevice::speaker())
            .unwrap();
        assert_eq!(backend.name(), "generic");
        assert_eq!(backend.session_id(), 1);
    }

    #[test]
    fn test_vendor_preferred_when_available() {
        let host = Arc::new(StubEffectHost::new().with_vendor_bundle());
        let factory = PlatformEffectFactory::new(host.clone());
        let backend = factory
            .create_effect_set(2, &OutputDevice::speaker())
            .unwrap();
        assert_eq!(backend.name(), "vendor");
        assert_eq!(host.session_state(2).unwrap().device.as_deref(), Some("speaker"));

        let factory = PlatformEffectFactory::new(host).with_vendor_preference(false);
        let backend = factory
            .create_effect_set(3, &OutputDevice::speaker())
            .unwrap();
        assert_eq!(backend.name(), "generic");
    }

    #[test]
    fn test_creation_failure_propagates() {
        let host = Arc::new(StubEffectHost::new());
        host.fail_session(4);
        let factory = PlatformEffectFactory::new(host);
        let result = factory.create_effect_set(4, &OutputDevice::speaker());
        assert!(matches!(result, Err(PlatformError::BackendCreation(_))));
    }

    #[test]
    fn test_layout_comes_from_host() {
        let factory = PlatformEffectFactory::new(Arc::new(StubEffectHost::new()));
        assert_eq!(factory.equalizer_layout(), EqualizerLayout::default());
    }
}
