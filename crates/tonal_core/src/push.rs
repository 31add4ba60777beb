//! Configuration Push
//!
//! Applies a [`DeviceConfiguration`] to one effect backend.
//!
//! Rules, in order:
//! 1. The global switch is only touched when the flags carry `ALL`.
//! 2. With the global switch off nothing else is touched.
//! 3. Otherwise the requested categories are written inside one
//!    `begin_update`/`commit_update` pair. A failing category is logged and
//!    the rest still go through.
//!
//! Each session keeps an [`AppliedState`] so values the backend already
//! holds are not written again.

use tracing::{debug, warn};

use tonal_platform::{EffectBackend, PlatformResult};

use crate::device_config::{DeviceConfiguration, ReverbSettings, StrengthSettings};
use crate::flags::ChangeFlags;

/// Effect categories in push order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Equalizer,
    Bass,
    Virtualizer,
    Treble,
    Reverb,
    VolumeBoost,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Equalizer,
        Category::Bass,
        Category::Virtualizer,
        Category::Treble,
        Category::Reverb,
        Category::VolumeBoost,
    ];

    pub fn flag(self) -> ChangeFlags {
        match self {
            Category::Equalizer => ChangeFlags::EQUALIZER,
            Category::Bass => ChangeFlags::BASS,
            Category::Virtualizer => ChangeFlags::VIRTUALIZER,
            Category::Treble => ChangeFlags::TREBLE,
            Category::Reverb => ChangeFlags::REVERB,
            Category::VolumeBoost => ChangeFlags::VOLUME_BOOST,
        }
    }

    fn supported_by(self, backend: &dyn EffectBackend) -> bool {
        match self {
            Category::Equalizer => backend.has_equalizer(),
            Category::Bass => backend.has_bass_boost(),
            Category::Virtualizer => backend.has_virtualizer(),
            Category::Treble => backend.has_treble_boost(),
            Category::Reverb => backend.has_reverb(),
            Category::VolumeBoost => backend.has_volume_boost(),
        }
    }
}

/// Values last written successfully to one backend; `None` means unknown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedState {
    global: Option<bool>,
    equalizer: Option<(bool, Vec<f32>)>,
    bass: Option<StrengthSettings>,
    virtualizer: Option<StrengthSettings>,
    treble: Option<StrengthSettings>,
    reverb: Option<ReverbSettings>,
    volume_boost: Option<bool>,
}

impl AppliedState {
    pub fn global(&self) -> Option<bool> {
        self.global
    }

    /// Forget every per-effect value, keeping the global switch
    pub fn clear_effects(&mut self) {
        *self = Self {
            global: self.global,
            ..Self::default()
        };
    }

    /// The equalizer was written outside the push path
    pub fn invalidate_equalizer(&mut self) {
        self.equalizer = None;
    }

    fn is_current(&self, category: Category, config: &DeviceConfiguration) -> bool {
        match category {
            Category::Equalizer => matches!(
                &self.equalizer,
                Some((enabled, levels))
                    if *enabled == config.equalizer.enabled && *levels == config.equalizer.levels_db
            ),
            Category::Bass => self.bass == Some(config.bass),
            Category::Virtualizer => self.virtualizer == Some(config.virtualizer),
            Category::Treble => self.treble == Some(config.treble),
            Category::Reverb => self.reverb == Some(config.reverb),
            Category::VolumeBoost => self.volume_boost == Some(config.volume_boost_enabled),
        }
    }

    fn record(&mut self, category: Category, config: &DeviceConfiguration) {
        match category {
            Category::Equalizer => {
                self.equalizer = Some((config.equalizer.enabled, config.equalizer.levels_db.clone()))
            }
            Category::Bass => self.bass = Some(config.bass),
            Category::Virtualizer => self.virtualizer = Some(config.virtualizer),
            Category::Treble => self.treble = Some(config.treble),
            Category::Reverb => self.reverb = Some(config.reverb),
            Category::VolumeBoost => self.volume_boost = Some(config.volume_boost_enabled),
        }
    }

    fn forget(&mut self, category: Category) {
        match category {
            Category::Equalizer => self.equalizer = None,
            Category::Bass => self.bass = None,
            Category::Virtualizer => self.virtualizer = None,
            Category::Treble => self.treble = None,
            Category::Reverb => self.reverb = None,
            Category::VolumeBoost => self.volume_boost = None,
        }
    }
}

/// What a push did, for logging and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub global_written: bool,
    pub bypassed: bool,
    pub pushed: Vec<Category>,
    pub failed: Vec<Category>,
}

/// Categories that `flags` asks for, the backend supports and that differ
/// from what was last applied
pub fn plan_push(
    backend: &dyn EffectBackend,
    flags: ChangeFlags,
    config: &DeviceConfiguration,
    applied: &AppliedState,
) -> Vec<Category> {
    Category::ALL
        .into_iter()
        .filter(|c| flags.contains(c.flag()))
        .filter(|c| c.supported_by(backend))
        .filter(|c| !applied.is_current(*c, config))
        .collect()
}

/// Push the categories named by `flags` from `config` to `backend`
pub fn push_configuration(
    backend: &mut dyn EffectBackend,
    flags: ChangeFlags,
    config: &DeviceConfiguration,
    applied: &mut AppliedState,
) -> PushReport {
    let session = backend.session_id();
    let mut report = PushReport::default();

    if flags.contains(ChangeFlags::ALL) && applied.global != Some(config.global_enabled) {
        match backend.set_global_enabled(config.global_enabled) {
            Ok(()) => {
                applied.global = Some(config.global_enabled);
                applied.clear_effects();
                report.global_written = true;
            }
            Err(e) => {
                warn!("Session {}: global enable failed: {}", session, e);
                applied.global = None;
            }
        }
    }

    if !config.global_enabled {
        debug!("Session {}: globally bypassed, skipping effects", session);
        report.bypassed = true;
        return report;
    }

    let plan = plan_push(backend, flags, config, applied);
    if plan.is_empty() {
        debug!("Session {}: nothing to push for {:?}", session, flags);
        return report;
    }

    if !backend.begin_update() {
        warn!("Session {}: backend refused to begin update", session);
    }

    for category in plan {
        match apply_category(backend, category, config) {
            Ok(()) => {
                applied.record(category, config);
                report.pushed.push(category);
            }
            Err(e) => {
                warn!("Session {}: {:?} push failed: {}", session, category, e);
                applied.forget(category);
                report.failed.push(category);
            }
        }
    }

    if !backend.commit_update() {
        // Buffered writes may never have reached the backend
        warn!("Session {}: backend failed to commit update", session);
        for category in report.pushed.drain(..) {
            applied.forget(category);
            report.failed.push(category);
        }
    }

    debug!(
        "Session {}: pushed {:?}, failed {:?}",
        session, report.pushed, report.failed
    );
    report
}

fn apply_category(
    backend: &mut dyn EffectBackend,
    category: Category,
    config: &DeviceConfiguration,
) -> PlatformResult<()> {
    match category {
        Category::Equalizer => {
            let eq = &config.equalizer;
            if eq.enabled {
                backend.set_equalizer_levels(&eq.levels_db)?;
            }
            backend.enable_equalizer(eq.enabled)
        }
        Category::Bass => {
            backend.enable_bass_boost(config.bass.enabled)?;
            if config.bass.enabled {
                backend.set_bass_boost_strength(config.bass.strength)?;
            }
            Ok(())
        }
        Category::Virtualizer => {
            backend.enable_virtualizer(config.virtualizer.enabled)?;
            if config.virtualizer.enabled {
                backend.set_virtualizer_strength(config.virtualizer.strength)?;
            }
            Ok(())
        }
        Category::Treble => {
            backend.enable_treble_boost(config.treble.enabled)?;
            if config.treble.enabled {
                backend.set_treble_boost_strength(config.treble.strength)?;
            }
            Ok(())
        }
        Category::Reverb => {
            backend.enable_reverb(config.reverb.enabled)?;
            if config.reverb.enabled {
                backend.set_reverb_preset(config.reverb.preset)?;
            }
            Ok(())
        }
        Category::VolumeBoost => backend.enable_volume_boost(config.volume_boost_enabled),
    }
}
