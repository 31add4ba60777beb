//! Device Configuration
//!
//! Typed view of one device scope in the [`DeviceConfigurationStore`].
//! Loaded fresh for every push; the store stays the source of truth.

use serde::{Deserialize, Serialize};
use tracing::warn;

use tonal_dsp::{parse_levels, PresetLibrary};

use crate::store::DeviceConfigurationStore;

/// Configuration keys, flat within a device scope
pub mod keys {
    pub const GLOBAL_ENABLE: &str = "global_enable";
    pub const EQ_ENABLE: &str = "eq_enable";
    pub const EQ_PRESET: &str = "eq_preset";
    /// Semicolon-separated dB levels, one per band
    pub const EQ_LEVELS: &str = "eq_levels";
    pub const BASS_ENABLE: &str = "bass_enable";
    pub const BASS_STRENGTH: &str = "bass_strength";
    pub const VIRTUALIZER_ENABLE: &str = "virtualizer_enable";
    pub const VIRTUALIZER_STRENGTH: &str = "virtualizer_strength";
    pub const TREBLE_ENABLE: &str = "treble_enable";
    pub const TREBLE_STRENGTH: &str = "treble_strength";
    pub const REVERB_ENABLE: &str = "reverb_enable";
    pub const REVERB_PRESET: &str = "reverb_preset";
    pub const VOLUME_BOOST_ENABLE: &str = "volume_boost_enable";

    pub const BOOL_KEYS: [&str; 7] = [
        GLOBAL_ENABLE,
        EQ_ENABLE,
        BASS_ENABLE,
        VIRTUALIZER_ENABLE,
        TREBLE_ENABLE,
        REVERB_ENABLE,
        VOLUME_BOOST_ENABLE,
    ];

    pub const STRING_KEYS: [&str; 6] = [
        EQ_PRESET,
        EQ_LEVELS,
        BASS_STRENGTH,
        VIRTUALIZER_STRENGTH,
        TREBLE_STRENGTH,
        REVERB_PRESET,
    ];

    pub fn is_bool_key(key: &str) -> bool {
        BOOL_KEYS.contains(&key)
    }

    pub fn is_known(key: &str) -> bool {
        is_bool_key(key) || STRING_KEYS.contains(&key)
    }
}

/// Preset used when a device has never been configured
pub const DEFAULT_EQ_PRESET: &str = "Flat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerSettings {
    pub enabled: bool,
    pub preset: String,
    pub levels_db: Vec<f32>,
}

/// On/off plus a 0..=1000 strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StrengthSettings {
    pub enabled: bool,
    pub strength: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReverbSettings {
    pub enabled: bool,
    pub preset: u16,
}

/// All effect parameters for one output device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfiguration {
    pub scope: String,
    pub global_enabled: bool,
    pub equalizer: EqualizerSettings,
    pub bass: StrengthSettings,
    pub virtualizer: StrengthSettings,
    pub treble: StrengthSettings,
    pub reverb: ReverbSettings,
    pub volume_boost_enabled: bool,
}

impl DeviceConfiguration {
    /// Read `scope` from `store` for an equalizer with `band_count` bands
    ///
    /// Explicit `eq_levels` win over `eq_preset`; anything unusable falls
    /// back to a flat curve.
    pub fn load(store: &dyn DeviceConfigurationStore, scope: &str, band_count: usize) -> Self {
        let preset = store.get_string(scope, keys::EQ_PRESET, DEFAULT_EQ_PRESET);
        let levels_db = resolve_levels(store, scope, &preset, band_count);

        Self {
            scope: scope.to_string(),
            global_enabled: store.get_bool(scope, keys::GLOBAL_ENABLE, false),
            equalizer: EqualizerSettings {
                enabled: store.get_bool(scope, keys::EQ_ENABLE, false),
                preset,
                levels_db,
            },
            bass: StrengthSettings {
                enabled: store.get_bool(scope, keys::BASS_ENABLE, false),
                strength: read_u16(store, scope, keys::BASS_STRENGTH),
            },
            virtualizer: StrengthSettings {
                enabled: store.get_bool(scope, keys::VIRTUALIZER_ENABLE, false),
                strength: read_u16(store, scope, keys::VIRTUALIZER_STRENGTH),
            },
            treble: StrengthSettings {
                enabled: store.get_bool(scope, keys::TREBLE_ENABLE, false),
                strength: read_u16(store, scope, keys::TREBLE_STRENGTH),
            },
            reverb: ReverbSettings {
                enabled: store.get_bool(scope, keys::REVERB_ENABLE, false),
                preset: read_u16(store, scope, keys::REVERB_PRESET),
            },
            volume_boost_enabled: store.get_bool(scope, keys::VOLUME_BOOST_ENABLE, false),
        }
    }
}

fn read_u16(store: &dyn DeviceConfigurationStore, scope: &str, key: &str) -> u16 {
    let raw = store.get_string(scope, key, "0");
    match raw.trim().parse::<u16>() {
        Ok(value) => value,
        Err(e) => {
            warn!("{}/{}: bad value {:?} ({}), using 0", scope, key, raw, e);
            0
        }
    }
}

fn resolve_levels(
    store: &dyn DeviceConfigurationStore,
    scope: &str,
    preset: &str,
    band_count: usize,
) -> Vec<f32> {
    let raw = store.get_string(scope, keys::EQ_LEVELS, "");
    if !raw.is_empty() {
        match parse_levels(&raw) {
            Ok(levels) if levels.len() == band_count => return levels,
            Ok(levels) => warn!(
                "{}/{}: {} levels stored for a {}-band equalizer, ignoring",
                scope,
                keys::EQ_LEVELS,
                levels.len(),
                band_count
            ),
            Err(e) => warn!("{}/{}: {}", scope, keys::EQ_LEVELS, e),
        }
    }

    let from_preset = PresetLibrary::new(band_count)
        .ok()
        .and_then(|library| library.find(preset).map(|(_, p)| p.levels().to_vec()));
    match from_preset {
        Some(levels) => levels,
        None => {
            if preset != DEFAULT_EQ_PRESET {
                warn!("{}: unknown preset {:?}, using flat levels", scope, preset);
            }
            vec![0.0; band_count]
        }
    }
}
