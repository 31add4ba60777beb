//! Equalizer Presets
//!
//! Built-in presets are immutable and defined on a 10-point ISO octave grid,
//! then resampled to whatever band count the output device exposes. A single
//! custom preset is user-editable unless locked.
//!
//! Text form (used for persistence in the flat key-value store):
//!
//! ```text
//! built-in:  Rock|5;3;-1;3;5
//! custom:    Custom|1.5;0;-2.25;0;4|locked
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DspError;

/// Field separator between name, levels and lock flag
const FIELD_SEP: char = '|';

/// Separator between band levels
const LEVEL_SEP: char = ';';

const LOCKED: &str = "locked";
const UNLOCKED: &str = "unlocked";

/// Name given to the user preset when none is stored
pub const CUSTOM_PRESET_NAME: &str = "Custom";

/// Built-in presets on the 10-band octave grid (31 Hz .. 16 kHz)
const BUILTIN_TABLE: &[(&str, [f32; 10])] = &[
    ("Normal", [3.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 3.0, 3.0]),
    ("Classical", [5.0, 4.0, 3.0, 1.0, -1.0, -1.0, 0.0, 2.0, 4.0, 4.0]),
    ("Dance", [6.0, 6.0, 3.0, 0.0, 0.0, 2.0, 4.0, 4.0, 1.0, 0.0]),
    ("Flat", [0.0; 10]),
    ("Folk", [3.0, 3.0, 0.0, 0.0, 0.0, 2.0, 2.0, 1.0, -1.0, -1.0]),
    ("Heavy Metal", [4.0, 4.0, 1.0, 0.0, 9.0, 9.0, 3.0, 1.0, 0.0, 0.0]),
    ("Hip Hop", [5.0, 5.0, 3.0, 0.0, -1.0, -1.0, 1.0, 1.0, 3.0, 3.0]),
    ("Jazz", [4.0, 4.0, 2.0, 0.0, -2.0, -2.0, 0.0, 2.0, 5.0, 5.0]),
    ("Pop", [-1.0, -1.0, 2.0, 4.0, 5.0, 5.0, 2.0, 0.0, -2.0, -2.0]),
    ("Rock", [5.0, 5.0, 3.0, 0.0, -1.0, -1.0, 0.0, 3.0, 5.0, 5.0]),
];

/// Kind of preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PresetKind {
    /// Shipped preset, never edited
    BuiltIn,
    /// The user preset; `locked` refuses edits
    Custom { locked: bool },
}

/// Named sequence of per-band levels in dB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    name: String,
    levels: Vec<f32>,
    kind: PresetKind,
}

impl Preset {
    /// Create a built-in preset
    pub fn builtin(name: impl Into<String>, levels: Vec<f32>) -> Result<Self, DspError> {
        Self::validated(name.into(), levels, PresetKind::BuiltIn)
    }

    /// Create the custom preset
    pub fn custom(
        name: impl Into<String>,
        levels: Vec<f32>,
        locked: bool,
    ) -> Result<Self, DspError> {
        Self::validated(name.into(), levels, PresetKind::Custom { locked })
    }

    fn validated(name: String, levels: Vec<f32>, kind: PresetKind) -> Result<Self, DspError> {
        if name.contains(&[FIELD_SEP, LEVEL_SEP, '\n'][..]) {
            return Err(DspError::PresetParse(format!(
                "name may not contain '{}', '{}' or newlines: {:?}",
                FIELD_SEP, LEVEL_SEP, name
            )));
        }
        if levels.is_empty() {
            return Err(DspError::InvalidBandCount(0));
        }
        Ok(Self { name, levels, kind })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    pub fn kind(&self) -> PresetKind {
        self.kind
    }

    pub fn band_count(&self) -> usize {
        self.levels.len()
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.kind, PresetKind::Custom { .. })
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.kind, PresetKind::Custom { locked: true })
    }

    /// Parse a stored preset, forcing it to the custom kind
    ///
    /// A missing lock flag reads as unlocked.
    pub fn parse_custom(s: &str) -> Result<Self, DspError> {
        let parsed: Preset = s.parse()?;
        let locked = parsed.is_locked();
        Self::custom(parsed.name, parsed.levels, locked)
    }

    /// Parse a stored preset, forcing it to the built-in kind
    pub fn parse_builtin(s: &str) -> Result<Self, DspError> {
        let parsed: Preset = s.parse()?;
        Self::builtin(parsed.name, parsed.levels)
    }

    /// Set one band level; refused for built-ins and locked custom presets
    pub fn set_level(&mut self, band: usize, level_db: f32) -> Result<(), DspError> {
        self.ensure_editable()?;
        let band_count = self.levels.len();
        let slot = self
            .levels
            .get_mut(band)
            .ok_or(DspError::InvalidBandIndex {
                index: band,
                band_count,
            })?;
        *slot = level_db;
        Ok(())
    }

    /// Replace all levels; refused for built-ins and locked custom presets
    pub fn set_levels(&mut self, levels_db: &[f32]) -> Result<(), DspError> {
        self.ensure_editable()?;
        if levels_db.len() != self.levels.len() {
            return Err(DspError::LevelCountMismatch {
                expected: self.levels.len(),
                got: levels_db.len(),
            });
        }
        self.levels.copy_from_slice(levels_db);
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), DspError> {
        match self.kind {
            PresetKind::Custom { locked: false } => Ok(()),
            _ => Err(DspError::PresetLocked),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, FIELD_SEP)?;
        for (i, level) in self.levels.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", LEVEL_SEP)?;
            }
            // `{}` on f32 prints the shortest representation that parses back exactly
            write!(f, "{}", level)?;
        }
        if let PresetKind::Custom { locked } = self.kind {
            write!(f, "{}{}", FIELD_SEP, if locked { LOCKED } else { UNLOCKED })?;
        }
        Ok(())
    }
}

impl FromStr for Preset {
    type Err = DspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(FIELD_SEP).collect();
        let (name, levels, kind) = match fields.as_slice() {
            [name, levels] => (*name, *levels, PresetKind::BuiltIn),
            [name, levels, flag] => {
                let locked = match *flag {
                    LOCKED => true,
                    UNLOCKED => false,
                    other => {
                        return Err(DspError::PresetParse(format!("unknown lock flag {:?}", other)))
                    }
                };
                (*name, *levels, PresetKind::Custom { locked })
            }
            _ => return Err(DspError::PresetParse(format!("expected 2 or 3 fields: {:?}", s))),
        };

        let levels = parse_levels(levels)?;
        Self::validated(name.to_string(), levels, kind)
    }
}

/// Parse `l0;l1;...` into dB levels
pub fn parse_levels(s: &str) -> Result<Vec<f32>, DspError> {
    if s.trim().is_empty() {
        return Err(DspError::InvalidBandCount(0));
    }
    s.split(LEVEL_SEP)
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| DspError::PresetParse(format!("bad level {:?}: {}", part, e)))
        })
        .collect()
}

/// Format dB levels as `l0;l1;...`
pub fn format_levels(levels: &[f32]) -> String {
    levels
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(&LEVEL_SEP.to_string())
}

/// Linearly resample a level table onto `band_count` evenly spaced bands
pub fn resample_levels(source: &[f32], band_count: usize) -> Vec<f32> {
    match (source.len(), band_count) {
        (_, 0) | (0, _) => Vec::new(),
        (1, n) => vec![source[0]; n],
        (_, 1) => vec![source[0]],
        (len, n) => (0..n)
            .map(|i| {
                let pos = i as f32 * (len - 1) as f32 / (n - 1) as f32;
                let lower = pos.floor() as usize;
                let upper = (lower + 1).min(len - 1);
                let frac = pos - lower as f32;
                source[lower] + (source[upper] - source[lower]) * frac
            })
            .collect(),
    }
}

/// Built-in presets resampled for a device with `band_count` bands
pub fn builtin_presets(band_count: usize) -> Result<Vec<Preset>, DspError> {
    if band_count == 0 {
        return Err(DspError::InvalidBandCount(0));
    }
    BUILTIN_TABLE
        .iter()
        .map(|(name, levels)| Preset::builtin(*name, resample_levels(levels, band_count)))
        .collect()
}

/// All presets available for one device: built-ins followed by the custom preset
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    band_count: usize,
    builtins: Vec<Preset>,
    custom: Preset,
}

impl PresetLibrary {
    /// Library with a flat, unlocked custom preset
    pub fn new(band_count: usize) -> Result<Self, DspError> {
        let builtins = builtin_presets(band_count)?;
        let custom = Preset::custom(CUSTOM_PRESET_NAME, vec![0.0; band_count], false)?;
        Ok(Self {
            band_count,
            builtins,
            custom,
        })
    }

    /// Replace the custom preset (e.g. one restored from storage)
    pub fn with_custom(mut self, custom: Preset) -> Result<Self, DspError> {
        if !custom.is_custom() {
            return Err(DspError::PresetParse(format!(
                "{:?} is not a custom preset",
                custom.name()
            )));
        }
        if custom.band_count() != self.band_count {
            return Err(DspError::LevelCountMismatch {
                expected: self.band_count,
                got: custom.band_count(),
            });
        }
        self.custom = custom;
        Ok(self)
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Total number of presets, custom included
    pub fn len(&self) -> usize {
        self.builtins.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of the custom preset
    pub fn custom_index(&self) -> usize {
        self.builtins.len()
    }

    pub fn get(&self, index: usize) -> Option<&Preset> {
        if index == self.custom_index() {
            Some(&self.custom)
        } else {
            self.builtins.get(index)
        }
    }

    pub fn find(&self, name: &str) -> Option<(usize, &Preset)> {
        self.builtins
            .iter()
            .chain(std::iter::once(&self.custom))
            .enumerate()
            .find(|(_, p)| p.name() == name)
    }

    pub fn custom(&self) -> &Preset {
        &self.custom
    }

    pub fn set_custom_level(&mut self, band: usize, level_db: f32) -> Result<(), DspError> {
        self.custom.set_level(band, level_db)
    }

    pub fn set_custom_levels(&mut self, levels_db: &[f32]) -> Result<(), DspError> {
        self.custom.set_levels(levels_db)
    }

    pub fn set_custom_locked(&mut self, locked: bool) {
        self.custom.kind = PresetKind::Custom { locked };
    }

    /// Copy a built-in's levels into the custom preset
    pub fn copy_to_custom(&mut self, index: usize) -> Result<(), DspError> {
        let levels = self
            .builtins
            .get(index)
            .ok_or(DspError::InvalidBandIndex {
                index,
                band_count: self.builtins.len(),
            })?
            .levels
            .clone();
        self.custom.set_levels(&levels)
    }
}
