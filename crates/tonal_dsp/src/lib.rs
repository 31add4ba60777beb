//! Tonal DSP - Equalizer Response Math
//!
//! This crate provides the pure numerical pieces behind the EQ display:
//! - Complex arithmetic for z-domain evaluation
//! - RBJ high-shelf biquad transfer functions
//! - Multi-band frequency response curve sampling
//! - Built-in and custom presets with a stable text form
//!
//! Nothing here touches audio buffers; the platform effect backend does the
//! actual processing.

mod biquad;
mod complex;
mod curve;
mod error;
mod presets;

pub use biquad::BiquadFilter;
pub use complex::ComplexNumber;
pub use curve::{
    db_to_lin, lin_to_db, project_x, project_y, reverse_project_x, CurvePoint,
    FrequencyResponseCurve, DB_FLOOR, DEFAULT_MAX_FREQ, DEFAULT_MIN_FREQ, DEFAULT_POINTS,
    DEFAULT_SAMPLE_RATE,
};
pub use error::DspError;
pub use presets::{
    builtin_presets, format_levels, parse_levels, resample_levels, Preset, PresetKind,
    PresetLibrary, CUSTOM_PRESET_NAME,
};
