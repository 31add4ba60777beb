//! Equalizer Frequency Response Curve
//!
//! Approximates the response of a multi-band equalizer for display by
//! chaining one high shelf per gap between adjacent bands:
//!
//! ```text
//! gain(level[0]) ─▶ shelf(level[1]-level[0]) ─▶ ... ─▶ shelf(level[n-1]-level[n-2])
//! ```
//!
//! Each shelf sits at the geometric mean of the two band centres it
//! separates. The product of all magnitudes is sampled at log-spaced
//! frequencies and converted to dB.

use serde::{Deserialize, Serialize};

use crate::biquad::BiquadFilter;
use crate::complex::ComplexNumber;
use crate::error::DspError;

/// Sample rate the curve is drawn at (Hz)
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Lowest frequency on the horizontal axis (Hz)
pub const DEFAULT_MIN_FREQ: f64 = 10.0;

/// Highest frequency on the horizontal axis (Hz)
pub const DEFAULT_MAX_FREQ: f64 = 21000.0;

/// Number of points evaluated per curve
pub const DEFAULT_POINTS: usize = 128;

/// dB value reported for a zero magnitude instead of -inf
pub const DB_FLOOR: f64 = -99.9;

/// Shelf slope used for every segment
const SHELF_SLOPE: f64 = 1.0;

/// One evaluated point of the response curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub frequency_hz: f64,
    pub gain_db: f64,
}

/// Convert a linear magnitude to dB, clamping zero (and NaN) to [`DB_FLOOR`]
pub fn lin_to_db(rho: f64) -> f64 {
    if rho > 0.0 {
        (20.0 * rho.log10()).max(DB_FLOOR)
    } else {
        DB_FLOOR
    }
}

/// Convert dB to linear amplitude: 10^(dB/20)
pub fn db_to_lin(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Map a frequency onto [0, 1] on a logarithmic axis
pub fn project_x(freq_hz: f64, min_freq: f64, max_freq: f64) -> f64 {
    (freq_hz / min_freq).ln() / (max_freq / min_freq).ln()
}

/// Inverse of [`project_x`]
pub fn reverse_project_x(x: f64, min_freq: f64, max_freq: f64) -> f64 {
    min_freq * (max_freq / min_freq).powf(x)
}

/// Map a dB value onto [0, 1] for a symmetric `±range_db` axis, 0 at the top
pub fn project_y(db: f64, range_db: f64) -> f64 {
    (0.5 - db / (2.0 * range_db)).clamp(0.0, 1.0)
}

/// Evaluates the drawn EQ response for a fixed band layout
#[derive(Debug, Clone)]
pub struct FrequencyResponseCurve {
    center_freqs: Vec<f64>,
    sample_rate: f64,
    min_freq: f64,
    max_freq: f64,
    num_points: usize,
}

impl FrequencyResponseCurve {
    /// Create a curve for the given band centre frequencies (Hz, ascending)
    pub fn new(center_freqs: Vec<f64>) -> Result<Self, DspError> {
        if center_freqs.is_empty() {
            return Err(DspError::InvalidBandCount(0));
        }
        Ok(Self {
            center_freqs,
            sample_rate: DEFAULT_SAMPLE_RATE,
            min_freq: DEFAULT_MIN_FREQ,
            max_freq: DEFAULT_MAX_FREQ,
            num_points: DEFAULT_POINTS,
        })
    }

    /// Override the horizontal frequency range
    pub fn with_range(mut self, min_freq: f64, max_freq: f64) -> Result<Self, DspError> {
        if !(min_freq > 0.0 && max_freq > min_freq) {
            return Err(DspError::InvalidFrequencyRange {
                min: min_freq,
                max: max_freq,
            });
        }
        self.min_freq = min_freq;
        self.max_freq = max_freq;
        Ok(self)
    }

    /// Override the evaluation sample rate
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Result<Self, DspError> {
        if !(sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        self.sample_rate = sample_rate;
        Ok(self)
    }

    /// Override the number of sample points (at least 2)
    pub fn with_points(mut self, num_points: usize) -> Self {
        self.num_points = num_points.max(2);
        self
    }

    pub fn band_count(&self) -> usize {
        self.center_freqs.len()
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Frequencies the curve is sampled at, log-spaced from min to max
    pub fn sample_frequencies(&self) -> Vec<f64> {
        let last = (self.num_points - 1) as f64;
        (0..self.num_points)
            .map(|i| reverse_project_x(i as f64 / last, self.min_freq, self.max_freq))
            .collect()
    }

    /// Evaluate the curve for one level per band (dB)
    pub fn evaluate(&self, levels_db: &[f32]) -> Result<Vec<CurvePoint>, DspError> {
        let (base_gain, shelves) = self.build_shelves(levels_db)?;

        Ok(self
            .sample_frequencies()
            .into_iter()
            .map(|frequency_hz| CurvePoint {
                frequency_hz,
                gain_db: lin_to_db(self.magnitude(base_gain, &shelves, frequency_hz)),
            })
            .collect())
    }

    /// Evaluate the response at a single frequency (dB)
    pub fn gain_at(&self, levels_db: &[f32], freq_hz: f64) -> Result<f64, DspError> {
        let (base_gain, shelves) = self.build_shelves(levels_db)?;
        Ok(lin_to_db(self.magnitude(base_gain, &shelves, freq_hz)))
    }

    fn build_shelves(&self, levels_db: &[f32]) -> Result<(f64, Vec<BiquadFilter>), DspError> {
        if levels_db.len() != self.center_freqs.len() {
            return Err(DspError::LevelCountMismatch {
                expected: self.center_freqs.len(),
                got: levels_db.len(),
            });
        }

        let base_gain = db_to_lin(f64::from(levels_db[0]));
        let shelves = self
            .center_freqs
            .windows(2)
            .zip(levels_db.windows(2))
            .map(|(freqs, levels)| {
                let corner = (freqs[0] * freqs[1]).sqrt();
                let gain_db = f64::from(levels[1]) - f64::from(levels[0]);
                BiquadFilter::high_shelf(corner, self.sample_rate, gain_db, SHELF_SLOPE)
            })
            .collect();

        Ok((base_gain, shelves))
    }

    fn magnitude(&self, base_gain: f64, shelves: &[BiquadFilter], freq_hz: f64) -> f64 {
        let omega = 2.0 * std::f64::consts::PI * freq_hz / self.sample_rate;
        let z = ComplexNumber::from_polar_unit(omega);
        shelves
            .iter()
            .fold(base_gain, |gain, shelf| gain * shelf.evaluate_transfer(z).rho())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Typical 5-band layout (Hz)
    fn five_band() -> FrequencyResponseCurve {
        FrequencyResponseCurve::new(vec![60.0, 230.0, 910.0, 3600.0, 14000.0]).unwrap()
    }

    #[test]
    fn test_lin_to_db_floor() {
        assert_eq!(lin_to_db(0.0), DB_FLOOR);
        assert_eq!(lin_to_db(f64::NAN), DB_FLOOR);
        assert!((lin_to_db(1.0)).abs() < 1e-12);
        assert!((lin_to_db(10.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_roundtrip() {
        for x in [0.0, 0.25, 0.5, 1.0] {
            let f = reverse_project_x(x, DEFAULT_MIN_FREQ, DEFAULT_MAX_FREQ);
            let back = project_x(f, DEFAULT_MIN_FREQ, DEFAULT_MAX_FREQ);
            assert!((back - x).abs() < 1e-9);
        }
        assert_eq!(project_y(0.0, 15.0), 0.5);
        assert_eq!(project_y(15.0, 15.0), 0.0);
        assert_eq!(project_y(-40.0, 15.0), 1.0);
    }

    #[test]
    fn test_sample_frequencies_span_range() {
        let curve = five_band().with_points(64);
        let freqs = curve.sample_frequencies();
        assert_eq!(freqs.len(), 64);
        assert!((freqs[0] - DEFAULT_MIN_FREQ).abs() < 1e-9);
        assert!((freqs[63] - DEFAULT_MAX_FREQ).abs() < 1e-6);
        assert!(freqs.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_flat_levels_give_flat_curve() {
        let points = five_band().evaluate(&[0.0; 5]).unwrap();
        assert_eq!(points.len(), DEFAULT_POINTS);
        for p in points {
            assert!(p.gain_db.abs() < 1e-6, "{:?}", p);
        }
    }

    #[test]
    fn test_uniform_levels_offset_curve() {
        let points = five_band().evaluate(&[6.0; 5]).unwrap();
        for p in points {
            assert!((p.gain_db - 6.0).abs() < 1e-5, "{:?}", p);
        }
    }

    #[test]
    fn test_step_rises_to_upper_level() {
        let curve = FrequencyResponseCurve::new(vec![100.0, 10000.0]).unwrap();
        let low = curve.gain_at(&[0.0, 12.0], 20.0).unwrap();
        let high = curve.gain_at(&[0.0, 12.0], 20000.0).unwrap();
        assert!(low.abs() < 0.5, "low end should stay near 0 dB: {}", low);
        assert!((high - 12.0).abs() < 0.5, "high end should approach 12 dB: {}", high);
    }

    #[test]
    fn test_single_band_is_constant_gain() {
        let curve = FrequencyResponseCurve::new(vec![1000.0]).unwrap();
        let points = curve.evaluate(&[-3.0]).unwrap();
        for p in points {
            assert!((p.gain_db + 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_level_count_mismatch() {
        let err = five_band().evaluate(&[0.0; 3]).unwrap_err();
        assert_eq!(
            err,
            DspError::LevelCountMismatch {
                expected: 5,
                got: 3
            }
        );
    }

    #[test]
    fn test_invalid_construction() {
        assert!(FrequencyResponseCurve::new(vec![]).is_err());
        assert!(five_band().with_range(100.0, 50.0).is_err());
        assert!(five_band().with_sample_rate(0.0).is_err());
    }
}
