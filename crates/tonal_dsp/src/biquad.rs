//! High-Shelf Biquad Transfer Function
//!
//! Coefficients follow the RBJ (Robert Bristow-Johnson) Audio EQ Cookbook
//! high-shelf design. The filter holds no delay-line state: it is only
//! evaluated in the z-domain to draw a frequency response.

use std::f64::consts::PI;

use crate::complex::ComplexNumber;

/// Second-order filter described by six complex coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadFilter {
    b0: ComplexNumber,
    b1: ComplexNumber,
    b2: ComplexNumber,
    a0: ComplexNumber,
    a1: ComplexNumber,
    a2: ComplexNumber,
}

impl Default for BiquadFilter {
    /// Identity filter, H(z) = 1
    fn default() -> Self {
        Self {
            b0: ComplexNumber::ONE,
            b1: ComplexNumber::ZERO,
            b2: ComplexNumber::ZERO,
            a0: ComplexNumber::ONE,
            a1: ComplexNumber::ZERO,
            a2: ComplexNumber::ZERO,
        }
    }
}

impl BiquadFilter {
    /// Create a high-shelf filter
    pub fn high_shelf(center_freq_hz: f64, sample_rate_hz: f64, gain_db: f64, slope: f64) -> Self {
        let mut filter = Self::default();
        filter.configure_high_shelf(center_freq_hz, sample_rate_hz, gain_db, slope);
        filter
    }

    /// Recompute coefficients for a high shelf
    ///
    /// `slope` = 1 gives the steepest shelf without overshoot.
    pub fn configure_high_shelf(
        &mut self,
        center_freq_hz: f64,
        sample_rate_hz: f64,
        gain_db: f64,
        slope: f64,
    ) {
        let w0 = 2.0 * PI * center_freq_hz / sample_rate_hz;
        let a = 10.0_f64.powf(gain_db / 40.0);
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / 2.0 * ((a + 1.0 / a) * (1.0 / slope - 1.0) + 2.0).sqrt();
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        self.b0 = (a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha)).into();
        self.b1 = (-2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0)).into();
        self.b2 = (a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha)).into();
        self.a0 = ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha).into();
        self.a1 = (2.0 * ((a - 1.0) - (a + 1.0) * cos_w0)).into();
        self.a2 = ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha).into();
    }

    /// Evaluate H(z) = (b0 + b1 z^-1 + b2 z^-2) / (a0 + a1 z^-1 + a2 z^-2)
    pub fn evaluate_transfer(&self, z: ComplexNumber) -> ComplexNumber {
        let z_squared = z * z;
        let numerator = self.b0 + self.b1 / z + self.b2 / z_squared;
        let denominator = self.a0 + self.a1 / z + self.a2 / z_squared;
        numerator / denominator
    }

    /// Linear magnitude response at `freq_hz`
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sample_rate_hz;
        self.evaluate_transfer(ComplexNumber::from_polar_unit(omega))
            .rho()
    }

    /// Numerator coefficients (b0, b1, b2)
    pub fn numerator(&self) -> [ComplexNumber; 3] {
        [self.b0, self.b1, self.b2]
    }

    /// Denominator coefficients (a0, a1, a2)
    pub fn denominator(&self) -> [ComplexNumber; 3] {
        [self.a0, self.a1, self.a2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 44100.0;

    #[test]
    fn test_default_is_identity() {
        let filter = BiquadFilter::default();
        for omega in [0.1, 1.0, 2.5] {
            let h = filter.evaluate_transfer(ComplexNumber::from_polar_unit(omega));
            assert!((h.rho() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_gain_is_flat() {
        let filter = BiquadFilter::high_shelf(1000.0, FS, 0.0, 1.0);
        for freq in [10.0, 100.0, 1000.0, 5000.0, 15000.0, 21000.0] {
            let mag = filter.magnitude_at(freq, FS);
            assert!((mag - 1.0).abs() < 1e-6, "freq {}: {}", freq, mag);
        }
    }

    #[test]
    fn test_nyquist_reaches_shelf_gain() {
        for gain_db in [-12.0, -3.0, 6.0, 15.0] {
            let filter = BiquadFilter::high_shelf(1000.0, FS, gain_db, 1.0);
            let expected = 10.0_f64.powf(gain_db / 20.0);
            let at_nyquist = filter.evaluate_transfer(ComplexNumber::new(-1.0, 0.0)).rho();
            assert!(
                (at_nyquist - expected).abs() < 1e-6 * expected.max(1.0),
                "gain {}: {} vs {}",
                gain_db,
                at_nyquist,
                expected
            );
        }
    }

    #[test]
    fn test_dc_is_unity() {
        let filter = BiquadFilter::high_shelf(2000.0, FS, 9.0, 1.0);
        let at_dc = filter.evaluate_transfer(ComplexNumber::ONE).rho();
        assert!((at_dc - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_boost_rises_with_frequency() {
        let filter = BiquadFilter::high_shelf(1000.0, FS, 12.0, 1.0);
        let low = filter.magnitude_at(50.0, FS);
        let high = filter.magnitude_at(15000.0, FS);
        assert!(high > low);
        assert!(high > 3.5, "near-asymptote boost should approach 4x: {}", high);
    }

    #[test]
    fn test_reconfigure_replaces_coefficients() {
        let mut filter = BiquadFilter::high_shelf(1000.0, FS, 12.0, 1.0);
        filter.configure_high_shelf(1000.0, FS, 0.0, 1.0);
        let mag = filter.magnitude_at(12000.0, FS);
        assert!((mag - 1.0).abs() < 1e-6);
        assert_eq!(filter.numerator()[2], filter.denominator()[2]);
    }
}
