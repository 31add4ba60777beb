//! Complex Arithmetic
//!
//! Thin wrapper over [`num_complex::Complex64`] used to evaluate filter
//! transfer functions on the unit circle. Division follows conjugate
//! normalisation, `a / b = a * conj(b) / |b|^2`, and a zero-modulus divisor
//! yields [`ComplexNumber::NAN`].

use std::ops::{Add, Div, Mul, Neg, Sub};

use num_complex::Complex64;

/// A complex number in rectangular form
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComplexNumber(Complex64);

impl ComplexNumber {
    pub const ZERO: Self = Self::new(0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 0.0);

    /// Result of dividing by a zero-modulus value
    pub const NAN: Self = Self::new(f64::NAN, f64::NAN);

    pub const fn new(re: f64, im: f64) -> Self {
        Self(Complex64::new(re, im))
    }

    /// Point on the unit circle at angle `omega` (radians)
    pub fn from_polar_unit(omega: f64) -> Self {
        Self(Complex64::cis(omega))
    }

    pub fn re(self) -> f64 {
        self.0.re
    }

    pub fn im(self) -> f64 {
        self.0.im
    }

    /// Complex conjugate
    pub fn conj(self) -> Self {
        Self(self.0.conj())
    }

    /// Modulus |z|
    pub fn rho(self) -> f64 {
        self.0.norm()
    }

    /// Squared modulus, avoids the square root when only normalising
    pub fn rho_squared(self) -> f64 {
        self.0.norm_sqr()
    }

    /// Argument in radians, in (-pi, pi]
    pub fn theta(self) -> f64 {
        self.0.arg()
    }

    /// Multiply by a real scalar
    pub fn scale(self, factor: f64) -> Self {
        Self(self.0 * factor)
    }

    /// Divide by a real scalar (IEEE semantics for zero)
    pub fn div_real(self, divisor: f64) -> Self {
        Self(self.0.unscale(divisor))
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Whether either component is NaN
    pub fn is_nan(self) -> bool {
        self.0.is_nan()
    }

    pub fn into_inner(self) -> Complex64 {
        self.0
    }
}

impl Add for ComplexNumber {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for ComplexNumber {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for ComplexNumber {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul for ComplexNumber {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Mul<f64> for ComplexNumber {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

impl Div for ComplexNumber {
    type Output = Self;

    /// Zero-modulus divisors yield [`ComplexNumber::NAN`] instead of
    /// whatever mix of infinities the raw formula would produce.
    fn div(self, rhs: Self) -> Self {
        let norm = rhs.rho_squared();
        if norm == 0.0 {
            return Self::NAN;
        }
        (self * rhs.conj()).div_real(norm)
    }
}

impl Div<f64> for ComplexNumber {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self.div_real(rhs)
    }
}

impl From<f64> for ComplexNumber {
    fn from(re: f64) -> Self {
        Self::new(re, 0.0)
    }
}

impl From<Complex64> for ComplexNumber {
    fn from(value: Complex64) -> Self {
        Self(value)
    }
}
