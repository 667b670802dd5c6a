// src/complex.rs
//! Numeric tolerance and small helpers over `Complex64`.
//!
//! Comparisons go through [`near_zero`] / [`fuzzy_eq`] at [`TOLERANCE`].
//! Branch decisions that discard a value, such as a gimbal lock dropping
//! one coefficient, go through [`vanishes`] at the base [`EPSILON`], so
//! whatever a branch throws away stays below the comparison tolerance.

use num_complex::Complex64;
use std::f64::consts::{PI, TAU};

/// Base numerical precision.
pub const EPSILON: f64 = 1e-6;

/// Tolerance actually used for fuzzy comparisons (ten times [`EPSILON`]).
pub const TOLERANCE: f64 = 10.0 * EPSILON;

pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);
pub const ONE: Complex64 = Complex64::new(1.0, 0.0);
pub const I: Complex64 = Complex64::new(0.0, 1.0);

pub fn near_zero(x: f64) -> bool {
    x.abs() < TOLERANCE
}

pub fn fuzzy_eq(x: f64, y: f64) -> bool {
    near_zero(x - y)
}

pub fn fuzzy_eq_complex(x: Complex64, y: Complex64) -> bool {
    fuzzy_eq(x.re, y.re) && fuzzy_eq(x.im, y.im)
}

pub fn is_negligible(z: Complex64) -> bool {
    near_zero(z.norm())
}

/// Unit complex number `e^{iθ}`.
pub fn cis(theta: f64) -> Complex64 {
    Complex64::from_polar(1.0, theta)
}

/// Maps any angle into `(-π, π]`.
pub fn wrap_angle(theta: f64) -> f64 {
    let t = theta % TAU;
    if t > PI {
        t - TAU
    } else if t <= -PI {
        t + TAU
    } else {
        t
    }
}

/// A value small enough for a decomposition branch to drop it.
pub fn vanishes(x: f64) -> bool {
    x.abs() < EPSILON
}
