// src/state.rs
use crate::complex::{TOLERANCE, cis, fuzzy_eq, is_negligible, near_zero, wrap_angle};
use crate::error::{QsphereError, Result};
use crate::notation::{format_complex, format_real_vector, parse_complex, parse_real_vector};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use tracing::warn;

/// A pure single-qubit state. The spinor `(a, b)`, the polar angles and the
/// Cartesian point are stored side by side and always rebuilt together, so
/// no representation can go stale.
///
/// Canonical form: `a = cos(θ/2)` is real and non-negative,
/// `b = e^{iφ}·sin(θ/2)`, `θ ∈ [0, π]`, `φ ∈ (-π, π]`. At either pole the
/// azimuth is undefined and pinned to `φ = 0`.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct State {
    a: Complex64,
    b: Complex64,
    theta: f64,
    phi: f64,
    x: f64,
    y: f64,
    z: f64,
}

/// What to do with coefficients or a point that is off the unit sphere.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UnitPolicy {
    #[default]
    Reject,
    Normalize,
}

/// Any of the three interchangeable ways to name a state.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StateInput {
    Coefficients { a: Complex64, b: Complex64 },
    Polar { theta: f64, phi: f64 },
    Cartesian { x: f64, y: f64, z: f64 },
}

impl StateInput {
    /// Both amplitudes in the complex text grammar, e.g. `("0.6", "0.8i")`.
    pub fn parse_coefficients(a: &str, b: &str) -> Result<Self> {
        Ok(StateInput::Coefficients {
            a: parse_complex(a)?,
            b: parse_complex(b)?,
        })
    }

    /// Degrees, as `theta, phi`.
    pub fn parse_polar_degrees(text: &str) -> Result<Self> {
        let v = parse_real_vector(text, 2)?;
        Ok(StateInput::Polar {
            theta: v[0].to_radians(),
            phi: v[1].to_radians(),
        })
    }

    pub fn parse_cartesian(text: &str) -> Result<Self> {
        let v = parse_real_vector(text, 3)?;
        Ok(StateInput::Cartesian {
            x: v[0],
            y: v[1],
            z: v[2],
        })
    }

    fn name(&self) -> &'static str {
        match self {
            StateInput::Coefficients { .. } => "coefficient",
            StateInput::Polar { .. } => "polar",
            StateInput::Cartesian { .. } => "cartesian",
        }
    }

    fn is_finite(&self) -> bool {
        match *self {
            StateInput::Coefficients { a, b } => {
                [a.re, a.im, b.re, b.im].iter().all(|v| v.is_finite())
            }
            StateInput::Polar { theta, phi } => theta.is_finite() && phi.is_finite(),
            StateInput::Cartesian { x, y, z } => [x, y, z].iter().all(|v| v.is_finite()),
        }
    }
}

impl Default for State {
    /// |0⟩, the north pole.
    fn default() -> Self {
        State::from_polar(0.0, 0.0)
    }
}

impl State {
    /// NaN or infinite components are refused under either policy.
    pub fn from_input(input: StateInput, policy: UnitPolicy) -> Result<Self> {
        if !input.is_finite() {
            warn!(?input, "rejected non-finite state input");
            return Err(QsphereError::NonFinite(input.name()));
        }
        match input {
            StateInput::Coefficients { a, b } => State::coefficients_with(a, b, policy),
            StateInput::Polar { theta, phi } => Ok(State::from_polar(theta, phi)),
            StateInput::Cartesian { x, y, z } => State::cartesian_with(x, y, z, policy),
        }
    }

    /// Any finite angles are accepted; they are folded back onto the
    /// canonical ranges. Use [`State::from_input`] for unchecked values.
    pub fn from_polar(theta: f64, phi: f64) -> Self {
        let mut t = wrap_angle(theta);
        let mut p = phi;
        if t < 0.0 {
            t = -t;
            p += PI;
        }
        let p = if near_zero(t.sin()) { 0.0 } else { wrap_angle(p) };
        State::from_canonical_polar(t, p)
    }

    /// Rejects coefficients whose squared norms do not sum to one.
    pub fn from_coefficients(a: Complex64, b: Complex64) -> Result<Self> {
        State::from_input(StateInput::Coefficients { a, b }, UnitPolicy::Reject)
    }

    /// Rejects points off the unit sphere; see
    /// [`State::from_cartesian_normalized`] for the lenient variant.
    pub fn from_cartesian(x: f64, y: f64, z: f64) -> Result<Self> {
        State::from_input(StateInput::Cartesian { x, y, z }, UnitPolicy::Reject)
    }

    pub fn from_cartesian_normalized(x: f64, y: f64, z: f64) -> Result<Self> {
        State::from_input(StateInput::Cartesian { x, y, z }, UnitPolicy::Normalize)
    }

    /// Replaces the state from any representation. On error `self` is left
    /// exactly as it was.
    pub fn change_state(&mut self, input: StateInput, policy: UnitPolicy) -> Result<()> {
        *self = State::from_input(input, policy)?;
        Ok(())
    }

    /// Builds a state from amplitudes that are known to be a unit vector up
    /// to rounding, e.g. the image of a state under a unitary.
    pub(crate) fn from_amplitudes(a: Complex64, b: Complex64) -> Self {
        let norm = (a.norm_sqr() + b.norm_sqr()).sqrt();
        if norm == 0.0 {
            return State::default();
        }
        State::from_unit_coefficients(a / norm, b / norm)
    }

    fn coefficients_with(a: Complex64, b: Complex64, policy: UnitPolicy) -> Result<Self> {
        let norm = (a.norm_sqr() + b.norm_sqr()).sqrt();
        if near_zero(norm) {
            return Err(QsphereError::ZeroVector);
        }
        if !fuzzy_eq(norm, 1.0) && policy == UnitPolicy::Reject {
            return Err(QsphereError::NotNormalized { norm });
        }
        Ok(State::from_unit_coefficients(a / norm, b / norm))
    }

    fn from_unit_coefficients(a: Complex64, b: Complex64) -> Self {
        let theta = 2.0 * b.norm().atan2(a.norm());
        // the phase of `a` is global, only the relative phase survives
        let phi = if is_negligible(a) || is_negligible(b) {
            0.0
        } else {
            wrap_angle(b.arg() - a.arg())
        };
        State::from_polar(theta, phi)
    }

    fn cartesian_with(x: f64, y: f64, z: f64, policy: UnitPolicy) -> Result<Self> {
        let r = (x * x + y * y + z * z).sqrt();
        if near_zero(r) {
            return Err(QsphereError::ZeroVector);
        }
        if !fuzzy_eq(r, 1.0) && policy == UnitPolicy::Reject {
            return Err(QsphereError::NotUnitVector { norm: r });
        }
        let (x, y, z) = (x / r, y / r, z / r);
        let theta = (x * x + y * y).sqrt().atan2(z);
        let phi = if near_zero(theta.sin()) { 0.0 } else { y.atan2(x) };
        Ok(State::from_canonical_polar(theta, phi))
    }

    fn from_canonical_polar(theta: f64, phi: f64) -> Self {
        let half = theta / 2.0;
        let (sin_t, cos_t) = theta.sin_cos();
        State {
            a: Complex64::new(half.cos(), 0.0),
            b: cis(phi) * half.sin(),
            theta,
            phi,
            x: sin_t * phi.cos(),
            y: sin_t * phi.sin(),
            z: cos_t,
        }
    }

    pub fn a(&self) -> Complex64 {
        self.a
    }

    pub fn b(&self) -> Complex64 {
        self.b
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn point(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn amplitudes(&self) -> [Complex64; 2] {
        [self.a, self.b]
    }

    /// Same point on the sphere within [`TOLERANCE`].
    pub fn same_point(&self, other: &State) -> bool {
        let [x, y, z] = other.point();
        (self.x - x).abs() < TOLERANCE
            && (self.y - y).abs() < TOLERANCE
            && (self.z - z).abs() < TOLERANCE
    }

    /// `a` and `b` in the complex text grammar, ready for the entry fields.
    pub fn coefficient_text(&self) -> (String, String) {
        (format_complex(self.a), format_complex(self.b))
    }

    pub fn polar_degrees_text(&self) -> String {
        format_real_vector(&snapped(&[self.theta.to_degrees(), self.phi.to_degrees()]))
    }

    pub fn cartesian_text(&self) -> String {
        format_real_vector(&snapped(&self.point()))
    }
}

fn snapped(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|v| if near_zero(*v) { 0.0 } else { *v })
        .collect()
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|0> + ({})|1>",
            format_complex(self.a),
            format_complex(self.b)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4};

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn assert_consistent(s: &State) {
        let from_polar = State::from_polar(s.theta(), s.phi());
        let from_point = State::from_cartesian(s.x(), s.y(), s.z()).unwrap();
        let from_spinor = State::from_coefficients(s.a(), s.b()).unwrap();
        for other in [from_polar, from_point, from_spinor] {
            assert!(approx_eq(other.theta(), s.theta()), "{other:?} vs {s:?}");
            assert!(approx_eq(other.phi(), s.phi()), "{other:?} vs {s:?}");
            assert!((other.a() - s.a()).norm() < EPSILON);
            assert!((other.b() - s.b()).norm() < EPSILON);
            assert!(other.same_point(s));
        }
    }

    #[test]
    fn equal_superposition_is_plus_x() {
        let s = State::from_coefficients(
            Complex64::new(FRAC_1_SQRT_2, 0.0),
            Complex64::new(FRAC_1_SQRT_2, 0.0),
        )
        .unwrap();
        assert!(approx_eq(s.theta().to_degrees(), 90.0));
        assert!(approx_eq(s.phi().to_degrees(), 0.0));
        assert!(approx_eq(s.x(), 1.0));
        assert!(approx_eq(s.y(), 0.0));
        assert!(approx_eq(s.z(), 0.0));
        assert_consistent(&s);
    }

    #[test]
    fn three_constructors_agree() {
        let by_angles = State::from_polar(1.1, -2.3);
        let by_point = State::from_cartesian(by_angles.x(), by_angles.y(), by_angles.z()).unwrap();
        let by_spinor = State::from_coefficients(by_angles.a(), by_angles.b()).unwrap();
        assert_consistent(&by_angles);
        assert!(by_point.same_point(&by_angles));
        assert!(by_spinor.same_point(&by_angles));
        assert!(approx_eq(by_spinor.phi(), -2.3));
    }

    #[test]
    fn global_phase_of_a_is_dropped() {
        let phase = cis(0.7);
        let s = State::from_coefficients(phase * 0.6, phase * Complex64::new(0.0, 0.8)).unwrap();
        assert!(approx_eq(s.a().im, 0.0));
        assert!(approx_eq(s.a().re, 0.6));
        assert!(approx_eq(s.phi(), FRAC_PI_2));
    }

    #[test]
    fn poles_pin_phi_to_zero() {
        let north = State::from_polar(0.0, 1.3);
        assert_eq!(north.phi(), 0.0);
        assert!(approx_eq(north.z(), 1.0));

        let south = State::from_coefficients(Complex64::new(0.0, 0.0), Complex64::new(0.0, 1.0))
            .unwrap();
        assert!(approx_eq(south.theta(), PI));
        assert_eq!(south.phi(), 0.0);
        assert!(approx_eq(south.z(), -1.0));
        assert_consistent(&south);

        let from_point = State::from_cartesian(0.0, 0.0, -1.0).unwrap();
        assert_eq!(from_point.phi(), 0.0);
    }

    #[test]
    fn out_of_range_angles_are_folded() {
        let s = State::from_polar(-FRAC_PI_4, 0.0);
        assert!(approx_eq(s.theta(), FRAC_PI_4));
        assert!(approx_eq(s.phi(), PI));
        let t = State::from_polar(FRAC_PI_2, 2.0 * PI + 0.5);
        assert!(approx_eq(t.phi(), 0.5));
    }

    #[test]
    fn off_sphere_points_follow_the_policy() {
        assert!(matches!(
            State::from_cartesian(0.0, 2.0, 0.0),
            Err(QsphereError::NotUnitVector { .. })
        ));
        let s = State::from_cartesian_normalized(0.0, 2.0, 0.0).unwrap();
        assert!(approx_eq(s.y(), 1.0));
        assert!(approx_eq(s.phi(), FRAC_PI_2));
        assert!(matches!(
            State::from_cartesian_normalized(0.0, 0.0, 0.0),
            Err(QsphereError::ZeroVector)
        ));
        assert!(matches!(
            State::from_coefficients(Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)),
            Err(QsphereError::NotNormalized { .. })
        ));
    }

    #[test]
    fn failed_change_leaves_state_untouched() {
        let mut s = State::from_polar(0.4, 0.9);
        let before = s;
        let res = s.change_state(
            StateInput::Cartesian { x: 3.0, y: 0.0, z: 0.0 },
            UnitPolicy::Reject,
        );
        assert!(res.is_err());
        assert_eq!(s, before);

        s.change_state(StateInput::Polar { theta: PI, phi: 0.0 }, UnitPolicy::Reject)
            .unwrap();
        assert!(approx_eq(s.z(), -1.0));
    }

    #[test]
    fn non_finite_input_is_refused_under_both_policies() {
        let mut s = State::from_polar(0.4, 0.9);
        let before = s;
        let inputs = [
            StateInput::Polar {
                theta: f64::NAN,
                phi: 0.0,
            },
            StateInput::Cartesian {
                x: f64::INFINITY,
                y: 0.0,
                z: 0.0,
            },
            StateInput::Coefficients {
                a: Complex64::new(1.0, 0.0),
                b: Complex64::new(0.0, f64::NEG_INFINITY),
            },
        ];
        for input in inputs {
            for policy in [UnitPolicy::Reject, UnitPolicy::Normalize] {
                let res = s.change_state(input, policy);
                assert!(matches!(res, Err(QsphereError::NonFinite(_))), "{input:?}");
                assert_eq!(s, before);
            }
        }
        assert!(State::from_cartesian_normalized(f64::NAN, 1.0, 0.0).is_err());
    }

    #[test]
    fn text_inputs_parse() {
        let input = StateInput::parse_coefficients("0.6", "0.8i").unwrap();
        let s = State::from_input(input, UnitPolicy::Reject).unwrap();
        assert!(approx_eq(s.phi(), FRAC_PI_2));

        let input = StateInput::parse_polar_degrees("90, 180").unwrap();
        let s = State::from_input(input, UnitPolicy::Reject).unwrap();
        assert!(approx_eq(s.x(), -1.0));

        assert!(StateInput::parse_cartesian("(1, 0)").is_err());
    }

    #[test]
    fn text_outputs_reparse() {
        let s = State::from_polar(FRAC_PI_2, FRAC_PI_2);
        let (a, b) = s.coefficient_text();
        assert_eq!((a.as_str(), b.as_str()), ("0.707107", "0.707107i"));
        assert_eq!(s.cartesian_text(), "(0, 1, 0)");
        assert_eq!(s.polar_degrees_text(), "(90, 90)");
        assert_eq!(s.to_string(), "0.707107|0> + (0.707107i)|1>");

        let back = StateInput::parse_cartesian(&s.cartesian_text()).unwrap();
        let t = State::from_input(back, UnitPolicy::Reject).unwrap();
        assert!(t.same_point(&s));
    }
}
