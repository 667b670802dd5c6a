// src/operator.rs
use crate::complex::{I, ONE, ZERO, cis, fuzzy_eq, fuzzy_eq_complex, is_negligible, near_zero};
use crate::error::{QsphereError, Result};
use crate::notation::{format_complex, parse_complex};
use crate::state::State;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::fmt;
use std::ops::Mul;
use std::str::FromStr;
use tracing::warn;

// custom type for gate matrices
pub type GateMatrix = [[Complex64; 2]; 2];

pub const IDENTITY: GateMatrix = [[ONE, ZERO], [ZERO, ONE]];

pub const HADAMARD: GateMatrix = [
    [
        Complex64::new(FRAC_1_SQRT_2, 0.0),
        Complex64::new(FRAC_1_SQRT_2, 0.0),
    ],
    [
        Complex64::new(FRAC_1_SQRT_2, 0.0),
        Complex64::new(-FRAC_1_SQRT_2, 0.0),
    ],
];

pub const PAULI_X: GateMatrix = [[ZERO, ONE], [ONE, ZERO]];

pub const PAULI_Y: GateMatrix = [
    [ZERO, Complex64::new(0.0, -1.0)],
    [Complex64::new(0.0, 1.0), ZERO],
];

pub const PAULI_Z: GateMatrix = [[ONE, ZERO], [ZERO, Complex64::new(-1.0, 0.0)]];

pub const S_GATE: GateMatrix = [[ONE, ZERO], [ZERO, I]];

pub const T_GATE: GateMatrix = [
    [ONE, ZERO],
    [ZERO, Complex64::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2)],
];

/// A 2×2 complex matrix `[[a, b], [c, d]]` that passed the unitarity check.
/// The only ways to obtain one are the checked constructors, the named
/// gates, and products / adjoints of existing operators.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct UnitaryMatrix {
    a: Complex64,
    b: Complex64,
    c: Complex64,
    d: Complex64,
}

impl Default for UnitaryMatrix {
    fn default() -> Self {
        UnitaryMatrix::identity()
    }
}

impl UnitaryMatrix {
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Result<Self> {
        if !is_unitary(a, b, c, d) {
            warn!(
                "rejected non-unitary matrix [[{}, {}], [{}, {}]]",
                format_complex(a),
                format_complex(b),
                format_complex(c),
                format_complex(d)
            );
            return Err(QsphereError::NotUnitary);
        }
        Ok(UnitaryMatrix { a, b, c, d })
    }

    /// Entries in the complex text grammar, row-major.
    pub fn parse(entries: [&str; 4]) -> Result<Self> {
        let [a, b, c, d] = entries;
        UnitaryMatrix::new(
            parse_complex(a)?,
            parse_complex(b)?,
            parse_complex(c)?,
            parse_complex(d)?,
        )
    }

    /// Replaces the entries in place; a non-unitary matrix is refused and the
    /// current value kept.
    pub fn set(&mut self, a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Result<()> {
        *self = UnitaryMatrix::new(a, b, c, d)?;
        Ok(())
    }

    // Named gates are unitary by construction.
    const fn known(rows: GateMatrix) -> Self {
        UnitaryMatrix {
            a: rows[0][0],
            b: rows[0][1],
            c: rows[1][0],
            d: rows[1][1],
        }
    }

    pub const fn identity() -> Self {
        UnitaryMatrix::known(IDENTITY)
    }

    pub const fn pauli_x() -> Self {
        UnitaryMatrix::known(PAULI_X)
    }

    pub const fn pauli_y() -> Self {
        UnitaryMatrix::known(PAULI_Y)
    }

    pub const fn pauli_z() -> Self {
        UnitaryMatrix::known(PAULI_Z)
    }

    pub const fn hadamard() -> Self {
        UnitaryMatrix::known(HADAMARD)
    }

    pub const fn s() -> Self {
        UnitaryMatrix::known(S_GATE)
    }

    pub const fn t() -> Self {
        UnitaryMatrix::known(T_GATE)
    }

    /// Phase shift `diag(1, e^{iγ})`.
    pub fn phi(gamma: f64) -> Self {
        UnitaryMatrix::known([[ONE, ZERO], [ZERO, cis(gamma)]])
    }

    /// Rx(θ) = cos(θ/2) I - i sin(θ/2) X
    pub fn rx(theta: f64) -> Self {
        let (st, ct) = (theta * 0.5).sin_cos();
        UnitaryMatrix::known([
            [Complex64::new(ct, 0.0), Complex64::new(0.0, -st)],
            [Complex64::new(0.0, -st), Complex64::new(ct, 0.0)],
        ])
    }

    /// Ry(θ) = cos(θ/2) I - i sin(θ/2) Y, a real matrix
    pub fn ry(theta: f64) -> Self {
        let (st, ct) = (theta * 0.5).sin_cos();
        UnitaryMatrix::known([
            [Complex64::new(ct, 0.0), Complex64::new(-st, 0.0)],
            [Complex64::new(st, 0.0), Complex64::new(ct, 0.0)],
        ])
    }

    /// Rz(θ) = diag(e^{-iθ/2}, e^{+iθ/2})
    pub fn rz(theta: f64) -> Self {
        let (st, ct) = (theta * 0.5).sin_cos();
        UnitaryMatrix::known([
            [Complex64::new(ct, -st), ZERO],
            [ZERO, Complex64::new(ct, st)],
        ])
    }

    /// Rotation by `angle` about a unit `axis`:
    /// `cos(θ/2) I - i sin(θ/2) (n·σ)`. A zero axis yields the identity.
    pub fn rotation(axis: [f64; 3], angle: f64) -> Self {
        let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if near_zero(norm) {
            return UnitaryMatrix::identity();
        }
        let [nx, ny, nz] = axis.map(|v| v / norm);
        let (st, ct) = (angle * 0.5).sin_cos();
        UnitaryMatrix::known([
            [Complex64::new(ct, -st * nz), Complex64::new(-st * ny, -st * nx)],
            [Complex64::new(st * ny, -st * nx), Complex64::new(ct, st * nz)],
        ])
    }

    /// Random operator: `a1, a2, b1` uniform inside the unit ball, `b2` fixed
    /// by normalization, then a random global phase.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let a1: f64 = rng.gen_range(-1.0..=1.0);
            let a2: f64 = rng.gen_range(-1.0..=1.0);
            let b1: f64 = rng.gen_range(-1.0..=1.0);
            let rest = 1.0 - (a1 * a1 + a2 * a2 + b1 * b1);
            if rest < 0.0 {
                continue;
            }
            let b2 = if rng.gen_bool(0.5) { rest.sqrt() } else { -rest.sqrt() };
            let a = Complex64::new(a1, a2);
            let b = Complex64::new(b1, b2);
            let phase = cis(rng.gen_range(-PI..PI));
            return UnitaryMatrix {
                a: phase * a,
                b: phase * b,
                c: -phase * b.conj(),
                d: phase * a.conj(),
            };
        }
    }

    pub fn random_batch(seed: u64, count: usize) -> Vec<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count).map(|_| UnitaryMatrix::random(&mut rng)).collect()
    }

    pub fn a(&self) -> Complex64 {
        self.a
    }

    pub fn b(&self) -> Complex64 {
        self.b
    }

    pub fn c(&self) -> Complex64 {
        self.c
    }

    pub fn d(&self) -> Complex64 {
        self.d
    }

    pub fn determinant(&self) -> Complex64 {
        self.a * self.d - self.b * self.c
    }

    pub fn conjugate_transpose(&self) -> Self {
        UnitaryMatrix {
            a: self.a.conj(),
            b: self.c.conj(),
            c: self.b.conj(),
            d: self.d.conj(),
        }
    }

    /// `e^{iφ}·U`.
    pub fn with_global_phase(&self, phi: f64) -> Self {
        self.scaled(cis(phi))
    }

    fn scaled(&self, k: Complex64) -> Self {
        UnitaryMatrix {
            a: k * self.a,
            b: k * self.b,
            c: k * self.c,
            d: k * self.d,
        }
    }

    /// Entry-wise equality within tolerance, phase included.
    pub fn fuzzy_eq(&self, other: &UnitaryMatrix) -> bool {
        fuzzy_eq_complex(self.a, other.a)
            && fuzzy_eq_complex(self.b, other.b)
            && fuzzy_eq_complex(self.c, other.c)
            && fuzzy_eq_complex(self.d, other.d)
    }

    /// Same operator up to a global phase.
    pub fn same_operator(&self, other: &UnitaryMatrix) -> bool {
        compare_operators(self, other)
    }

    pub fn apply(&self, state: &State) -> State {
        let [sa, sb] = state.amplitudes();
        State::from_amplitudes(self.a * sa + self.b * sb, self.c * sa + self.d * sb)
    }
}

impl Mul for UnitaryMatrix {
    type Output = UnitaryMatrix;

    fn mul(self, rhs: UnitaryMatrix) -> UnitaryMatrix {
        UnitaryMatrix {
            a: self.a * rhs.a + self.b * rhs.c,
            b: self.a * rhs.b + self.b * rhs.d,
            c: self.c * rhs.a + self.d * rhs.c,
            d: self.c * rhs.b + self.d * rhs.d,
        }
    }
}

impl fmt::Display for UnitaryMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[[{}, {}], [{}, {}]]",
            format_complex(self.a),
            format_complex(self.b),
            format_complex(self.c),
            format_complex(self.d)
        )
    }
}

/// `U·U† = I` entry-wise within tolerance.
pub fn is_unitary(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> bool {
    if [a, b, c, d].iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return false;
    }
    let top = a.norm_sqr() + b.norm_sqr();
    let bottom = c.norm_sqr() + d.norm_sqr();
    let cross = a * c.conj() + b * d.conj();
    fuzzy_eq(top, 1.0) && fuzzy_eq(bottom, 1.0) && near_zero(cross.re) && near_zero(cross.im)
}

/// True when `u1 == u2`, or `u1 == e^{iφ}·u2` with the phase read off the
/// ratio of `a + b`, or of `a - b` when that is the larger of the two.
/// `|a + b|² + |a - b|² = 2`, so the chosen denominator is at least 1.
pub fn compare_operators(u1: &UnitaryMatrix, u2: &UnitaryMatrix) -> bool {
    if u1.fuzzy_eq(u2) {
        return true;
    }
    let (num, den) = if (u2.a + u2.b).norm() < (u2.a - u2.b).norm() {
        (u1.a - u1.b, u2.a - u2.b)
    } else {
        (u1.a + u1.b, u2.a + u2.b)
    };
    if is_negligible(den) {
        return false;
    }
    let ratio = num / den;
    fuzzy_eq(ratio.norm(), 1.0) && u1.fuzzy_eq(&u2.scaled(ratio))
}

/// Named single-qubit gates.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "gate", content = "angle")]
pub enum Gate {
    I,
    X,
    Y,
    Z,
    H,
    S,
    T,
    Phi(f64), // phase shift with angle
    Rx(f64),
    Ry(f64),
    Rz(f64),
}

impl Gate {
    pub fn matrix(&self) -> UnitaryMatrix {
        match *self {
            Gate::I => UnitaryMatrix::identity(),
            Gate::X => UnitaryMatrix::pauli_x(),
            Gate::Y => UnitaryMatrix::pauli_y(),
            Gate::Z => UnitaryMatrix::pauli_z(),
            Gate::H => UnitaryMatrix::hadamard(),
            Gate::S => UnitaryMatrix::s(),
            Gate::T => UnitaryMatrix::t(),
            Gate::Phi(gamma) => UnitaryMatrix::phi(gamma),
            Gate::Rx(theta) => UnitaryMatrix::rx(theta),
            Gate::Ry(theta) => UnitaryMatrix::ry(theta),
            Gate::Rz(theta) => UnitaryMatrix::rz(theta),
        }
    }
}

impl FromStr for Gate {
    type Err = QsphereError;

    /// `h`, `x`, ... or `rx(0.5)` / `phi(1.2)` with the angle in radians.
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let unknown = || QsphereError::UnknownGate(s.to_string());

        if let Some((name, rest)) = lowered.split_once('(') {
            let arg = rest.strip_suffix(')').ok_or_else(unknown)?;
            let angle = crate::notation::parse_real(arg)?;
            return match name.trim() {
                "phi" | "p" => Ok(Gate::Phi(angle)),
                "rx" => Ok(Gate::Rx(angle)),
                "ry" => Ok(Gate::Ry(angle)),
                "rz" => Ok(Gate::Rz(angle)),
                _ => Err(unknown()),
            };
        }

        match lowered.as_str() {
            "i" | "id" => Ok(Gate::I),
            "x" => Ok(Gate::X),
            "y" => Ok(Gate::Y),
            "z" => Ok(Gate::Z),
            "h" => Ok(Gate::H),
            "s" => Ok(Gate::S),
            "t" => Ok(Gate::T),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Phi(a) => write!(f, "Phi({a})"),
            Gate::Rx(a) => write!(f, "Rx({a})"),
            Gate::Ry(a) => write!(f, "Ry({a})"),
            Gate::Rz(a) => write!(f, "Rz({a})"),
            other => write!(f, "{:?}", other),
        }
    }
}
