// src/decompose.rs
//! Decomposition of a single-qubit unitary into rotations about fixed axes.
//!
//! For every kind the operator is written as
//!
//! ```text
//! U = e^{iα} · R₁(β) · R₂(γ) · R₃(δ)
//! ```
//!
//! with the axes `(R₁, R₂, R₃)` given by [`DecompositionKind::axes`]:
//! ZY = (Z, Y, Z), ZX = (Z, X, Z), XY = (X, Y, X), ZYX = (Z, Y, X).
//!
//! Solving always goes the same way:
//!
//! 1. The operator is projected onto the nearest exact unitary, so the two
//!    copies of each coefficient inside the matrix agree even when the input
//!    was only unitary within tolerance.
//! 2. `α` comes from whichever diagonal or anti-diagonal pair is larger:
//!    `(arg a + arg d)/2` when `|d| ≥ |c|`, otherwise `(arg b + arg c - π)/2`.
//! 3. The phase-stripped entries are recombined into two complex numbers
//!    `A = a1 + i·a2` and `B = b1 + i·b2`. Each kind renames and re-signs
//!    the entries so that `A = |A|·e^{i(β+δ)/2}` and `B = |B|·e^{i(β-δ)/2}`
//!    with `|A|` and `|B|` encoding `γ`.
//! 4. `β, γ, δ` come from the branch table over which of `a1, a2, b1, b2`
//!    vanish:
//!
//! | pattern              | branch                 | β              | γ     | δ   |
//! |----------------------|------------------------|----------------|-------|-----|
//! | all four             | degenerate             | 0              | 0     | 0   |
//! | `A`, and `b2`        | upper lock, real       | 0 or 2π        | upper | 0   |
//! | `A`, and `b1`        | upper lock, imaginary  | ±π             | upper | 0   |
//! | `A` only             | upper lock, free       | `2·arg B`      | upper | 0   |
//! | `B`, and `a2`        | lower lock, real       | 0 or 2π        | lower | 0   |
//! | `B`, and `a1`        | lower lock, imaginary  | ±π             | lower | 0   |
//! | `B` only             | lower lock, free       | `2·arg A`      | lower | 0   |
//! | anything else        | general                | `arg A + arg B`| exact | `arg A - arg B` |
//!
//! The lock values of γ are π and 0 for ZY, ZX and XY, and ±π/2 for ZYX.
//! In a lock only one of `β ± δ` is determined and `δ = 0` is the gauge.
//! The general branch always takes the exact `atan2`, whatever parts are
//! small.
//!
//! `β` and `δ` are wrapped to `(-π, π]`; every full turn taken off a
//! half-angle rotation flips its sign, which is folded back into `α`, so
//! [`compose`] reproduces the input exactly, not only up to phase.

use crate::complex::{cis, near_zero, vanishes, wrap_angle};
use crate::error::{QsphereError, Result};
use crate::notation::parse_real_vector;
use crate::operator::UnitaryMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use tracing::{debug, warn};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn rotation(self, angle: f64) -> UnitaryMatrix {
        match self {
            Axis::X => UnitaryMatrix::rx(angle),
            Axis::Y => UnitaryMatrix::ry(angle),
            Axis::Z => UnitaryMatrix::rz(angle),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecompositionKind {
    Zy,
    Zx,
    Xy,
    Zyx,
}

impl DecompositionKind {
    pub const ALL: [DecompositionKind; 4] = [
        DecompositionKind::Zy,
        DecompositionKind::Zx,
        DecompositionKind::Xy,
        DecompositionKind::Zyx,
    ];

    /// Axes of the β, γ and δ rotations, leftmost factor first.
    pub fn axes(self) -> [Axis; 3] {
        match self {
            DecompositionKind::Zy => [Axis::Z, Axis::Y, Axis::Z],
            DecompositionKind::Zx => [Axis::Z, Axis::X, Axis::Z],
            DecompositionKind::Xy => [Axis::X, Axis::Y, Axis::X],
            DecompositionKind::Zyx => [Axis::Z, Axis::Y, Axis::X],
        }
    }

    /// `(upper, lower)` ends of the range of γ, where the decomposition is
    /// in gimbal lock. The range is always π wide.
    fn lock_angles(self) -> (f64, f64) {
        match self {
            DecompositionKind::Zy | DecompositionKind::Zx | DecompositionKind::Xy => (PI, 0.0),
            DecompositionKind::Zyx => (FRAC_PI_2, -FRAC_PI_2),
        }
    }

    /// `[a1, a2, b1, b2]` from the phase-stripped entries.
    fn parts(self, [a, b, c, d]: [Complex64; 4]) -> [f64; 4] {
        match self {
            DecompositionKind::Zy => [d.re, d.im, c.re, c.im],
            // A = d, B = i·c
            DecompositionKind::Zx => [d.re, d.im, -c.im, c.re],
            DecompositionKind::Xy => [a.re, -b.im, -b.re, -a.im],
            DecompositionKind::Zyx => {
                // quaternion of the stripped operator: q0 - i(q1 X + q2 Y + q3 Z)
                let (q0, q1, q2, q3) = (a.re, -b.im, -b.re, -a.im);
                [q0 - q2, q3 + q1, q0 + q2, q3 - q1]
            }
        }
    }
}

impl fmt::Display for DecompositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecompositionKind::Zy => "ZY",
            DecompositionKind::Zx => "ZX",
            DecompositionKind::Xy => "XY",
            DecompositionKind::Zyx => "ZYX",
        };
        f.write_str(name)
    }
}

/// Angles in radians. `alpha` is the global phase. When γ sits at an end of
/// its range only one of `β ± δ` is determined; `delta` is then 0 by
/// convention, which is a choice and not a derived value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Decomposition {
    pub kind: DecompositionKind,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

impl Decomposition {
    pub fn new(kind: DecompositionKind, alpha: f64, beta: f64, gamma: f64, delta: f64) -> Self {
        Decomposition {
            kind,
            alpha,
            beta,
            gamma,
            delta,
        }
    }

    /// User-entered `alpha, beta, gamma, delta` in degrees.
    pub fn parse_degrees(kind: DecompositionKind, text: &str) -> Result<Self> {
        let v = parse_real_vector(text, 4)?;
        Ok(Decomposition::new(
            kind,
            v[0].to_radians(),
            v[1].to_radians(),
            v[2].to_radians(),
            v[3].to_radians(),
        ))
    }

    /// Elementary rotations in the order they act on a state (rightmost
    /// factor first). The global phase is not a rotation.
    pub fn rotations(&self) -> [(Axis, f64); 3] {
        let [first, second, third] = self.kind.axes();
        [
            (third, self.delta),
            (second, self.gamma),
            (first, self.beta),
        ]
    }
}

/// Single rotation `angle` about a unit `axis`, equal to the operator up to
/// global phase. The identity has the zero axis.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VectorAngle {
    pub axis: [f64; 3],
    pub angle: f64,
}

impl VectorAngle {
    /// User-entered `x, y, z, angle` with the angle in degrees.
    pub fn parse_degrees(text: &str) -> Result<Self> {
        let v = parse_real_vector(text, 4)?;
        Ok(VectorAngle {
            axis: [v[0], v[1], v[2]],
            angle: v[3].to_radians(),
        })
    }

    pub fn is_identity(&self) -> bool {
        self.axis.iter().all(|c| near_zero(*c)) || near_zero(self.angle)
    }
}

/// Where the one surviving phase of a gimbal lock lies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pin {
    Real,
    Imaginary,
    Free,
}

/// Which row of the branch table produced β, γ, δ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Branch {
    /// `A` and `B` both vanish; unreachable for unitary input.
    Degenerate,
    /// `A` vanishes: γ at the top of its range.
    UpperLock(Pin),
    /// `B` vanishes: γ at the bottom of its range.
    LowerLock(Pin),
    General,
}

pub fn decompose(u: &UnitaryMatrix, kind: DecompositionKind) -> Decomposition {
    solve(u, kind).1
}

/// The decomposition together with the branch-table row that produced it.
pub(crate) fn solve(u: &UnitaryMatrix, kind: DecompositionKind) -> (Branch, Decomposition) {
    let entries = nearest_unitary(u);
    let alpha = global_phase(entries);
    let strip = cis(-alpha);
    let stripped = entries.map(|z| strip * z);

    let (branch, beta, gamma, delta) = branch_table(kind, kind.parts(stripped));
    debug!(%kind, ?branch, "decomposed operator");

    let (beta, beta_flipped) = wrap_with_parity(beta);
    let (delta, delta_flipped) = wrap_with_parity(delta);
    let alpha = if beta_flipped != delta_flipped {
        alpha + PI
    } else {
        alpha
    };

    let decomposition = Decomposition {
        kind,
        alpha: wrap_angle(alpha),
        beta,
        gamma,
        delta,
    };
    (branch, decomposition)
}

/// Entries `[a, b, c, d]` of the closest matrix `e^{iθ}·[[p, q], [-q*, p*]]`.
/// Accepted operators may miss unitarity by up to the tolerance, which is
/// enough to make the two copies of `p` and `q` disagree in phase.
fn nearest_unitary(u: &UnitaryMatrix) -> [Complex64; 4] {
    let theta = u.determinant().arg() / 2.0;
    let unphase = cis(-theta);
    let (a, b, c, d) = (unphase * u.a(), unphase * u.b(), unphase * u.c(), unphase * u.d());
    let p = (a + d.conj()) / 2.0;
    let q = (b - c.conj()) / 2.0;
    let norm = (p.norm_sqr() + q.norm_sqr()).sqrt();
    if near_zero(norm) {
        return [u.a(), u.b(), u.c(), u.d()];
    }
    let (p, q) = (p / norm, q / norm);
    let phase = cis(theta);
    [phase * p, phase * q, -phase * q.conj(), phase * p.conj()]
}

/// `α` up to a multiple of π, which only flips the sign of the stripped
/// operator.
fn global_phase([a, b, c, d]: [Complex64; 4]) -> f64 {
    if d.norm() >= c.norm() {
        (a.arg() + d.arg()) / 2.0
    } else {
        (b.arg() + c.arg() - PI) / 2.0
    }
}

/// Phase of a real number: 0 or π.
fn real_phase(re: f64) -> f64 {
    if re > 0.0 { 0.0 } else { PI }
}

/// Phase of an imaginary number: ±π/2.
fn imaginary_phase(im: f64) -> f64 {
    if im > 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 }
}

/// Returns `(branch, β, γ, δ)` for the parts `[a1, a2, b1, b2]` of a kind.
pub(crate) fn branch_table(
    kind: DecompositionKind,
    [a1, a2, b1, b2]: [f64; 4],
) -> (Branch, f64, f64, f64) {
    let (upper, lower) = kind.lock_angles();
    match (vanishes(a1), vanishes(a2), vanishes(b1), vanishes(b2)) {
        (true, true, true, true) => {
            warn!(%kind, "decomposition met an all-zero pattern, falling back to identity");
            (Branch::Degenerate, 0.0, 0.0, 0.0)
        }
        (true, true, false, true) => {
            (Branch::UpperLock(Pin::Real), 2.0 * real_phase(b1), upper, 0.0)
        }
        (true, true, true, false) => {
            (Branch::UpperLock(Pin::Imaginary), 2.0 * imaginary_phase(b2), upper, 0.0)
        }
        (true, true, false, false) => {
            (Branch::UpperLock(Pin::Free), 2.0 * b2.atan2(b1), upper, 0.0)
        }
        (false, true, true, true) => {
            (Branch::LowerLock(Pin::Real), 2.0 * real_phase(a1), lower, 0.0)
        }
        (true, false, true, true) => {
            (Branch::LowerLock(Pin::Imaginary), 2.0 * imaginary_phase(a2), lower, 0.0)
        }
        (false, false, true, true) => {
            (Branch::LowerLock(Pin::Free), 2.0 * a2.atan2(a1), lower, 0.0)
        }
        _ => {
            let sum = a2.atan2(a1);
            let diff = b2.atan2(b1);
            let gamma = lower + 2.0 * b1.hypot(b2).atan2(a1.hypot(a2));
            (Branch::General, sum + diff, gamma, sum - diff)
        }
    }
}

/// Wraps into `(-π, π]` and reports whether an odd number of turns was
/// removed.
fn wrap_with_parity(theta: f64) -> (f64, bool) {
    let wrapped = wrap_angle(theta);
    let turns = ((theta - wrapped) / TAU).round() as i64;
    (wrapped, turns % 2 != 0)
}

/// `e^{iα} · R₁(β) · R₂(γ) · R₃(δ)`. Parameters that do not produce a
/// unitary matrix (non-finite input) are refused.
pub fn compose(d: &Decomposition) -> Result<UnitaryMatrix> {
    if ![d.alpha, d.beta, d.gamma, d.delta].iter().all(|v| v.is_finite()) {
        warn!(?d, "rejected non-finite decomposition parameters");
        return Err(QsphereError::NotUnitary);
    }
    let [first, second, third] = d.kind.axes();
    let m = (first.rotation(d.beta) * second.rotation(d.gamma) * third.rotation(d.delta))
        .with_global_phase(d.alpha);
    UnitaryMatrix::new(m.a(), m.b(), m.c(), m.d())
}

/// Axis-angle form, derived from the ZY decomposition.
pub fn vector_angle(u: &UnitaryMatrix) -> VectorAngle {
    let zy = decompose(u, DecompositionKind::Zy);
    let half_gamma = zy.gamma / 2.0;
    let sum = zy.beta / 2.0 + zy.delta / 2.0;
    let diff = zy.beta / 2.0 - zy.delta / 2.0;

    // sin(angle/2) · axis
    let scaled = [
        -half_gamma.sin() * diff.sin(),
        half_gamma.sin() * diff.cos(),
        half_gamma.cos() * sum.sin(),
    ];
    let sin_half = scaled.iter().map(|v| v * v).sum::<f64>().sqrt();
    let angle = 2.0 * sin_half.atan2(half_gamma.cos() * sum.cos());
    if vanishes(sin_half) {
        return VectorAngle {
            axis: [0.0, 0.0, 0.0],
            angle,
        };
    }

    VectorAngle {
        axis: scaled.map(|v| v / sin_half),
        angle,
    }
}

pub fn compose_vector_angle(va: &VectorAngle) -> Result<UnitaryMatrix> {
    if !va.axis.iter().chain(std::iter::once(&va.angle)).all(|v| v.is_finite()) {
        warn!(?va, "rejected non-finite axis-angle parameters");
        return Err(QsphereError::NotUnitary);
    }
    let m = UnitaryMatrix::rotation(va.axis, va.angle);
    UnitaryMatrix::new(m.a(), m.b(), m.c(), m.d())
}

/// Every representation of one operator, recomputed together so they never
/// disagree.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Decompositions {
    operator: UnitaryMatrix,
    zy: Decomposition,
    zx: Decomposition,
    xy: Decomposition,
    zyx: Decomposition,
    vector_angle: VectorAngle,
}

impl Default for Decompositions {
    fn default() -> Self {
        Decompositions::from_operator(UnitaryMatrix::identity())
    }
}

impl Decompositions {
    pub fn from_operator(operator: UnitaryMatrix) -> Self {
        Decompositions {
            operator,
            zy: decompose(&operator, DecompositionKind::Zy),
            zx: decompose(&operator, DecompositionKind::Zx),
            xy: decompose(&operator, DecompositionKind::Xy),
            zyx: decompose(&operator, DecompositionKind::Zyx),
            vector_angle: vector_angle(&operator),
        }
    }

    pub fn operator(&self) -> &UnitaryMatrix {
        &self.operator
    }

    pub fn get(&self, kind: DecompositionKind) -> &Decomposition {
        match kind {
            DecompositionKind::Zy => &self.zy,
            DecompositionKind::Zx => &self.zx,
            DecompositionKind::Xy => &self.xy,
            DecompositionKind::Zyx => &self.zyx,
        }
    }

    pub fn vector_angle(&self) -> &VectorAngle {
        &self.vector_angle
    }

    pub fn set_operator(&mut self, operator: UnitaryMatrix) {
        *self = Decompositions::from_operator(operator);
    }

    /// Accepts an edited parameter tuple of any kind; on failure nothing
    /// changes.
    pub fn set_from(&mut self, d: &Decomposition) -> Result<()> {
        let operator = compose(d)?;
        self.set_operator(operator);
        Ok(())
    }

    pub fn set_from_vector_angle(&mut self, va: &VectorAngle) -> Result<()> {
        let operator = compose_vector_angle(va)?;
        self.set_operator(operator);
        Ok(())
    }
}
