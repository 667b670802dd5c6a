// src/sequencer.rs
//! Turns an operator into the frames that carry a state along the sphere.
//!
//! The operator is broken into elementary rotations (one of the Euler forms
//! or the single axis-angle rotation). Each rotation is split into
//! `steps_per_rotation` sub-steps; sub-step `k` of a rotation by `angle` is
//! `R(angle·k/N)` applied to the state the rotation started from, so a
//! rotation always lands exactly on its end point, however many steps.
//!
//! Frames are produced in chronological order and then reversed, so a
//! consumer pops the next frame off the end of the vector.

use crate::complex::near_zero;
use crate::decompose::{Axis, DecompositionKind, decompose, vector_angle};
use crate::error::QsphereError;
use crate::operator::UnitaryMatrix;
use crate::spike::Spike;
use crate::state::State;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How an operator is broken into animated rotations.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "form", content = "kind", rename_all = "camelCase")]
pub enum RotationForm {
    Euler(DecompositionKind),
    AxisAngle,
}

impl Default for RotationForm {
    fn default() -> Self {
        RotationForm::Euler(DecompositionKind::Zy)
    }
}

impl FromStr for RotationForm {
    type Err = QsphereError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zy" => Ok(RotationForm::Euler(DecompositionKind::Zy)),
            "zx" => Ok(RotationForm::Euler(DecompositionKind::Zx)),
            "xy" => Ok(RotationForm::Euler(DecompositionKind::Xy)),
            "zyx" => Ok(RotationForm::Euler(DecompositionKind::Zyx)),
            "axis" | "axis-angle" | "vector" => Ok(RotationForm::AxisAngle),
            other => Err(QsphereError::InvalidConfig(format!(
                "unknown rotation form {other:?}"
            ))),
        }
    }
}

impl fmt::Display for RotationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationForm::Euler(kind) => write!(f, "{kind}"),
            RotationForm::AxisAngle => f.write_str("axis-angle"),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum RotationAxis {
    Fixed(Axis),
    Free([f64; 3]),
}

impl RotationAxis {
    pub fn rotation(&self, angle: f64) -> UnitaryMatrix {
        match self {
            RotationAxis::Fixed(axis) => axis.rotation(angle),
            RotationAxis::Free(axis) => UnitaryMatrix::rotation(*axis, angle),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub axis: RotationAxis,
    pub angle: f64,
}

/// One rendered step: where the state is and the arrow to draw for it.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub state: State,
    pub spike: Spike,
}

impl Frame {
    pub fn new(state: State) -> Self {
        Frame {
            state,
            spike: Spike::from_state(&state),
        }
    }
}

/// Elementary rotations in application order. Zero angles are left out and
/// the global phase never shows up.
pub fn rotation_sequence(operator: &UnitaryMatrix, form: RotationForm) -> Vec<Rotation> {
    match form {
        RotationForm::Euler(kind) => decompose(operator, kind)
            .rotations()
            .into_iter()
            .filter(|(_, angle)| !near_zero(*angle))
            .map(|(axis, angle)| Rotation {
                axis: RotationAxis::Fixed(axis),
                angle,
            })
            .collect(),
        RotationForm::AxisAngle => {
            let va = vector_angle(operator);
            if va.is_identity() {
                Vec::new()
            } else {
                vec![Rotation {
                    axis: RotationAxis::Free(va.axis),
                    angle: va.angle,
                }]
            }
        }
    }
}

/// Frames for `rotations` starting at `start`, reversed for popping.
/// `steps` below 1 is treated as 1.
pub fn build_path(start: &State, rotations: &[Rotation], steps: usize) -> Vec<Frame> {
    let steps = steps.max(1);
    let mut path = Vec::with_capacity(rotations.len() * steps);
    let mut from = *start;

    for rotation in rotations {
        for k in 1..=steps {
            let fraction = k as f64 / steps as f64;
            let state = rotation.axis.rotation(rotation.angle * fraction).apply(&from);
            path.push(Frame::new(state));
        }
        if let Some(last) = path.last() {
            from = last.state;
        }
    }

    path.reverse();
    path
}

/// Full animation of `operator` acting on `start`.
pub fn animation_path(
    start: &State,
    operator: &UnitaryMatrix,
    form: RotationForm,
    steps: usize,
) -> Vec<Frame> {
    let rotations = rotation_sequence(operator, form);
    debug!(%form, rotations = rotations.len(), steps, "building animation path");
    build_path(start, &rotations, steps)
}
