// src/spike.rs
use crate::state::State;
use serde::Serialize;

/// Distance from the tip back to the arrowhead base, in sphere radii.
pub const HEAD_LENGTH: f64 = 0.08;
/// Offset of each arrowhead corner from the shaft.
pub const HEAD_WIDTH: f64 = 0.04;

/// Arrow geometry for one frame: the tip of the state vector and four
/// corners of its arrowhead. Derived from the point only.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Spike {
    pub tip: [f64; 3],
    pub head: [[f64; 3]; 4],
}

impl Spike {
    pub fn from_state(state: &State) -> Self {
        Spike::from_point(state.point())
    }

    pub fn from_point(tip: [f64; 3]) -> Self {
        // any axis far enough from the shaft gives a stable perpendicular
        let helper = if tip[2].abs() < 0.9 {
            [0.0, 0.0, 1.0]
        } else {
            [1.0, 0.0, 0.0]
        };
        let u = normalized(cross(tip, helper));
        let v = normalized(cross(tip, u));
        let base = scale(tip, 1.0 - HEAD_LENGTH);

        Spike {
            tip,
            head: [
                add(base, scale(u, HEAD_WIDTH)),
                add(base, scale(v, HEAD_WIDTH)),
                add(base, scale(u, -HEAD_WIDTH)),
                add(base, scale(v, -HEAD_WIDTH)),
            ],
        }
    }
}

fn cross(p: [f64; 3], q: [f64; 3]) -> [f64; 3] {
    [
        p[1] * q[2] - p[2] * q[1],
        p[2] * q[0] - p[0] * q[2],
        p[0] * q[1] - p[1] * q[0],
    ]
}

fn normalized(p: [f64; 3]) -> [f64; 3] {
    let n = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
    if n == 0.0 { p } else { scale(p, 1.0 / n) }
}

fn scale(p: [f64; 3], k: f64) -> [f64; 3] {
    [p[0] * k, p[1] * k, p[2] * k]
}

fn add(p: [f64; 3], q: [f64; 3]) -> [f64; 3] {
    [p[0] + q[0], p[1] + q[1], p[2] + q[2]]
}
