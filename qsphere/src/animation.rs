// src/animation.rs
//! Animated state vectors and the scene that ticks them.

use crate::config::VisualizerConfig;
use crate::error::{QsphereError, Result};
use crate::events::{AnimationStartInfo, Event, FinishInfo, FrameInfo};
use crate::operator::UnitaryMatrix;
use crate::sequencer::{Frame, RotationForm, animation_path};
use crate::spike::Spike;
use crate::state::{State, StateInput, UnitPolicy};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Idle,
    Animating,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const PALETTE: [Color; 6] = [
    Color { r: 230, g: 60, b: 60 },
    Color { r: 60, g: 120, b: 230 },
    Color { r: 40, g: 170, b: 80 },
    Color { r: 230, g: 150, b: 30 },
    Color { r: 150, g: 70, b: 200 },
    Color { r: 30, g: 170, b: 180 },
];

impl Color {
    pub fn for_id(id: usize) -> Color {
        PALETTE[id % PALETTE.len()]
    }
}

/// A state on the sphere plus whatever is left of its current animation.
#[derive(Debug, Clone)]
pub struct AnimatedVector {
    id: usize,
    state: State,
    color: Color,
    // reversed: the next frame is at the end
    path: Vec<Frame>,
    trace: VecDeque<[f64; 3]>,
    trace_length: usize,
}

impl AnimatedVector {
    pub fn new(id: usize, state: State, trace_length: usize) -> Self {
        Self {
            id,
            state,
            color: Color::for_id(id),
            path: Vec::new(),
            trace: VecDeque::new(),
            trace_length,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn spike(&self) -> Spike {
        Spike::from_state(&self.state)
    }

    pub fn status(&self) -> Status {
        if self.path.is_empty() {
            Status::Idle
        } else {
            Status::Animating
        }
    }

    pub fn remaining_steps(&self) -> usize {
        self.path.len()
    }

    /// Where the vector ends up once the queued frames have played.
    pub fn final_state(&self) -> State {
        self.path.first().map(|f| f.state).unwrap_or(self.state)
    }

    /// Replaces the state outright. Any running animation is dropped; on
    /// error nothing changes.
    pub fn set_state(&mut self, input: StateInput, policy: UnitPolicy) -> Result<()> {
        self.state.change_state(input, policy)?;
        self.path.clear();
        Ok(())
    }

    /// Queues the frames of `operator`. While animating, the new frames
    /// follow the ones already queued and start from where those end.
    /// Returns the number of frames added.
    pub fn apply_operator(
        &mut self,
        operator: &UnitaryMatrix,
        form: RotationForm,
        steps_per_rotation: usize,
    ) -> usize {
        let mut frames = animation_path(&self.final_state(), operator, form, steps_per_rotation);
        let added = frames.len();
        frames.append(&mut self.path);
        self.path = frames;
        debug!(vector = self.id, added, queued = self.path.len(), "operator applied");
        added
    }

    /// Advances one frame. `None` once the animation has finished.
    pub fn take_step(&mut self) -> Option<Frame> {
        let frame = self.path.pop()?;
        self.state = frame.state;
        if self.trace_length > 0 {
            if self.trace.len() == self.trace_length {
                self.trace.pop_front();
            }
            self.trace.push_back(frame.state.point());
        }
        Some(frame)
    }

    /// Halts where the vector currently is.
    pub fn stop(&mut self) {
        self.path.clear();
    }

    /// Jumps straight to the end of the queued animation.
    pub fn finish(&mut self) {
        while self.take_step().is_some() {}
    }

    pub fn trace(&self) -> impl Iterator<Item = &[f64; 3]> {
        self.trace.iter()
    }

    pub fn trace_len(&self) -> usize {
        self.trace.len()
    }

    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }
}

/// The set of vectors on the sphere. Ids are never reused.
#[derive(Debug, Clone)]
pub struct Scene {
    config: VisualizerConfig,
    vectors: Vec<AnimatedVector>,
    next_id: usize,
}

impl Scene {
    pub fn new(config: VisualizerConfig) -> Self {
        Self {
            config,
            vectors: Vec::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    pub fn add_vector(&mut self, state: State) -> Result<usize> {
        if self.vectors.len() >= self.config.max_vectors {
            return Err(QsphereError::TooManyVectors {
                max: self.config.max_vectors,
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.vectors
            .push(AnimatedVector::new(id, state, self.config.trace_length));
        info!(vector = id, "vector added");
        Ok(id)
    }

    pub fn remove_vector(&mut self, id: usize) -> Result<AnimatedVector> {
        let index = self
            .vectors
            .iter()
            .position(|v| v.id == id)
            .ok_or(QsphereError::UnknownVector(id))?;
        info!(vector = id, "vector removed");
        Ok(self.vectors.remove(index))
    }

    pub fn vector(&self, id: usize) -> Option<&AnimatedVector> {
        self.vectors.iter().find(|v| v.id == id)
    }

    pub fn vector_mut(&mut self, id: usize) -> Option<&mut AnimatedVector> {
        self.vectors.iter_mut().find(|v| v.id == id)
    }

    /// Vectors in insertion order.
    pub fn vectors(&self) -> &[AnimatedVector] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn apply_operator(
        &mut self,
        id: usize,
        operator: &UnitaryMatrix,
        form: RotationForm,
    ) -> Result<Event> {
        let steps = self.config.animation.steps_per_rotation;
        let vector = self.vector_mut(id).ok_or(QsphereError::UnknownVector(id))?;
        let frames = vector.apply_operator(operator, form, steps);
        Ok(Event::AnimationStarted(AnimationStartInfo {
            vector: id,
            form: form.to_string(),
            frames,
        }))
    }

    pub fn apply_to_all(&mut self, operator: &UnitaryMatrix, form: RotationForm) -> Vec<Event> {
        let steps = self.config.animation.steps_per_rotation;
        self.vectors
            .iter_mut()
            .map(|v| {
                let frames = v.apply_operator(operator, form, steps);
                Event::AnimationStarted(AnimationStartInfo {
                    vector: v.id,
                    form: form.to_string(),
                    frames,
                })
            })
            .collect()
    }

    /// Advances every animating vector by one frame. A vector that plays
    /// its last frame also reports `AnimationFinished`.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        for v in self.vectors.iter_mut() {
            if let Some(frame) = v.take_step() {
                events.push(Event::Frame(FrameInfo {
                    vector: v.id,
                    remaining: v.remaining_steps(),
                    state: frame.state,
                    spike: frame.spike,
                }));
                if v.status() == Status::Idle {
                    events.push(Event::AnimationFinished(FinishInfo {
                        vector: v.id,
                        final_state: v.state,
                    }));
                }
            }
        }
        events
    }

    /// Ticks until every vector is idle.
    pub fn run_to_idle(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while !self.is_idle() {
            events.extend(self.tick());
        }
        events
    }

    pub fn is_idle(&self) -> bool {
        self.vectors.iter().all(|v| v.status() == Status::Idle)
    }

    pub fn stop_all(&mut self) {
        for v in self.vectors.iter_mut() {
            v.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnimationConfig;
    use approx::assert_abs_diff_eq;

    fn scene(steps: usize, max_vectors: usize, trace_length: usize) -> Scene {
        Scene::new(VisualizerConfig {
            animation: AnimationConfig {
                steps_per_rotation: steps,
                tick_interval_ms: 0,
            },
            max_vectors,
            trace_length,
            ..VisualizerConfig::default()
        })
    }

    #[test]
    fn idle_animating_idle() {
        let mut v = AnimatedVector::new(0, State::default(), 100);
        assert_eq!(v.status(), Status::Idle);
        let added = v.apply_operator(&UnitaryMatrix::pauli_x(), RotationForm::default(), 8);
        assert!(added > 0);
        assert_eq!(v.status(), Status::Animating);

        let mut steps = 0;
        while v.take_step().is_some() {
            steps += 1;
        }
        assert_eq!(steps, added);
        assert_eq!(v.status(), Status::Idle);
        assert_abs_diff_eq!(v.state().z(), -1.0, epsilon = 1e-9);
        assert!(v.take_step().is_none());
    }

    #[test]
    fn operators_applied_mid_animation_chain() {
        let mut v = AnimatedVector::new(0, State::default(), 0);
        v.apply_operator(&UnitaryMatrix::hadamard(), RotationForm::default(), 5);
        v.take_step();
        v.apply_operator(&UnitaryMatrix::hadamard(), RotationForm::default(), 5);
        v.finish();
        // H·H = I
        assert_abs_diff_eq!(v.state().z(), 1.0, epsilon = 1e-9);
        assert_eq!(v.trace_len(), 0);
    }

    #[test]
    fn stop_keeps_the_current_frame() {
        let mut v = AnimatedVector::new(0, State::default(), 10);
        v.apply_operator(&UnitaryMatrix::ry(1.0), RotationForm::default(), 10);
        let third = {
            v.take_step();
            v.take_step();
            v.take_step().unwrap()
        };
        v.stop();
        assert_eq!(v.status(), Status::Idle);
        assert_eq!(*v.state(), third.state);
        assert_eq!(v.trace_len(), 3);
    }

    #[test]
    fn trace_is_bounded() {
        let mut v = AnimatedVector::new(0, State::default(), 4);
        v.apply_operator(&UnitaryMatrix::rx(2.0), RotationForm::AxisAngle, 10);
        v.finish();
        assert_eq!(v.trace_len(), 4);
        let last = v.trace().last().copied().unwrap();
        assert_eq!(last, v.state().point());
        v.clear_trace();
        assert_eq!(v.trace_len(), 0);
    }

    #[test]
    fn set_state_rejects_without_change() {
        let mut v = AnimatedVector::new(0, State::default(), 4);
        let bad = StateInput::Cartesian {
            x: 2.0,
            y: 0.0,
            z: 0.0,
        };
        assert!(v.set_state(bad, UnitPolicy::Reject).is_err());
        assert_eq!(*v.state(), State::default());
        v.set_state(bad, UnitPolicy::Normalize).unwrap();
        assert_abs_diff_eq!(v.state().x(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn scene_limits_and_ids() {
        let mut s = scene(4, 2, 10);
        let a = s.add_vector(State::default()).unwrap();
        let b = s.add_vector(State::default()).unwrap();
        assert!(matches!(
            s.add_vector(State::default()),
            Err(QsphereError::TooManyVectors { max: 2 })
        ));
        s.remove_vector(a).unwrap();
        let c = s.add_vector(State::default()).unwrap();
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert!(matches!(
            s.remove_vector(a),
            Err(QsphereError::UnknownVector(_))
        ));
        assert_ne!(s.vector(b).unwrap().color(), s.vector(c).unwrap().color());
    }

    #[test]
    fn tick_reports_frames_and_finish() {
        let mut s = scene(3, 4, 10);
        let id = s.add_vector(State::default()).unwrap();
        let start = s
            .apply_operator(id, &UnitaryMatrix::ry(1.0), RotationForm::default())
            .unwrap();
        assert!(matches!(
            start,
            Event::AnimationStarted(AnimationStartInfo { frames: 3, .. })
        ));

        let events = s.run_to_idle();
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events.last(),
            Some(Event::AnimationFinished(FinishInfo { vector, .. })) if *vector == id
        ));
        assert!(s.tick().is_empty());
    }

    #[test]
    fn stop_all_idles_the_scene() {
        let mut s = scene(10, 4, 10);
        s.add_vector(State::default()).unwrap();
        s.add_vector(State::from_polar(1.0, 0.5)).unwrap();
        s.apply_to_all(&UnitaryMatrix::hadamard(), RotationForm::default());
        s.tick();
        assert!(!s.is_idle());
        s.stop_all();
        assert!(s.is_idle());
        assert!(s.apply_operator(99, &UnitaryMatrix::s(), RotationForm::default()).is_err());
    }
}
