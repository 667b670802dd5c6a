// src/circuit.rs
//! The two multi-operator modes.
//!
//! A [`Circuit`] is a grid of operators, one row per vector in the scene and
//! one column per time step. Advancing applies one column to every row at
//! once; the step counter is shared, and the circuit halts after the last
//! column.
//!
//! An [`OperatorQueue`] is an ordered product `E₀·E₁·…·Eₙ₋₁` applied to a
//! single vector. The rightmost factor acts first, so a [`QueueRun`] plays
//! the entries back to front.

use crate::animation::{Scene, Status};
use crate::error::{QsphereError, Result};
use crate::events::{CircuitStepInfo, Event, QueueEntryInfo};
use crate::operator::UnitaryMatrix;
use crate::sequencer::RotationForm;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitProgress {
    /// Step `n` was started on every row.
    Stepped(usize),
    /// A previous step is still animating; nothing was started.
    Busy,
    Halted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    steps: usize,
    // operators[row][step]; `None` leaves the row alone for that step
    operators: Vec<Vec<Option<UnitaryMatrix>>>,
    current: usize,
}

impl Circuit {
    pub fn new(rows: usize, steps: usize) -> Self {
        Self {
            steps,
            operators: vec![vec![None; steps]; rows],
            current: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.operators.len()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn is_halted(&self) -> bool {
        self.current >= self.steps
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }

    pub fn operator(&self, row: usize, step: usize) -> Option<&UnitaryMatrix> {
        self.operators.get(row)?.get(step)?.as_ref()
    }

    pub fn set_operator(
        &mut self,
        row: usize,
        step: usize,
        operator: Option<UnitaryMatrix>,
    ) -> Result<()> {
        let rows = self.operators.len();
        let cells = self
            .operators
            .get_mut(row)
            .ok_or(QsphereError::IndexOutOfRange {
                what: "row",
                index: row,
                len: rows,
            })?;
        let len = cells.len();
        let cell = cells.get_mut(step).ok_or(QsphereError::IndexOutOfRange {
            what: "step",
            index: step,
            len,
        })?;
        *cell = operator;
        Ok(())
    }

    /// Adds an empty row, e.g. after a vector joined the scene.
    pub fn add_row(&mut self) {
        self.operators.push(vec![None; self.steps]);
    }

    pub fn remove_row(&mut self, row: usize) -> Result<()> {
        if row >= self.operators.len() {
            return Err(QsphereError::IndexOutOfRange {
                what: "row",
                index: row,
                len: self.operators.len(),
            });
        }
        self.operators.remove(row);
        Ok(())
    }

    /// Starts the current column on the scene's vectors, row `i` driving the
    /// `i`-th vector in insertion order. Waits while anything is animating.
    pub fn advance(
        &mut self,
        scene: &mut Scene,
        form: RotationForm,
    ) -> Result<(CircuitProgress, Vec<Event>)> {
        if self.is_halted() {
            return Ok((CircuitProgress::Halted, Vec::new()));
        }
        if !scene.is_idle() {
            return Ok((CircuitProgress::Busy, Vec::new()));
        }
        if scene.len() != self.rows() {
            return Err(QsphereError::IndexOutOfRange {
                what: "circuit row",
                index: self.rows(),
                len: scene.len(),
            });
        }

        let step = self.current;
        let ids: Vec<usize> = scene.vectors().iter().map(|v| v.id()).collect();
        let mut events = vec![Event::CircuitStep(CircuitStepInfo {
            step,
            total_steps: self.steps,
        })];
        for (row, id) in ids.into_iter().enumerate() {
            if let Some(op) = self.operators[row][step] {
                events.push(scene.apply_operator(id, &op, form)?);
            }
        }
        self.current += 1;
        debug!(step, total = self.steps, "circuit step started");
        if self.is_halted() {
            info!(steps = self.steps, "circuit halted");
        }
        Ok((CircuitProgress::Stepped(step), events))
    }

    /// Plays every remaining step to completion.
    pub fn run(&mut self, scene: &mut Scene, form: RotationForm) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        loop {
            let (progress, started) = self.advance(scene, form)?;
            events.extend(started);
            match progress {
                CircuitProgress::Halted => break,
                CircuitProgress::Busy | CircuitProgress::Stepped(_) => {
                    events.extend(scene.run_to_idle())
                }
            }
        }
        Ok(events)
    }
}

/// Product of operators, written left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorQueue {
    entries: Vec<UnitaryMatrix>,
}

impl OperatorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operator: UnitaryMatrix) {
        self.entries.push(operator);
    }

    pub fn insert(&mut self, index: usize, operator: UnitaryMatrix) -> Result<()> {
        if index > self.entries.len() {
            return Err(QsphereError::IndexOutOfRange {
                what: "queue",
                index,
                len: self.entries.len(),
            });
        }
        self.entries.insert(index, operator);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<UnitaryMatrix> {
        if index >= self.entries.len() {
            return Err(QsphereError::IndexOutOfRange {
                what: "queue",
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[UnitaryMatrix] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The single operator the queue amounts to.
    pub fn product(&self) -> UnitaryMatrix {
        self.entries
            .iter()
            .fold(UnitaryMatrix::identity(), |acc, e| acc * *e)
    }

    /// Snapshot of the queue ready to play on vector `vector`. Later edits to
    /// the queue do not affect a run already started.
    pub fn start(&self, vector: usize) -> QueueRun {
        QueueRun {
            vector,
            // popping from the back yields the rightmost factor first
            pending: self.entries.iter().copied().enumerate().collect(),
            highlighted: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueProgress {
    Started(usize),
    Animating(usize),
    Finished,
}

#[derive(Debug, Clone)]
pub struct QueueRun {
    vector: usize,
    pending: Vec<(usize, UnitaryMatrix)>,
    highlighted: Option<usize>,
}

impl QueueRun {
    pub fn vector(&self) -> usize {
        self.vector
    }

    /// Index of the entry currently being played.
    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty() && self.highlighted.is_none()
    }

    /// Starts the next entry once the vector is idle.
    pub fn poll(
        &mut self,
        scene: &mut Scene,
        form: RotationForm,
    ) -> Result<(QueueProgress, Option<Event>)> {
        let vector = scene
            .vector(self.vector)
            .ok_or(QsphereError::UnknownVector(self.vector))?;
        if vector.status() == Status::Animating {
            if let Some(index) = self.highlighted {
                return Ok((QueueProgress::Animating(index), None));
            }
        }
        match self.pending.pop() {
            Some((index, op)) => {
                scene.apply_operator(self.vector, &op, form)?;
                self.highlighted = Some(index);
                debug!(vector = self.vector, index, "queue entry started");
                let event = Event::QueueEntry(QueueEntryInfo {
                    vector: self.vector,
                    index,
                    operator: op.to_string(),
                });
                Ok((QueueProgress::Started(index), Some(event)))
            }
            None => {
                self.highlighted = None;
                Ok((QueueProgress::Finished, None))
            }
        }
    }

    /// Plays the whole queue, ticking the scene in between entries.
    pub fn run(&mut self, scene: &mut Scene, form: RotationForm) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        loop {
            let (progress, event) = self.poll(scene, form)?;
            events.extend(event);
            match progress {
                QueueProgress::Finished => break,
                QueueProgress::Started(_) | QueueProgress::Animating(_) => {
                    events.extend(scene.run_to_idle())
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnimationConfig, VisualizerConfig};
    use crate::state::State;
    use approx::assert_abs_diff_eq;

    fn scene(steps: usize) -> Scene {
        Scene::new(VisualizerConfig {
            animation: AnimationConfig {
                steps_per_rotation: steps,
                tick_interval_ms: 0,
            },
            ..VisualizerConfig::default()
        })
    }

    #[test]
    fn circuit_steps_in_lockstep_and_halts() {
        let mut s = scene(4);
        s.add_vector(State::default()).unwrap();
        s.add_vector(State::default()).unwrap();
        let mut c = Circuit::new(2, 2);
        c.set_operator(0, 0, Some(UnitaryMatrix::pauli_x())).unwrap();
        c.set_operator(1, 0, Some(UnitaryMatrix::hadamard())).unwrap();
        c.set_operator(1, 1, Some(UnitaryMatrix::hadamard())).unwrap();

        let (progress, events) = c.advance(&mut s, RotationForm::default()).unwrap();
        assert_eq!(progress, CircuitProgress::Stepped(0));
        assert_eq!(events.len(), 3);
        assert_eq!(
            c.advance(&mut s, RotationForm::default()).unwrap().0,
            CircuitProgress::Busy
        );
        assert_eq!(c.current_step(), 1);

        c.run(&mut s, RotationForm::default()).unwrap();
        assert!(c.is_halted());
        assert_eq!(
            c.advance(&mut s, RotationForm::default()).unwrap().0,
            CircuitProgress::Halted
        );

        assert_abs_diff_eq!(s.vectors()[0].state().z(), -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.vectors()[1].state().z(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn circuit_needs_one_row_per_vector() {
        let mut s = scene(4);
        s.add_vector(State::default()).unwrap();
        let mut c = Circuit::new(2, 1);
        assert!(c.advance(&mut s, RotationForm::default()).is_err());
        assert_eq!(c.current_step(), 0);
        assert!(c.set_operator(5, 0, None).is_err());
        assert!(c.set_operator(0, 3, None).is_err());
        c.remove_row(1).unwrap();
        assert!(c.advance(&mut s, RotationForm::default()).is_ok());
    }

    #[test]
    fn rows_follow_vectors_joining_the_scene() {
        let mut s = scene(2);
        s.add_vector(State::default()).unwrap();
        let mut c = Circuit::new(1, 1);
        s.add_vector(State::default()).unwrap();
        assert!(c.advance(&mut s, RotationForm::default()).is_err());

        c.add_row();
        assert_eq!(c.rows(), 2);
        assert!(c.operator(1, 0).is_none());
        c.set_operator(1, 0, Some(UnitaryMatrix::pauli_x())).unwrap();
        c.run(&mut s, RotationForm::default()).unwrap();
        assert_abs_diff_eq!(s.vectors()[0].state().z(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.vectors()[1].state().z(), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn queue_plays_back_to_front() {
        let mut s = scene(6);
        let id = s.add_vector(State::default()).unwrap();
        let mut q = OperatorQueue::new();
        // H·X|0⟩ = H|1⟩ = |−⟩, while X·H|0⟩ = |+⟩
        q.push(UnitaryMatrix::hadamard());
        q.push(UnitaryMatrix::pauli_x());

        let mut run = q.start(id);
        let (progress, event) = run.poll(&mut s, RotationForm::default()).unwrap();
        assert_eq!(progress, QueueProgress::Started(1));
        assert!(matches!(event, Some(Event::QueueEntry(QueueEntryInfo { index: 1, .. }))));
        assert_eq!(run.highlighted(), Some(1));
        assert_eq!(
            run.poll(&mut s, RotationForm::default()).unwrap().0,
            QueueProgress::Animating(1)
        );

        run.run(&mut s, RotationForm::default()).unwrap();
        assert!(run.is_finished());
        assert_eq!(run.highlighted(), None);
        let state = *s.vector(id).unwrap().state();
        assert_abs_diff_eq!(state.x(), -1.0, epsilon = 1e-9);
        assert!(state.same_point(&q.product().apply(&State::default())));
    }

    #[test]
    fn queue_editing() {
        let mut q = OperatorQueue::new();
        q.push(UnitaryMatrix::s());
        q.insert(0, UnitaryMatrix::t()).unwrap();
        assert!(q.insert(5, UnitaryMatrix::t()).is_err());
        assert_eq!(q.len(), 2);
        assert_eq!(q.remove(0).unwrap(), UnitaryMatrix::t());
        assert!(q.remove(3).is_err());
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.product(), UnitaryMatrix::identity());
    }
}
