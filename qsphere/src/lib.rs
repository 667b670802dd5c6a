pub mod complex;
pub mod config;
pub mod decompose;
pub mod error;
pub mod notation;
pub mod operator;
pub mod spike;
pub mod state;

pub mod animation;
pub mod circuit;
pub mod events;
pub mod sequencer;

// Re-export key components for easier access from the binary or other libraries.
pub use animation::{AnimatedVector, Scene, Status};
pub use circuit::{Circuit, OperatorQueue, QueueRun};
pub use config::{AnimationConfig, VisualizerConfig};
pub use decompose::{
    Decomposition, DecompositionKind, Decompositions, VectorAngle, compose, compose_vector_angle,
    decompose, vector_angle,
};
pub use error::{ParseError, QsphereError, Result};
pub use operator::{Gate, UnitaryMatrix};
pub use sequencer::{Frame, RotationForm};
pub use spike::Spike;
pub use state::{State, StateInput, UnitPolicy};
