// src/error.rs
use thiserror::Error;

/// Failures of the complex / vector text grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("malformed number: {0:?}")]
    Malformed(String),
    #[error("expected {expected} components, found {found} in {text:?}")]
    WrongArity {
        text: String,
        expected: usize,
        found: usize,
    },
}

/// Everything the core can refuse. None of these are fatal: callers show a
/// message and keep their previous state.
#[derive(Error, Debug)]
pub enum QsphereError {
    #[error("matrix is not unitary")]
    NotUnitary,
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("vector is not on the unit sphere (norm {norm})")]
    NotUnitVector { norm: f64 },
    #[error("coefficients are not normalized (norm {norm})")]
    NotNormalized { norm: f64 },
    #[error("zero-length vector cannot be normalized")]
    ZeroVector,
    #[error("{0} input contains NaN or infinity")]
    NonFinite(&'static str),
    #[error("scene already holds the maximum of {max} vectors")]
    TooManyVectors { max: usize },
    #[error("no vector with id {0}")]
    UnknownVector(usize),
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("unknown gate: {0}")]
    UnknownGate(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QsphereError>;
