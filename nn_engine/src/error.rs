use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::uniform::Error as UniformError;

/// The result type used in the entire engine crate.
pub type Result<T> = std::result::Result<T, EngineErr>;

/// The engine's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineErr {
    OutOfMemory {
        requested: usize,
        available: usize,
    },
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    UnsuitableForHebbian {
        layers: usize,
    },
    InvalidDistribution(String),
}

impl Display for EngineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErr::OutOfMemory {
                requested,
                available,
            } => write!(
                f,
                "out of memory: requested {requested} slots, only {available} available"
            ),
            EngineErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}: got {got}, expected {expected}"),
            EngineErr::UnsuitableForHebbian { layers } => write!(
                f,
                "the hebbian rule needs a single identity layer, the network has {layers} layers"
            ),
            EngineErr::InvalidDistribution(msg) => write!(f, "invalid distribution: {msg}"),
        }
    }
}

impl Error for EngineErr {}

impl From<UniformError> for EngineErr {
    fn from(value: UniformError) -> Self {
        Self::InvalidDistribution(value.to_string())
    }
}
