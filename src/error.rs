use std::{
    error::Error,
    fmt::{self, Display},
};

use nn_engine::EngineErr;

use crate::{register::ErrorCode, vm::BindErr};

/// The bridge's result type.
pub type Result<T> = std::result::Result<T, NativeErr>;

/// Why a native call did nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeErr {
    OutOfMemory {
        requested: usize,
        available: usize,
    },
    NoNetwork,
    NoDataset,
    IndexOutOfRange {
        what: &'static str,
        index: i16,
        len: usize,
    },
    UnsuitableForHebbian,
    InvalidDimension {
        what: &'static str,
        value: i16,
    },
    ZeroDenominator {
        what: &'static str,
    },
    DatasetMismatch {
        got: usize,
        expected: usize,
    },
    Bind(BindErr),
    Engine(EngineErr),
}

impl NativeErr {
    /// The code this error leaves in the error register, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            NativeErr::OutOfMemory { .. } | NativeErr::InvalidDimension { .. } => {
                Some(ErrorCode::OutOfMemory)
            }
            NativeErr::NoNetwork | NativeErr::NoDataset => Some(ErrorCode::NoNetwork),
            NativeErr::IndexOutOfRange { .. }
            | NativeErr::DatasetMismatch { .. }
            | NativeErr::Bind(_) => Some(ErrorCode::IndexOutOfRange),
            NativeErr::UnsuitableForHebbian => Some(ErrorCode::UnsuitableForHebbian),
            NativeErr::ZeroDenominator { .. } => None,
            NativeErr::Engine(EngineErr::OutOfMemory { .. }) => Some(ErrorCode::OutOfMemory),
            NativeErr::Engine(EngineErr::UnsuitableForHebbian { .. }) => {
                Some(ErrorCode::UnsuitableForHebbian)
            }
            NativeErr::Engine(EngineErr::SizeMismatch { .. }) => Some(ErrorCode::IndexOutOfRange),
            NativeErr::Engine(EngineErr::InvalidDistribution(_)) => None,
        }
    }
}

impl Display for NativeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeErr::OutOfMemory {
                requested,
                available,
            } => write!(
                f,
                "out of memory: requested {requested} slots, only {available} available"
            ),
            NativeErr::NoNetwork => write!(f, "no neural network, call nn.init first"),
            NativeErr::NoDataset => write!(f, "no dataset, call nn.dataset.init first"),
            NativeErr::IndexOutOfRange { what, index, len } => {
                write!(f, "{what} index {index} out of range 0..{len}")
            }
            NativeErr::UnsuitableForHebbian => {
                write!(f, "the hebbian rule needs a single identity layer")
            }
            NativeErr::InvalidDimension { what, value } => {
                write!(f, "invalid {what}: {value}")
            }
            NativeErr::ZeroDenominator { what } => write!(f, "zero denominator for {what}"),
            NativeErr::DatasetMismatch { got, expected } => write!(
                f,
                "dataset observations have {got} values, the network expects {expected}"
            ),
            NativeErr::Bind(e) => write!(f, "bad call: {e}"),
            NativeErr::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl Error for NativeErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NativeErr::Bind(e) => Some(e),
            NativeErr::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineErr> for NativeErr {
    fn from(value: EngineErr) -> Self {
        match value {
            EngineErr::OutOfMemory {
                requested,
                available,
            } => Self::OutOfMemory {
                requested,
                available,
            },
            EngineErr::UnsuitableForHebbian { .. } => Self::UnsuitableForHebbian,
            other => Self::Engine(other),
        }
    }
}

impl From<BindErr> for NativeErr {
    fn from(value: BindErr) -> Self {
        Self::Bind(value)
    }
}
