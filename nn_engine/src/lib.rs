pub mod arch;
pub mod error;
pub mod initialization;
pub mod memory;
pub mod training;

pub use error::{EngineErr, Result};
