//! Exposes a trainable neural network to a 16-bit integer virtual machine.
//!
//! Weights and offsets cross the VM boundary as `num/den` pairs of `i16`, found by
//! `rational::Fraction::approximate`. Every `nn.*` native is listed in `catalog`, bound from
//! raw VM arguments by `vm::Call` and run by a `natives::Natives` context.

pub mod catalog;
pub mod config;
pub mod error;
pub mod natives;
pub mod rational;
pub mod register;
pub mod vm;

pub use catalog::Native;
pub use config::NativesConfig;
pub use error::{NativeErr, Result};
pub use natives::Natives;
pub use rational::Fraction;
pub use register::ErrorCode;
