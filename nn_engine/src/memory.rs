use std::num::NonZeroUsize;

use crate::{EngineErr, Result};

/// Something that lives in the engine's fixed memory area.
pub trait Footprint {
    /// Returns the amount of `f32` slots this value occupies.
    fn footprint(&self) -> usize;
}

/// The fixed amount of `f32` slots shared by the network, the training workspace and the
/// dataset, as on a controller with a static heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    capacity: NonZeroUsize,
}

impl MemoryBudget {
    /// Creates a new `MemoryBudget`.
    ///
    /// # Arguments
    /// * `capacity` - The total amount of `f32` slots available.
    ///
    /// # Returns
    /// A new `MemoryBudget` instance.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Checks whether `requested` more slots fit when `in_use` are already taken.
    ///
    /// # Arguments
    /// * `in_use` - The amount of slots already allocated.
    /// * `requested` - The amount of slots about to be allocated.
    ///
    /// # Returns
    /// An `OutOfMemory` error if the allocation would exceed the capacity.
    pub fn check(&self, in_use: usize, requested: usize) -> Result<()> {
        let available = self.capacity().saturating_sub(in_use);
        if requested > available {
            return Err(EngineErr::OutOfMemory {
                requested,
                available,
            });
        }

        Ok(())
    }
}
