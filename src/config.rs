use std::num::NonZeroUsize;

use nn_engine::initialization::WeightInit;
use serde::{Deserialize, Serialize};

const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(4096).unwrap();
const DEFAULT_MAX_OBSERVATIONS: NonZeroUsize = NonZeroUsize::new(256).unwrap();

/// The resources and initialization of a `Natives` context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativesConfig {
    /// Total `f32` slots shared by the network, the training workspace and the dataset.
    pub capacity: NonZeroUsize,
    /// Upper bound of `nn.dataset.init`.
    pub max_observations: NonZeroUsize,
    /// Seed of the random weights, drawn from the OS when absent.
    pub seed: Option<u64>,
    pub init: WeightInit,
}

impl Default for NativesConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_observations: DEFAULT_MAX_OBSERVATIONS,
            seed: None,
            init: WeightInit::default(),
        }
    }
}

impl NativesConfig {
    pub fn with_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_observations(mut self, max_observations: NonZeroUsize) -> Self {
        self.max_observations = max_observations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_init(mut self, init: WeightInit) -> Self {
        self.init = init;
        self
    }
}
