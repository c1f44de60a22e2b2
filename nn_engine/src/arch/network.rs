use log::debug;
use ndarray::ArrayView1;
use rand::Rng;

use super::{activations::ActFn, layers::Dense};
use crate::{
    EngineErr, Result,
    initialization::WeightInit,
    memory::{Footprint, MemoryBudget},
};

/// A sequential stack of dense layers: information flows forward from the first layer's input
/// to the last layer's output.
///
/// Every network carries a `topology` tag handed out by whoever built it. Anything sized after
/// a network (workspaces, datasets) remembers the tag so it can detect that it went stale.
#[derive(Debug, Clone, Default)]
pub struct Network {
    layers: Vec<Dense>,
    topology: u64,
}

impl Network {
    /// Returns a network without layers.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn topology(&self) -> u64 {
        self.topology
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Dense] {
        &mut self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Dense> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Dense> {
        self.layers.get_mut(index)
    }

    pub fn first_mut(&mut self) -> Option<&mut Dense> {
        self.layers.first_mut()
    }

    pub fn last(&self) -> Option<&Dense> {
        self.layers.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Dense> {
        self.layers.last_mut()
    }

    /// The amount of inputs of the first layer, zero for an empty network.
    pub fn input_count(&self) -> usize {
        self.layers.first().map_or(0, Dense::input_count)
    }

    /// The amount of outputs of the last layer, zero for an empty network.
    pub fn output_count(&self) -> usize {
        self.layers.last().map_or(0, Dense::output_count)
    }

    /// Makes a forward pass through the network, each layer's output becomes the next layer's
    /// input.
    ///
    /// # Returns
    /// A view of the last layer's output, `None` if the network is empty.
    pub fn eval(&mut self) -> Option<ArrayView1<'_, f32>> {
        for i in 0..self.layers.len() {
            if i > 0 {
                let (prev, next) = self.layers.split_at_mut(i);
                next[0].input_mut().assign(prev[i - 1].output());
            }

            self.layers[i].forward();
        }

        self.layers.last().map(|layer| layer.output().view())
    }

    /// Draws new random weights and zeroes the offsets, keeping the topology.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to draw from.
    /// * `init` - The distribution of the weights.
    ///
    /// # Returns
    /// An error if the distribution is invalid, in which case no parameter is modified.
    pub fn init_weights<R: Rng>(&mut self, rng: &mut R, init: WeightInit) -> Result<()> {
        let samples = self
            .layers
            .iter()
            .map(|layer| init.sample(rng, layer.input_count(), layer.output_count()))
            .collect::<Result<Vec<_>>>()?;

        for (layer, weights) in self.layers.iter_mut().zip(samples) {
            layer.fill_params(&weights, 0.);
        }

        Ok(())
    }

    /// Sets every weight and offset to zero.
    pub fn clear_weights(&mut self) {
        for layer in &mut self.layers {
            layer.weights_mut().fill(0.);
            layer.offsets_mut().fill(0.);
        }
    }

    /// Checks that the network is made of exactly one identity layer.
    pub fn check_hebbian(&self) -> Result<()> {
        match self.layers.as_slice() {
            [layer] if layer.act_fn() == ActFn::Identity => Ok(()),
            layers => Err(EngineErr::UnsuitableForHebbian {
                layers: layers.len(),
            }),
        }
    }

    /// Applies a single Hebbian step using the current input and output.
    ///
    /// # Arguments
    /// * `alpha` - The learning rate.
    ///
    /// # Returns
    /// An error unless the network is made of exactly one identity layer.
    pub fn hebbian_step(&mut self, alpha: f32) -> Result<()> {
        self.check_hebbian()?;

        if let Some(layer) = self.layers.first_mut() {
            layer.hebbian_step(alpha);
        }

        Ok(())
    }
}

impl Footprint for Network {
    fn footprint(&self) -> usize {
        self.layers.iter().map(Footprint::footprint).sum()
    }
}

/// Builds a `Network` layer by layer, refusing any layer that does not fit in the budget.
#[derive(Debug)]
pub struct NetworkBuilder {
    budget: MemoryBudget,
    in_use: usize,
    input_count: usize,
    topology: u64,
    layers: Vec<Dense>,
}

impl NetworkBuilder {
    /// Creates a new `NetworkBuilder`.
    ///
    /// # Arguments
    /// * `budget` - The memory budget the network has to fit in.
    /// * `in_use` - The amount of slots already taken by something else.
    /// * `topology` - The tag of the network to build.
    /// * `input_count` - The amount of inputs of the first layer.
    ///
    /// # Returns
    /// A new `NetworkBuilder` instance.
    pub fn new(budget: MemoryBudget, in_use: usize, topology: u64, input_count: usize) -> Self {
        Self {
            budget,
            in_use,
            input_count,
            topology,
            layers: Vec::new(),
        }
    }

    /// Appends a layer whose input count is the previous layer's output count.
    ///
    /// # Arguments
    /// * `output_count` - The amount of outputs of the new layer.
    /// * `act_fn` - The activation function of the new layer.
    ///
    /// # Returns
    /// An `OutOfMemory` error if the layer does not fit.
    pub fn add_layer(&mut self, output_count: usize, act_fn: ActFn) -> Result<&mut Self> {
        let input_count = self
            .layers
            .last()
            .map_or(self.input_count, Dense::output_count);
        let dim = (input_count, output_count);

        let allocated: usize = self.layers.iter().map(Footprint::footprint).sum();
        self.budget
            .check(self.in_use + allocated, Dense::footprint_of(dim))?;

        debug!("adding layer {}: {dim:?} {act_fn:?}", self.layers.len());
        self.layers.push(Dense::new(dim, act_fn));
        Ok(self)
    }

    pub fn build(self) -> Network {
        Network {
            layers: self.layers,
            topology: self.topology,
        }
    }
}
