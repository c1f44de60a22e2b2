use std::num::NonZeroUsize;

use log::debug;
use ndarray::ArrayView1;

use super::Workspace;
use crate::{
    EngineErr, Result,
    arch::{Network, loss::LossFn},
    memory::{Footprint, MemoryBudget},
};

/// A bounded ring of `(input, output)` observations.
///
/// Observations are stored contiguously, `x_size` inputs followed by `y_size` outputs. Once
/// the ring is full, adding an observation overwrites the oldest one.
#[derive(Debug, Clone)]
pub struct Dataset {
    x_size: usize,
    y_size: usize,
    capacity: usize,
    start: usize,
    len: usize,
    data: Vec<f32>,
}

impl Dataset {
    /// The amount of `f32` slots a dataset of the given shape needs.
    pub fn footprint_of(capacity: usize, x_size: usize, y_size: usize) -> usize {
        capacity * (x_size + y_size)
    }

    /// Allocates an empty dataset sized after the inputs and outputs of `net`.
    ///
    /// # Arguments
    /// * `net` - The network the observations are meant for.
    /// * `capacity` - The maximum amount of observations.
    /// * `budget` - The memory budget the dataset has to fit in.
    /// * `in_use` - The amount of slots already taken.
    ///
    /// # Returns
    /// A new `Dataset` or an `OutOfMemory` error.
    pub fn alloc(
        net: &Network,
        capacity: NonZeroUsize,
        budget: MemoryBudget,
        in_use: usize,
    ) -> Result<Self> {
        let (x_size, y_size) = (net.input_count(), net.output_count());
        let capacity = capacity.get();
        let size = Self::footprint_of(capacity, x_size, y_size);
        budget.check(in_use, size)?;

        Ok(Self {
            x_size,
            y_size,
            capacity,
            start: 0,
            len: 0,
            data: vec![0.; size],
        })
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.y_size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the observations have the shape of the inputs and outputs of `net`.
    pub fn fits(&self, net: &Network) -> bool {
        self.x_size == net.input_count() && self.y_size == net.output_count()
    }

    /// Adds an observation, overwriting the oldest one if the dataset is full.
    ///
    /// Values beyond `x_size` (or `y_size`) are ignored and missing ones are zero.
    ///
    /// # Arguments
    /// * `x` - The input of the observation.
    /// * `y` - The expected output of the observation.
    pub fn add(&mut self, x: &[f32], y: &[f32]) {
        let slot = if self.len < self.capacity {
            self.len += 1;
            (self.start + self.len - 1) % self.capacity
        } else {
            let slot = self.start;
            self.start = (self.start + 1) % self.capacity;
            slot
        };

        let stride = self.x_size + self.y_size;
        let row = &mut self.data[slot * stride..(slot + 1) * stride];
        let (row_x, row_y) = row.split_at_mut(self.x_size);

        for (dst, src) in [(row_x, x), (row_y, y)] {
            dst.fill(0.);
            dst.iter_mut().zip(src).for_each(|(d, &s)| *d = s);
        }
    }

    /// Iterates the observations from the oldest to the newest.
    pub fn iter(&self) -> impl Iterator<Item = (&[f32], &[f32])> {
        let stride = self.x_size + self.y_size;

        (0..self.len).map(move |i| {
            let slot = (self.start + i) % self.capacity;
            self.data[slot * stride..(slot + 1) * stride].split_at(self.x_size)
        })
    }

    /// Trains `net` with back-propagation over every observation.
    ///
    /// Each pass accumulates the gradient of every observation, in insertion order, and then
    /// applies the averaged gradient once.
    ///
    /// # Arguments
    /// * `net` - The network to train.
    /// * `ws` - A workspace sized after `net`.
    /// * `loss_fn` - The loss function.
    /// * `eta` - The learning rate.
    /// * `passes` - The amount of passes over the whole dataset.
    ///
    /// # Returns
    /// The mean loss of the last pass.
    pub fn train<L: LossFn>(
        &self,
        net: &mut Network,
        ws: &mut Workspace,
        loss_fn: &L,
        eta: f32,
        passes: usize,
    ) -> Result<f32> {
        if !self.fits(net) {
            return Err(EngineErr::SizeMismatch {
                what: "dataset inputs and outputs",
                got: self.x_size + self.y_size,
                expected: net.input_count() + net.output_count(),
            });
        }

        let mut mean_loss = 0.;
        if self.is_empty() {
            return Ok(mean_loss);
        }

        for pass in 0..passes {
            ws.begin();

            let mut total = 0.;
            for (x, y) in self.iter() {
                if let Some(first) = net.first_mut() {
                    first.input_mut().assign(&ArrayView1::from(x));
                }
                if let Some(last) = net.last_mut() {
                    last.output_mut().assign(&ArrayView1::from(y));
                }

                total += ws.add_gradients(net, loss_fn)?;
            }

            ws.apply(net, eta)?;
            mean_loss = total / self.len as f32;
            debug!(
                pass = pass,
                observations = ws.count(),
                loss = mean_loss;
                "dataset pass done"
            );
        }

        Ok(mean_loss)
    }
}

impl Footprint for Dataset {
    fn footprint(&self) -> usize {
        self.data.len()
    }
}
