use ndarray::{Array1, Array2, Axis, linalg};

use crate::{
    EngineErr, Result,
    arch::{Network, loss::LossFn},
    memory::{Footprint, MemoryBudget},
};

/// Scratch memory for back-propagation, sized after one network topology.
///
/// Usage is always `begin`, one or more `add_gradients`, then `apply`. The workspace refuses to
/// touch a network whose topology tag or layer shapes differ from the ones it was sized for.
#[derive(Debug, Clone)]
pub struct Workspace {
    topology: u64,
    grad_w: Vec<Array2<f32>>,
    grad_b: Vec<Array1<f32>>,
    deltas: Vec<Array1<f32>>,
    count: usize,
}

impl Workspace {
    /// The amount of `f32` slots a workspace for `net` needs.
    pub fn footprint_for(net: &Network) -> usize {
        net.layers()
            .iter()
            .map(|layer| layer.input_count() * layer.output_count() + 2 * layer.output_count())
            .sum()
    }

    /// Allocates a workspace sized after `net`.
    ///
    /// # Arguments
    /// * `net` - The network this workspace will train.
    /// * `budget` - The memory budget the workspace has to fit in.
    /// * `in_use` - The amount of slots already taken.
    ///
    /// # Returns
    /// A new `Workspace` or an `OutOfMemory` error.
    pub fn alloc(net: &Network, budget: MemoryBudget, in_use: usize) -> Result<Self> {
        budget.check(in_use, Self::footprint_for(net))?;

        let layers = net.layers();
        Ok(Self {
            topology: net.topology(),
            grad_w: layers
                .iter()
                .map(|layer| Array2::zeros((layer.output_count(), layer.input_count())))
                .collect(),
            grad_b: layers
                .iter()
                .map(|layer| Array1::zeros(layer.output_count()))
                .collect(),
            deltas: layers
                .iter()
                .map(|layer| Array1::zeros(layer.output_count()))
                .collect(),
            count: 0,
        })
    }

    pub fn topology(&self) -> u64 {
        self.topology
    }

    /// The amount of observations accumulated since the last `begin`.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether this workspace was sized for `net`.
    pub fn fits(&self, net: &Network) -> bool {
        self.topology == net.topology()
            && self.grad_w.len() == net.len()
            && self
                .grad_w
                .iter()
                .zip(net.layers())
                .all(|(gw, layer)| gw.dim() == (layer.output_count(), layer.input_count()))
    }

    fn check(&self, net: &Network) -> Result<()> {
        if net.is_empty() || !self.fits(net) {
            return Err(EngineErr::SizeMismatch {
                what: "workspace layers",
                got: self.grad_w.len(),
                expected: net.len(),
            });
        }

        Ok(())
    }

    /// Zeroes the gradient accumulators.
    pub fn begin(&mut self) {
        self.grad_w.iter_mut().for_each(|g| g.fill(0.));
        self.grad_b.iter_mut().for_each(|g| g.fill(0.));
        self.count = 0;
    }

    /// Accumulates the gradient of one observation.
    ///
    /// The observation is the first layer's current input and, as target, the last layer's
    /// current output. The target is written back into the last layer's output once the
    /// gradient is accumulated.
    ///
    /// # Arguments
    /// * `net` - The network to differentiate.
    /// * `loss_fn` - The loss function.
    ///
    /// # Returns
    /// The loss of the observation before any update.
    pub fn add_gradients<L: LossFn>(&mut self, net: &mut Network, loss_fn: &L) -> Result<f32> {
        self.check(net)?;

        let target = net
            .last()
            .map(|layer| layer.output().to_owned())
            .unwrap_or_default();
        net.eval();

        let layers = net.layers();
        let n = layers.len();
        let y_pred = layers[n - 1].output();
        let loss = loss_fn.loss(y_pred.view(), target.view());
        let mut grad_a = loss_fn.loss_prime(y_pred.view(), target.view());

        for i in (0..n).rev() {
            let layer = &layers[i];
            let act_fn = layer.act_fn();

            let delta = &mut self.deltas[i];
            delta.assign(&grad_a);
            delta.zip_mut_with(layer.z(), |d, &z| *d *= act_fn.df(z));

            let d = delta.view().insert_axis(Axis(1));
            let x = layer.input().view().insert_axis(Axis(0));
            linalg::general_mat_mul(1.0, &d, &x, 1.0, &mut self.grad_w[i]);
            self.grad_b[i] += &*delta;

            if i > 0 {
                grad_a = layer.weights().t().dot(&*delta);
            }
        }

        if let Some(last) = net.last_mut() {
            last.output_mut().assign(&target);
        }

        self.count += 1;
        Ok(loss)
    }

    /// Moves the parameters against the averaged accumulated gradient.
    ///
    /// # Arguments
    /// * `net` - The network to update.
    /// * `eta` - The learning rate.
    pub fn apply(&self, net: &mut Network, eta: f32) -> Result<()> {
        self.check(net)?;

        if self.count == 0 {
            return Ok(());
        }

        let lr = eta / self.count as f32;
        for ((layer, gw), gb) in net
            .layers_mut()
            .iter_mut()
            .zip(&self.grad_w)
            .zip(&self.grad_b)
        {
            layer.weights_mut().scaled_add(-lr, gw);
            layer.offsets_mut().scaled_add(-lr, gb);
        }

        Ok(())
    }
}

impl Footprint for Workspace {
    fn footprint(&self) -> usize {
        self.grad_w.iter().map(|g| g.len()).sum::<usize>()
            + self.grad_b.iter().map(|g| g.len()).sum::<usize>()
            + self.deltas.iter().map(|d| d.len()).sum::<usize>()
    }
}
