use ndarray::{Array1, Array2, ArrayView1, linalg};

use crate::{arch::activations::ActFn, memory::Footprint};

/// A fully connected layer followed by an activation function.
///
/// Besides its parameters, the layer keeps the state of its most recent forward pass: the
/// `input` it consumed, the pre-activation `z` and the resulting `output`.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: ActFn,

    // Parameters, weights are (outputs, inputs)
    weights: Array2<f32>,
    offsets: Array1<f32>,

    // Forward metadata
    input: Array1<f32>,
    z: Array1<f32>,
    output: Array1<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer with every parameter set to zero.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `act_fn` - The activation function applied after the affine transform.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: ActFn) -> Self {
        let (inputs, outputs) = dim;

        Self {
            dim,
            act_fn,
            weights: Array2::zeros((outputs, inputs)),
            offsets: Array1::zeros(outputs),
            input: Array1::zeros(inputs),
            z: Array1::zeros(outputs),
            output: Array1::zeros(outputs),
        }
    }

    /// The amount of `f32` slots a layer of the given shape needs.
    pub fn footprint_of(dim: (usize, usize)) -> usize {
        let (inputs, outputs) = dim;
        inputs * outputs + inputs + 3 * outputs
    }

    pub fn input_count(&self) -> usize {
        self.dim.0
    }

    pub fn output_count(&self) -> usize {
        self.dim.1
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn act_fn(&self) -> ActFn {
        self.act_fn
    }

    /// Makes a forward pass from the layer's current input.
    ///
    /// # Returns
    /// A view of the freshly computed output.
    pub fn forward(&mut self) -> ArrayView1<'_, f32> {
        self.z.assign(&self.offsets);
        linalg::general_mat_vec_mul(1.0, &self.weights, &self.input, 1.0, &mut self.z);

        let act_fn = self.act_fn;
        self.output.zip_mut_with(&self.z, |a, &z| *a = act_fn.f(z));
        self.output.view()
    }

    /// Overwrites every weight and offset.
    ///
    /// # Arguments
    /// * `weights` - The new weights in row-major order, one row per output.
    /// * `offset` - The value every offset is set to.
    pub fn fill_params(&mut self, weights: &[f32], offset: f32) {
        self.weights
            .iter_mut()
            .zip(weights)
            .for_each(|(w, &v)| *w = v);
        self.offsets.fill(offset);
    }

    /// Applies `Δw = alpha * output ⊗ input` to the weights.
    pub fn hebbian_step(&mut self, alpha: f32) {
        let (outputs, inputs) = self.weights.dim();
        let output = self.output.view().into_shape_with_order((outputs, 1));
        let input = self.input.view().into_shape_with_order((1, inputs));

        if let (Ok(output), Ok(input)) = (output, input) {
            linalg::general_mat_mul(alpha, &output, &input, 1.0, &mut self.weights);
        }
    }

    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut Array2<f32> {
        &mut self.weights
    }

    pub fn offsets(&self) -> &Array1<f32> {
        &self.offsets
    }

    pub fn offsets_mut(&mut self) -> &mut Array1<f32> {
        &mut self.offsets
    }

    pub fn input(&self) -> &Array1<f32> {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut Array1<f32> {
        &mut self.input
    }

    pub fn z(&self) -> &Array1<f32> {
        &self.z
    }

    pub fn output(&self) -> &Array1<f32> {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Array1<f32> {
        &mut self.output
    }
}

impl Footprint for Dense {
    fn footprint(&self) -> usize {
        Self::footprint_of(self.dim)
    }
}
