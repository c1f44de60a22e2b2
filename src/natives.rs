use std::num::NonZeroUsize;

use log::{debug, info, warn};
use nn_engine::{
    arch::{Network, NetworkBuilder, activations::ActFn, layers::Dense, loss::Mse},
    memory::{Footprint, MemoryBudget},
    training::{Dataset, Workspace},
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    catalog::Native,
    config::NativesConfig,
    error::{NativeErr, Result},
    rational::Fraction,
    register::{ErrorCode, ErrorRegister},
    vm::{self, Call},
};

/// The state behind every `nn.*` native function: one network, its training workspace, an
/// optional dataset and the error register.
///
/// Every operation validates its arguments before touching the network, so a failing call
/// leaves the state as it was. Through `call` and `invoke` failures are logged and recorded
/// in the error register instead of reaching the VM.
#[derive(Debug)]
pub struct Natives {
    config: NativesConfig,
    budget: MemoryBudget,
    loss_fn: Mse,
    rng: StdRng,
    network: Network,
    workspace: Option<Workspace>,
    dataset: Option<Dataset>,
    errors: ErrorRegister,
    topologies: u64,
}

impl Natives {
    /// Creates a new `Natives` context without a network.
    ///
    /// # Arguments
    /// * `config` - The memory capacity, dataset bound and weight initialization to use.
    ///
    /// # Returns
    /// A new `Natives` instance.
    pub fn new(config: NativesConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            budget: MemoryBudget::new(config.capacity),
            config,
            loss_fn: Mse::new(),
            rng,
            network: Network::empty(),
            workspace: None,
            dataset: None,
            errors: ErrorRegister::new(),
            topologies: 0,
        }
    }

    pub fn config(&self) -> &NativesConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// The amount of memory slots taken by the network, the workspace and the dataset.
    pub fn in_use(&self) -> usize {
        self.network.footprint()
            + self.workspace.as_ref().map_or(0, Footprint::footprint)
            + self.dataset.as_ref().map_or(0, Footprint::footprint)
    }

    pub fn error(&self) -> ErrorCode {
        self.errors.get()
    }

    pub fn reset_error(&mut self) {
        self.errors.reset();
    }

    /// Replaces the network by a new stack of layers with random weights and zero offsets.
    ///
    /// The previous network and its workspace are dropped first, so on failure no network is
    /// left. The dataset is kept.
    ///
    /// # Arguments
    /// * `input_count` - The amount of inputs of the first layer.
    /// * `output_counts` - The amount of outputs of each layer.
    /// * `activations` - The activation code of each layer.
    pub fn init(
        &mut self,
        input_count: i16,
        output_counts: &[i16],
        activations: &[i16],
    ) -> Result<()> {
        self.network = Network::empty();
        self.workspace = None;

        let inputs = dimension("input count", input_count)?;
        let layers = output_counts
            .iter()
            .zip(activations)
            .map(|(&outputs, &code)| {
                Ok((dimension("output count", outputs)?, ActFn::from_code(code)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.topologies += 1;
        let in_use = self.dataset.as_ref().map_or(0, Footprint::footprint);
        let mut builder = NetworkBuilder::new(self.budget, in_use, self.topologies, inputs);
        for &(outputs, act_fn) in &layers {
            builder.add_layer(outputs, act_fn)?;
        }

        let mut network = builder.build();
        network.init_weights(&mut self.rng, self.config.init)?;

        info!(
            inputs = inputs,
            layers = network.len(),
            slots = network.footprint(),
            capacity = self.budget.capacity();
            "neural network initialized"
        );
        self.network = network;
        Ok(())
    }

    /// Drops the network, the workspace and the dataset.
    pub fn free(&mut self) {
        self.network = Network::empty();
        self.workspace = None;
        self.dataset = None;
        info!("neural network freed");
    }

    /// Draws new random weights and zeroes the offsets.
    pub fn reset(&mut self) -> Result<()> {
        self.require_network()?;
        self.network.init_weights(&mut self.rng, self.config.init)?;
        Ok(())
    }

    /// Zeroes every weight and offset.
    pub fn clear(&mut self) -> Result<()> {
        self.require_network()?;
        self.network.clear_weights();
        Ok(())
    }

    pub fn get_weight(&self, layer: i16, input: i16, output: i16) -> Result<Fraction> {
        let layer = self.layer(layer)?;
        let (inputs, outputs) = layer.dim();
        let i = index("input", input, inputs)?;
        let o = index("output", output, outputs)?;

        Ok(Fraction::approximate(layer.weights()[[o, i]]))
    }

    pub fn set_weight(
        &mut self,
        layer: i16,
        input: i16,
        output: i16,
        num: i16,
        den: i16,
    ) -> Result<()> {
        let layer = self.layer_mut(layer)?;
        let (inputs, outputs) = layer.dim();
        let i = index("input", input, inputs)?;
        let o = index("output", output, outputs)?;
        let value = fraction("weight", num, den)?;

        layer.weights_mut()[[o, i]] = value;
        Ok(())
    }

    /// Reads the weights of a layer, row by row, into `num` and `den`.
    ///
    /// # Returns
    /// The amount of pairs written, the shortest of both slices and the layer's weight count.
    pub fn get_weights(&self, layer: i16, num: &mut [i16], den: &mut [i16]) -> Result<usize> {
        let layer = self.layer(layer)?;
        Ok(write_fractions(layer.weights().iter(), num, den))
    }

    /// Writes the weights of a layer, row by row, from `num` and `den`.
    ///
    /// Pairs with a zero denominator are skipped.
    ///
    /// # Returns
    /// The amount of weights written.
    pub fn set_weights(&mut self, layer: i16, num: &[i16], den: &[i16]) -> Result<usize> {
        let layer = self.layer_mut(layer)?;
        Ok(read_fractions(layer.weights_mut().iter_mut(), num, den))
    }

    pub fn get_offset(&self, layer: i16, offset: i16) -> Result<Fraction> {
        let layer = self.layer(layer)?;
        let o = index("offset", offset, layer.output_count())?;

        Ok(Fraction::approximate(layer.offsets()[o]))
    }

    pub fn set_offset(&mut self, layer: i16, offset: i16, num: i16, den: i16) -> Result<()> {
        let layer = self.layer_mut(layer)?;
        let o = index("offset", offset, layer.output_count())?;
        let value = fraction("offset", num, den)?;

        layer.offsets_mut()[o] = value;
        Ok(())
    }

    pub fn get_offsets(&self, layer: i16, num: &mut [i16], den: &mut [i16]) -> Result<usize> {
        let layer = self.layer(layer)?;
        Ok(write_fractions(layer.offsets().iter(), num, den))
    }

    pub fn set_offsets(&mut self, layer: i16, num: &[i16], den: &[i16]) -> Result<usize> {
        let layer = self.layer_mut(layer)?;
        Ok(read_fractions(layer.offsets_mut().iter_mut(), num, den))
    }

    /// Reads the inputs of the first layer, rounded to the nearest integer.
    ///
    /// # Returns
    /// The amount of values written into `inputs`.
    pub fn get_inputs(&self, inputs: &mut [i16]) -> Result<usize> {
        let first = self.network.layer(0).ok_or(NativeErr::NoNetwork)?;
        Ok(write_rounded(first.input().iter(), inputs))
    }

    pub fn set_inputs(&mut self, inputs: &[i16]) -> Result<usize> {
        let first = self.network.first_mut().ok_or(NativeErr::NoNetwork)?;
        Ok(read_values(first.input_mut().iter_mut(), inputs))
    }

    /// Reads the outputs of the last layer, rounded to the nearest integer.
    ///
    /// # Returns
    /// The amount of values written into `outputs`.
    pub fn get_outputs(&self, outputs: &mut [i16]) -> Result<usize> {
        let last = self.network.last().ok_or(NativeErr::NoNetwork)?;
        Ok(write_rounded(last.output().iter(), outputs))
    }

    /// Writes the outputs of the last layer, the target of the next `backprop`.
    pub fn set_outputs(&mut self, outputs: &[i16]) -> Result<usize> {
        let last = self.network.last_mut().ok_or(NativeErr::NoNetwork)?;
        Ok(read_values(last.output_mut().iter_mut(), outputs))
    }

    pub fn eval(&mut self) -> Result<()> {
        self.network.eval().ok_or(NativeErr::NoNetwork)?;
        Ok(())
    }

    /// Applies the Hebbian rule `w += alpha * input * output` to a single identity layer.
    pub fn reinforce(&mut self, alpha_num: i16, alpha_den: i16) -> Result<()> {
        self.require_network()?;
        self.network.check_hebbian()?;
        let alpha = fraction("learning rate", alpha_num, alpha_den)?;

        self.network.hebbian_step(alpha)?;
        Ok(())
    }

    /// One back-propagation step from the current inputs towards the current outputs.
    ///
    /// # Returns
    /// The loss before the step.
    pub fn backprop(&mut self, eta_num: i16, eta_den: i16) -> Result<f32> {
        self.require_network()?;
        let eta = fraction("learning rate", eta_num, eta_den)?;

        let mut ws = self.take_workspace()?;
        ws.begin();
        let result = ws
            .add_gradients(&mut self.network, &self.loss_fn)
            .and_then(|loss| ws.apply(&mut self.network, eta).map(|_| loss));
        self.workspace = Some(ws);

        let loss = result?;
        debug!(loss = loss; "backprop step done");
        Ok(loss)
    }

    /// Replaces the dataset by an empty one sized after the current network.
    ///
    /// # Arguments
    /// * `max` - The maximum amount of observations, bounded by the configured limit.
    pub fn dataset_init(&mut self, max: i16) -> Result<()> {
        self.require_network()?;
        let capacity = usize::try_from(max)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(NativeErr::InvalidDimension {
                what: "maximum number of observations",
                value: max,
            })?
            .min(self.config.max_observations);

        self.dataset = None;
        let dataset = Dataset::alloc(&self.network, capacity, self.budget, self.in_use())?;
        info!(
            capacity = dataset.capacity(),
            inputs = dataset.x_size(),
            outputs = dataset.y_size();
            "dataset allocated"
        );
        self.dataset = Some(dataset);
        Ok(())
    }

    /// Adds an observation, missing values are zero and extra ones are ignored.
    pub fn dataset_add(&mut self, input: &[i16], output: &[i16]) -> Result<()> {
        let dataset = self.dataset.as_mut().ok_or(NativeErr::NoDataset)?;
        let x: Vec<f32> = input.iter().map(|&v| v as f32).collect();
        let y: Vec<f32> = output.iter().map(|&v| v as f32).collect();

        dataset.add(&x, &y);
        Ok(())
    }

    /// Back-propagation over the whole dataset, `iterations` times.
    ///
    /// # Returns
    /// The mean loss of the last pass, zero when nothing was trained.
    pub fn backprop_dataset(
        &mut self,
        eta_num: i16,
        eta_den: i16,
        iterations: i16,
    ) -> Result<f32> {
        self.require_network()?;
        let dataset = self.dataset.as_ref().ok_or(NativeErr::NoDataset)?;
        let eta = fraction("learning rate", eta_num, eta_den)?;

        if !dataset.fits(&self.network) {
            return Err(NativeErr::DatasetMismatch {
                got: dataset.x_size() + dataset.y_size(),
                expected: self.network.input_count() + self.network.output_count(),
            });
        }

        let Ok(passes) = usize::try_from(iterations) else {
            return Ok(0.);
        };
        if passes == 0 {
            return Ok(0.);
        }

        let mut ws = self.take_workspace()?;
        let result = match &self.dataset {
            Some(dataset) => dataset
                .train(&mut self.network, &mut ws, &self.loss_fn, eta, passes)
                .map_err(NativeErr::from),
            None => Err(NativeErr::NoDataset),
        };
        self.workspace = Some(ws);

        let loss = result?;
        info!(passes = passes, loss = loss; "dataset training done");
        Ok(loss)
    }

    /// Binds the raw arguments of a native call and runs it on the VM variables.
    ///
    /// # Arguments
    /// * `native` - The function to run.
    /// * `raw` - The variable addresses followed by the vector lengths, as pushed by the VM.
    /// * `vars` - The VM variable space.
    ///
    /// # Returns
    /// The error of the call, already logged and recorded in the error register.
    pub fn call(&mut self, native: Native, raw: &[u16], vars: &mut [i16]) -> Result<()> {
        match Call::bind(native, raw, vars.len()) {
            Ok(call) => self.invoke(&call, vars),
            Err(e) => Err(self.fail(native, e.into())),
        }
    }

    /// Like `call`, looking the function up by its VM name.
    ///
    /// # Returns
    /// `None` if no native function has that name.
    pub fn call_by_name(
        &mut self,
        name: &str,
        raw: &[u16],
        vars: &mut [i16],
    ) -> Option<Result<()>> {
        Native::from_name(name).map(|native| self.call(native, raw, vars))
    }

    /// Runs an already bound call on the VM variables.
    pub fn invoke(&mut self, call: &Call, vars: &mut [i16]) -> Result<()> {
        self.execute(call, vars).map_err(|e| self.fail(call.native(), e))
    }

    fn fail(&mut self, native: Native, err: NativeErr) -> NativeErr {
        warn!(native = native.name(); "{err}");
        self.errors.record(&err);
        err
    }

    fn execute(&mut self, call: &Call, vars: &mut [i16]) -> Result<()> {
        match call {
            Call::GetError { error } => vm::write(vars, *error, self.error() as i16)?,
            Call::ResetError => self.reset_error(),
            Call::Init {
                input_count,
                output_counts,
                activations,
            } => {
                let input_count = vm::read(vars, *input_count)?;
                self.init(
                    input_count,
                    vm::slice(vars, output_counts)?,
                    vm::slice(vars, activations)?,
                )?;
            }
            Call::Free => self.free(),
            Call::Reset => self.reset()?,
            Call::Clear => self.clear()?,
            Call::GetWeight {
                layer,
                input,
                output,
                num,
                den,
            } => {
                let fraction = self.get_weight(
                    vm::read(vars, *layer)?,
                    vm::read(vars, *input)?,
                    vm::read(vars, *output)?,
                )?;
                store_fraction(vars, *num, *den, fraction)?;
            }
            Call::SetWeight {
                layer,
                input,
                output,
                num,
                den,
            } => self.set_weight(
                vm::read(vars, *layer)?,
                vm::read(vars, *input)?,
                vm::read(vars, *output)?,
                vm::read(vars, *num)?,
                vm::read(vars, *den)?,
            )?,
            Call::GetWeights { layer, num, den } => {
                let layer = vm::read(vars, *layer)?;
                let (mut n, mut d) = (vec![0; num.len()], vec![0; den.len()]);
                let count = self.get_weights(layer, &mut n, &mut d)?;
                store_vector(vars, num, &n[..count])?;
                store_vector(vars, den, &d[..count])?;
            }
            Call::SetWeights { layer, num, den } => {
                let written = self.set_weights(
                    vm::read(vars, *layer)?,
                    vm::slice(vars, num)?,
                    vm::slice(vars, den)?,
                )?;
                debug!(written = written; "weights set");
            }
            Call::GetOffset {
                layer,
                index,
                num,
                den,
            } => {
                let fraction = self.get_offset(vm::read(vars, *layer)?, vm::read(vars, *index)?)?;
                store_fraction(vars, *num, *den, fraction)?;
            }
            Call::SetOffset {
                layer,
                index,
                num,
                den,
            } => self.set_offset(
                vm::read(vars, *layer)?,
                vm::read(vars, *index)?,
                vm::read(vars, *num)?,
                vm::read(vars, *den)?,
            )?,
            Call::GetOffsets { layer, num, den } => {
                let layer = vm::read(vars, *layer)?;
                let (mut n, mut d) = (vec![0; num.len()], vec![0; den.len()]);
                let count = self.get_offsets(layer, &mut n, &mut d)?;
                store_vector(vars, num, &n[..count])?;
                store_vector(vars, den, &d[..count])?;
            }
            Call::SetOffsets { layer, num, den } => {
                let written = self.set_offsets(
                    vm::read(vars, *layer)?,
                    vm::slice(vars, num)?,
                    vm::slice(vars, den)?,
                )?;
                debug!(written = written; "offsets set");
            }
            Call::GetInputs { inputs } => {
                let mut values = vec![0; inputs.len()];
                let count = self.get_inputs(&mut values)?;
                store_vector(vars, inputs, &values[..count])?;
            }
            Call::SetInputs { inputs } => {
                self.set_inputs(vm::slice(vars, inputs)?)?;
            }
            Call::GetOutputs { outputs } => {
                let mut values = vec![0; outputs.len()];
                let count = self.get_outputs(&mut values)?;
                store_vector(vars, outputs, &values[..count])?;
            }
            Call::SetOutputs { outputs } => {
                self.set_outputs(vm::slice(vars, outputs)?)?;
            }
            Call::Eval => self.eval()?,
            Call::Reinforce {
                alpha_num,
                alpha_den,
            } => self.reinforce(vm::read(vars, *alpha_num)?, vm::read(vars, *alpha_den)?)?,
            Call::Backprop { eta_num, eta_den } => {
                self.backprop(vm::read(vars, *eta_num)?, vm::read(vars, *eta_den)?)?;
            }
            Call::DatasetInit { max } => self.dataset_init(vm::read(vars, *max)?)?,
            Call::DatasetAdd { input, output } => {
                self.dataset_add(vm::slice(vars, input)?, vm::slice(vars, output)?)?
            }
            Call::BackpropDataset {
                eta_num,
                eta_den,
                iterations,
            } => {
                self.backprop_dataset(
                    vm::read(vars, *eta_num)?,
                    vm::read(vars, *eta_den)?,
                    vm::read(vars, *iterations)?,
                )?;
            }
        }

        Ok(())
    }

    fn require_network(&self) -> Result<()> {
        if self.network.is_empty() {
            return Err(NativeErr::NoNetwork);
        }

        Ok(())
    }

    fn layer(&self, layer: i16) -> Result<&Dense> {
        let len = self.network.len();
        self.require_network()?;

        usize::try_from(layer)
            .ok()
            .and_then(|i| self.network.layer(i))
            .ok_or(NativeErr::IndexOutOfRange {
                what: "layer",
                index: layer,
                len,
            })
    }

    fn layer_mut(&mut self, layer: i16) -> Result<&mut Dense> {
        let len = self.network.len();
        self.require_network()?;

        usize::try_from(layer)
            .ok()
            .and_then(|i| self.network.layer_mut(i))
            .ok_or(NativeErr::IndexOutOfRange {
                what: "layer",
                index: layer,
                len,
            })
    }

    /// Hands out a workspace that fits the current network, reallocating a stale one.
    fn take_workspace(&mut self) -> Result<Workspace> {
        match self.workspace.take() {
            Some(ws) if ws.fits(&self.network) => Ok(ws),
            stale => {
                if stale.is_some() {
                    debug!("training workspace is stale, reallocating");
                }

                let ws = Workspace::alloc(&self.network, self.budget, self.in_use())?;
                info!(slots = ws.footprint(); "training workspace allocated");
                Ok(ws)
            }
        }
    }
}

fn dimension(what: &'static str, value: i16) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|&n| n > 0)
        .ok_or(NativeErr::InvalidDimension { what, value })
}

fn index(what: &'static str, index: i16, len: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(NativeErr::IndexOutOfRange { what, index, len })
}

fn fraction(what: &'static str, num: i16, den: i16) -> Result<f32> {
    Fraction::new(num, den)
        .map(|f| f.value())
        .ok_or(NativeErr::ZeroDenominator { what })
}

/// Rounds half away from zero, saturating at the bounds of a VM variable.
fn round(x: f32) -> i16 {
    x.round() as i16
}

fn write_fractions<'a>(
    values: impl Iterator<Item = &'a f32>,
    num: &mut [i16],
    den: &mut [i16],
) -> usize {
    values
        .zip(num.iter_mut().zip(den.iter_mut()))
        .map(|(&x, (n, d))| {
            let fraction = Fraction::approximate(x);
            *n = fraction.num();
            *d = fraction.den();
        })
        .count()
}

fn read_fractions<'a>(
    values: impl Iterator<Item = &'a mut f32>,
    num: &[i16],
    den: &[i16],
) -> usize {
    values
        .zip(num.iter().zip(den))
        .filter_map(|(x, (&n, &d))| Fraction::new(n, d).map(|f| *x = f.value()))
        .count()
}

fn write_rounded<'a>(values: impl Iterator<Item = &'a f32>, out: &mut [i16]) -> usize {
    values
        .zip(out.iter_mut())
        .map(|(&x, v)| *v = round(x))
        .count()
}

fn read_values<'a>(values: impl Iterator<Item = &'a mut f32>, src: &[i16]) -> usize {
    values.zip(src).map(|(x, &v)| *x = v as f32).count()
}

fn store_fraction(vars: &mut [i16], num: usize, den: usize, fraction: Fraction) -> Result<()> {
    vm::write(vars, num, fraction.num())?;
    vm::write(vars, den, fraction.den())?;
    Ok(())
}

fn store_vector(vars: &mut [i16], range: &std::ops::Range<usize>, values: &[i16]) -> Result<()> {
    let range = range.start..range.start + values.len();
    vm::slice_mut(vars, &range)?.copy_from_slice(values);
    Ok(())
}
