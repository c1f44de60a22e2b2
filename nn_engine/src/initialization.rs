use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::Result;

/// How the weights of a layer are drawn when the network is (re)initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightInit {
    /// Uniform in `±sqrt(6 / (fan_in + fan_out))`.
    #[default]
    XavierUniform,
    Uniform {
        low: f32,
        high: f32,
    },
    Constant {
        value: f32,
    },
}

impl WeightInit {
    /// Samples the `fan_in * fan_out` weights of one layer.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to draw from.
    /// * `fan_in` - The number of inputs of the layer.
    /// * `fan_out` - The number of outputs of the layer.
    ///
    /// # Returns
    /// The weights in row-major order, or an error if the distribution is invalid.
    pub fn sample<R: Rng>(&self, rng: &mut R, fan_in: usize, fan_out: usize) -> Result<Vec<f32>> {
        let n = fan_in * fan_out;

        let weights = match *self {
            WeightInit::XavierUniform => {
                let range = xavier_range(fan_in, fan_out);
                draw(rng, Uniform::new(-range, range)?, n)
            }
            WeightInit::Uniform { low, high } => draw(rng, Uniform::new(low, high)?, n),
            WeightInit::Constant { value } => vec![value; n],
        };

        Ok(weights)
    }
}

fn xavier_range(fan_in: usize, fan_out: usize) -> f32 {
    (6. / (fan_in + fan_out).max(1) as f32).sqrt()
}

fn draw<R: Rng, D: Distribution<f32>>(rng: &mut R, distribution: D, n: usize) -> Vec<f32> {
    distribution.sample_iter(rng).take(n).collect()
}
