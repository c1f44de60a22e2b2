use serde::{Deserialize, Serialize};

/// The elementwise nonlinearity applied after a layer's affine transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActFn {
    #[default]
    Identity,
    Tanh,
    Sigmoid,
}
use ActFn::*;

impl ActFn {
    /// Maps an integer activation code to an activation function.
    ///
    /// # Arguments
    /// * `code` - `1` for tanh, `2` for sigmoid, anything else for identity.
    ///
    /// # Returns
    /// The matching activation function.
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => Tanh,
            2 => Sigmoid,
            _ => Identity,
        }
    }

    /// The integer code of this activation, the inverse of `from_code`.
    pub fn code(&self) -> i16 {
        match self {
            Identity => 0,
            Tanh => 1,
            Sigmoid => 2,
        }
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            Identity => z,
            Tanh => z.tanh(),
            Sigmoid => 1. / (1. + (-z).exp()),
        }
    }

    /// Derivative with respect to the pre-activation `z`.
    pub fn df(&self, z: f32) -> f32 {
        match self {
            Identity => 1.,
            Tanh => {
                let t = z.tanh();
                1. - t * t
            }
            Sigmoid => {
                let s = self.f(z);
                s * (1. - s)
            }
        }
    }
}
