use std::ops::Range;

use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Activation, Dense};
use crate::{Result, arch::activations::ActFn};

/// Whether a parameter tensor is a weight or a bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Weight,
    Bias,
}

#[derive(Clone, Debug)]
pub enum Layer {
    Dense(Dense),
    Activation(Activation),
}
use Layer::*;

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    pub fn activation(act_fn: ActFn) -> Self {
        Self::Activation(Activation::new(act_fn))
    }

    /// Returns the amount of parameters of the layer.
    pub fn size(&self) -> usize {
        match self {
            Dense(l) => l.size(),
            Activation(_) => 0,
        }
    }

    /// Returns the `(in, out)` features of the layer, if it constrains them.
    pub fn dim(&self) -> Option<(usize, usize)> {
        match self {
            Dense(l) => Some(l.dim()),
            Activation(_) => None,
        }
    }

    /// Describes the parameter tensors of the layer as `(kind, shape, local range)`.
    pub fn segments(&self) -> Vec<(ParamKind, Vec<usize>, Range<usize>)> {
        match self {
            Dense(l) => l
                .segments()
                .into_iter()
                .map(|(kind, shape, start, end)| (kind, shape, start..end))
                .collect(),
            Activation(_) => Vec::new(),
        }
    }

    pub fn init<R: Rng>(&self, rng: &mut R, params: &mut [f32]) -> Result<()> {
        match self {
            Dense(l) => l.init(rng, params),
            Activation(_) => Ok(()),
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Dense(l) => l.forward(params, x),
            Activation(l) => Ok(l.forward(x)),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Dense(l) => l.backward(params, grad, d),
            Activation(l) => l.backward(d),
        }
    }
}
