use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use super::{Sequential, activations::ActFn, layers::Layer};
use crate::Result;

/// The specification for the `ActFn` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Sigmoid { amp: f32 },
    Relu,
    Tanh,
}

impl From<ActFnSpec> for ActFn {
    fn from(spec: ActFnSpec) -> Self {
        match spec {
            ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
            ActFnSpec::Relu => ActFn::relu(),
            ActFnSpec::Tanh => ActFn::tanh(),
        }
    }
}

/// The specification for the `Layer` enum. Every layer carries the name it is registered under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        name: String,
        dim: (usize, usize),
        act_fn: Option<ActFnSpec>,
    },
    Activation {
        name: String,
        act_fn: ActFnSpec,
    },
}

impl LayerSpec {
    /// Returns the name of the layer.
    pub fn name(&self) -> &str {
        match self {
            LayerSpec::Dense { name, .. } | LayerSpec::Activation { name, .. } => name,
        }
    }

    fn build(&self) -> Layer {
        match *self {
            LayerSpec::Dense { dim, act_fn, .. } => Layer::dense(dim, act_fn.map(ActFn::from)),
            LayerSpec::Activation { act_fn, .. } => Layer::activation(act_fn.into()),
        }
    }
}

/// The specification for a model, it acts as the factory every fresh model is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential { layers: Vec<LayerSpec> },
}

impl ModelSpec {
    /// Builds a fresh model out of this specification.
    ///
    /// # Returns
    /// The model or an error if the layers don't chain together.
    pub fn build(&self) -> Result<Sequential> {
        match self {
            ModelSpec::Sequential { layers } => {
                Sequential::new(layers.iter().map(|l| (l.name(), l.build())))
            }
        }
    }

    /// Reads a specification from a json file.
    ///
    /// # Arguments
    /// * `path` - The path of the file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
