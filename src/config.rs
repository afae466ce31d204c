use std::{fs, num::NonZeroUsize, path::Path};

use machine_learning::optimization::SgdDefaults;
use serde::{Deserialize, Serialize};

use crate::{Result, device::Device, schedule::ScheduleSpec};

/// The optimizer hyperparameters of a classifier, changing any of them rebuilds the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub learning_rate: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    pub regularize_bias: bool,
}

impl Hyperparameters {
    /// Returns the optimizer defaults these hyperparameters describe.
    pub fn defaults(&self) -> SgdDefaults {
        SgdDefaults::new(self.learning_rate, self.momentum, self.weight_decay)
    }
}

/// The configuration of a `NeuralClassifier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub learning_rate: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    /// Either `cross-entropy` or `mse`.
    pub loss: String,
    pub epochs: usize,
    pub schedule: ScheduleSpec,
    pub batch_size: NonZeroUsize,
    /// Whether biases are subject to weight decay.
    pub regularize_bias: bool,
    /// The shape every flat sample is reshaped to before the train transform.
    pub input_shape: Option<Vec<usize>>,
    /// Whether the scores go through a softmax.
    pub softmax_outputs: bool,
    pub random_state: Option<u64>,
    /// The amount of threads preparing the samples of a batch.
    pub workers: NonZeroUsize,
    pub device: Device,
}

impl ClassifierConfig {
    /// Reads a configuration from a json file, missing fields take their default value.
    ///
    /// # Arguments
    /// * `path` - The path of the file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            weight_decay: self.weight_decay,
            regularize_bias: self.regularize_bias,
        }
    }

    /// Returns a copy of this configuration with the given hyperparameters.
    pub fn with_hyperparameters(mut self, hp: Hyperparameters) -> Self {
        self.learning_rate = hp.learning_rate;
        self.momentum = hp.momentum;
        self.weight_decay = hp.weight_decay;
        self.regularize_bias = hp.regularize_bias;
        self
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-2,
            momentum: 0.9,
            weight_decay: 1e-4,
            loss: "cross-entropy".to_string(),
            epochs: 100,
            schedule: ScheduleSpec::default(),
            batch_size: NonZeroUsize::MIN,
            regularize_bias: true,
            input_shape: None,
            softmax_outputs: false,
            random_state: None,
            workers: NonZeroUsize::MIN,
            device: Device::Cpu,
        }
    }
}
