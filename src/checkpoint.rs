use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use machine_learning::{
    arch::ModelSpec,
    optimization::{SgdDefaults, SgdState},
};
use serde::{Deserialize, Serialize};

use crate::{ClassifierConfig, Result};

/// A named parameter tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorRecord {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// The optimizer's numeric state plus what it was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerRecord {
    #[serde(default)]
    pub defaults: Option<SgdDefaults>,
    #[serde(default)]
    pub regularize_bias: Option<bool>,
    pub state: SgdState,
}

/// The full training state of a classifier, enough to resume training or predict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The model parameters keyed by `<layer>.weight` and `<layer>.bias`.
    pub state_dict: BTreeMap<String, TensorRecord>,
    pub optimizer: OptimizerRecord,
    /// The epoch training resumes from.
    pub epoch: usize,
    #[serde(default)]
    pub acc: f32,
    #[serde(default)]
    pub best_acc: f32,
    #[serde(default)]
    pub input_shape: Option<Vec<usize>>,
}

impl Checkpoint {
    /// Writes the checkpoint to a json file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a checkpoint from a json file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// A pure data copy of a classifier, the only form a classifier is ever cloned through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub spec: ModelSpec,
    pub config: ClassifierConfig,
    pub checkpoint: Checkpoint,
    pub classes: Option<usize>,
    pub n_features: Option<usize>,
}
