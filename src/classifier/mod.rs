mod fit;
mod gradient;
mod inference;

use std::{collections::BTreeMap, sync::Arc};

use log::{debug, warn};
use machine_learning::{
    arch::{ModelSpec, Sequential, layers::ParamKind},
    optimization::Sgd,
};
use ndarray::{Array1, Array2};
use rand::{SeedableRng, rngs::StdRng};

pub use fit::{FitOptions, FitReport};
pub use gradient::GradientQuery;

use crate::{
    ClassifierConfig, ClassifierErr, Device, Hyperparameters, Result,
    checkpoint::{Checkpoint, OptimizerRecord, Snapshot, TensorRecord},
    data::Transform,
    preprocess::Preprocess,
    state::TrainingState,
};

/// A classifier backed by a trainable neural network.
///
/// It owns the model, its parameters and the optimizer bound to them, and keeps the training
/// bookkeeping needed to resume training from an exported `Checkpoint`.
pub struct NeuralClassifier {
    spec: ModelSpec,
    config: ClassifierConfig,
    device: Device,
    model: Sequential,
    state: TrainingState,
    optimizer: Sgd,

    input_shape: Option<Vec<usize>>,
    /// The amount of outputs of the model, known once trained.
    classes: Option<usize>,
    n_features: Option<usize>,

    preprocess: Option<Arc<dyn Preprocess>>,
    train_transform: Option<Transform>,
    shuffle_rng: StdRng,
}

impl NeuralClassifier {
    /// Creates a new `NeuralClassifier`.
    ///
    /// # Arguments
    /// * `spec` - The architecture of the network, every fresh model is built from it.
    /// * `config` - The configuration of the classifier.
    ///
    /// # Returns
    /// An untrained classifier or a configuration error.
    pub fn new(spec: ModelSpec, config: ClassifierConfig) -> Result<Self> {
        let device = config.device.resolve();
        let model = spec
            .build()
            .map_err(|e| ClassifierErr::InvalidModel(e.to_string()))?;

        if model.size() == 0 {
            return Err(ClassifierErr::InvalidModel(
                "the model has no trainable parameters".to_string(),
            ));
        }

        if let Some(shape) = &config.input_shape {
            check_input_shape(&model, shape)?;
        }

        let (params, shuffle_rng) = fresh_params(&model, config.random_state)?;
        let hp = config.hyperparameters();
        let optimizer = Sgd::for_segments(hp.defaults(), hp.regularize_bias, &model.segments());

        Ok(Self {
            input_shape: config.input_shape.clone(),
            spec,
            config,
            device,
            model,
            state: TrainingState::new(params),
            optimizer,
            classes: None,
            n_features: None,
            preprocess: None,
            train_transform: None,
            shuffle_rng,
        })
    }

    /// Sets the preprocessing applied to the input before inference.
    pub fn with_preprocess(mut self, preprocess: Arc<dyn Preprocess>) -> Self {
        self.preprocess = Some(preprocess);
        self
    }

    /// Sets the transform applied to every training sample.
    pub fn with_train_transform(mut self, transform: Transform) -> Self {
        self.train_transform = Some(transform);
        self
    }

    /// Changes the optimizer hyperparameters. The optimizer is always rebuilt, so its momentum
    /// is lost.
    ///
    /// # Arguments
    /// * `hp` - The new hyperparameters.
    ///
    /// # Returns
    /// The reconfigured classifier.
    pub fn reconfigure(mut self, hp: Hyperparameters) -> Self {
        self.config = self.config.with_hyperparameters(hp);
        self.optimizer = self.build_optimizer(hp);
        self
    }

    /// Puts the classifier back into its untrained state, with the parameters drawn again from
    /// the configured seed.
    pub(crate) fn reset(&mut self) -> Result<()> {
        let (params, shuffle_rng) = fresh_params(&self.model, self.config.random_state)?;

        self.state = TrainingState::new(params);
        self.shuffle_rng = shuffle_rng;
        self.optimizer = self.build_optimizer(self.config.hyperparameters());
        self.classes = None;
        self.n_features = None;
        self.input_shape = self.config.input_shape.clone();

        Ok(())
    }

    fn build_optimizer(&self, hp: Hyperparameters) -> Sgd {
        Sgd::for_segments(hp.defaults(), hp.regularize_bias, &self.model.segments())
    }

    /// Exports the training state, its epoch is the one training resumes from.
    pub fn export_state(&self) -> Checkpoint {
        self.checkpoint(self.state.epoch + 1)
    }

    pub(crate) fn checkpoint(&self, epoch: usize) -> Checkpoint {
        let state_dict: BTreeMap<_, _> = self
            .model
            .segments()
            .into_iter()
            .map(|seg| {
                let record = TensorRecord {
                    data: self.state.params[seg.range].to_vec(),
                    shape: seg.shape,
                };
                (seg.name, record)
            })
            .collect();

        Checkpoint {
            state_dict,
            optimizer: OptimizerRecord {
                defaults: Some(self.optimizer.defaults()),
                regularize_bias: Some(self.config.regularize_bias),
                state: self.optimizer.state(),
            },
            epoch,
            acc: self.state.acc,
            best_acc: self.state.best_acc,
            input_shape: self.input_shape.clone(),
        }
    }

    /// Restores an exported training state. Nothing changes if it fails.
    ///
    /// # Arguments
    /// * `checkpoint` - The state to restore.
    ///
    /// # Returns
    /// An error if the input shape is unknown on both sides, or if the state belongs to a
    /// different architecture.
    pub fn import_state(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        let shape = self
            .input_shape
            .clone()
            .or_else(|| checkpoint.input_shape.clone())
            .ok_or(ClassifierErr::MissingInputShape)?;

        check_input_shape(&self.model, &shape)?;
        self.load_checkpoint(checkpoint)?;

        let n_features = shape.iter().product();
        let out = self
            .model
            .clone()
            .forward(&self.state.params, Array2::zeros((2, n_features)).view())?;

        self.classes = Some(out.ncols());
        self.n_features = Some(n_features);
        self.input_shape = Some(shape);

        Ok(())
    }

    /// Loads the parameters, the optimizer and the counters of a checkpoint.
    pub(crate) fn load_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        let segments = self.model.segments();

        if let Some(name) = checkpoint
            .state_dict
            .keys()
            .find(|name| !segments.iter().any(|s| &s.name == *name))
        {
            return Err(ClassifierErr::InvalidModel(format!(
                "unexpected tensor `{name}` in the checkpoint"
            )));
        }

        let mut params = self.state.params.clone();

        for seg in &segments {
            let record = checkpoint.state_dict.get(&seg.name).ok_or_else(|| {
                let msg = format!("tensor `{}` missing in the checkpoint", seg.name);
                ClassifierErr::InvalidModel(msg)
            })?;

            if record.shape != seg.shape || record.data.len() != seg.range.len() {
                return Err(ClassifierErr::InvalidShape {
                    what: "checkpoint tensor",
                    got: record.shape.clone(),
                    expected: seg.shape.clone(),
                });
            }

            params[seg.range.clone()].copy_from_slice(&record.data);
        }

        let mut hp = self.config.hyperparameters();

        match checkpoint.optimizer.defaults {
            Some(defaults) => {
                hp.learning_rate = defaults.learning_rate;
                hp.momentum = defaults.momentum;
                hp.weight_decay = defaults.weight_decay;
            }
            None => warn!("the checkpoint has no optimizer defaults, keeping the current ones"),
        }

        if let Some(regularize_bias) = checkpoint.optimizer.regularize_bias {
            hp.regularize_bias = regularize_bias;
        }

        let mut optimizer = self.build_optimizer(hp);
        optimizer.load_state(&checkpoint.optimizer.state)?;

        self.state.params = params;
        self.state.epoch = checkpoint.epoch;
        self.state.acc = checkpoint.acc;
        self.state.best_acc = checkpoint.best_acc;
        self.optimizer = optimizer;
        self.config = self.config.clone().with_hyperparameters(hp);

        Ok(())
    }

    /// Takes a pure data copy of the classifier. The copy keeps the current epoch.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            spec: self.spec.clone(),
            config: self.config.clone(),
            checkpoint: self.checkpoint(self.state.epoch),
            classes: self.classes,
            n_features: self.n_features,
        }
    }

    /// Rebuilds a classifier out of a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        let mut classifier = Self::new(snapshot.spec.clone(), snapshot.config.clone())?;
        classifier.load_checkpoint(&snapshot.checkpoint)?;

        if let Some(shape) = &snapshot.checkpoint.input_shape {
            check_input_shape(&classifier.model, shape)?;
            classifier.input_shape = Some(shape.clone());
        }

        classifier.classes = snapshot.classes;
        classifier.n_features = snapshot.n_features;

        Ok(classifier)
    }

    /// Deep copies the classifier through a `Snapshot`, sharing the preprocessing and the train
    /// transform.
    pub fn try_clone(&self) -> Result<Self> {
        let mut classifier = Self::from_snapshot(&self.snapshot())?;
        classifier.preprocess = self.preprocess.clone();
        classifier.train_transform = self.train_transform.clone();

        Ok(classifier)
    }

    /// Returns the layer names in declaration order.
    pub fn layer_names(&self) -> &[String] {
        self.model.names()
    }

    /// Returns the weights of every layer, concatenated in declaration order.
    pub fn weights(&self) -> Array1<f32> {
        self.concat_params(ParamKind::Weight)
    }

    /// Returns the biases of every layer, concatenated in declaration order.
    pub fn biases(&self) -> Array1<f32> {
        self.concat_params(ParamKind::Bias)
    }

    fn concat_params(&self, kind: ParamKind) -> Array1<f32> {
        self.model
            .segments()
            .into_iter()
            .filter(|seg| seg.kind == kind)
            .flat_map(|seg| self.state.params[seg.range].to_vec())
            .collect()
    }

    pub fn n_classes(&self) -> Option<usize> {
        self.classes
    }

    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    pub fn is_trained(&self) -> bool {
        self.classes.is_some()
    }

    /// Returns the epoch counter.
    pub fn start_epoch(&self) -> usize {
        self.state.epoch
    }

    pub fn acc(&self) -> f32 {
        self.state.acc
    }

    pub fn best_acc(&self) -> f32 {
        self.state.best_acc
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        self.config.hyperparameters()
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn input_shape(&self) -> Option<&[usize]> {
        self.input_shape.as_deref()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    fn require_trained(&self) -> Result<(usize, usize)> {
        match (self.classes, self.n_features) {
            (Some(classes), Some(n_features)) => Ok((classes, n_features)),
            _ => Err(ClassifierErr::NotTrained),
        }
    }
}

/// Draws the initial parameters and the shuffling stream from the configured seed.
fn fresh_params(model: &Sequential, seed: Option<u64>) -> Result<(Vec<f32>, StdRng)> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let params = model.init_params(&mut rng)?;
    let shuffle_rng = StdRng::from_rng(&mut rng);

    Ok((params, shuffle_rng))
}

fn check_input_shape(model: &Sequential, shape: &[usize]) -> Result<()> {
    let size: usize = shape.iter().product();

    match model.in_features() {
        Some(n) if n != size => Err(ClassifierErr::InvalidShape {
            what: "input",
            got: shape.to_vec(),
            expected: vec![n],
        }),
        _ => {
            debug!("input shape {shape:?}, {size} features");
            Ok(())
        }
    }
}
