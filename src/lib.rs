//! A classifier backed by a trainable neural network.
//!
//! `NeuralClassifier` owns the model and the optimizer bound to its parameters. It trains over
//! epochs keeping the most accurate one, exports and imports its full training state, and
//! computes input gradients at any named layer.

pub mod checkpoint;
mod classifier;
pub mod config;
pub mod data;
pub mod device;
mod error;
pub mod loss;
pub mod metrics;
pub mod preprocess;
pub mod schedule;
mod state;

pub use checkpoint::{Checkpoint, OptimizerRecord, Snapshot, TensorRecord};
pub use classifier::{FitOptions, FitReport, GradientQuery, NeuralClassifier};
pub use config::{ClassifierConfig, Hyperparameters};
pub use device::Device;
pub use error::{ClassifierErr, Result};
pub use machine_learning::arch::{ActFnSpec, LayerSpec, ModelSpec};
