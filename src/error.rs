use std::{error::Error, fmt, io};

use machine_learning::MlErr;
use ndarray::ShapeError;

use crate::device::Device;

/// The classifier module's result type.
pub type Result<T> = std::result::Result<T, ClassifierErr>;

/// Classifier failures.
#[derive(Debug)]
pub enum ClassifierErr {
    UnknownLoss(String),
    MissingInputShape,
    UnknownLayer(String),
    MultiRowInput {
        rows: usize,
    },
    InvalidGradientQuery(&'static str),
    InvalidModel(String),
    InvalidShape {
        what: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    ClassOutOfRange {
        class: usize,
        n_classes: usize,
    },
    EmptyDataset,
    NotTrained,
    IndexOutOfBounds {
        index: usize,
        len: usize,
    },
    DeviceUnavailable(Device),
    Engine(MlErr),
    Shape(ShapeError),
    Io(io::Error),
    Serde(serde_json::Error),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl ClassifierErr {
    /// Returns `true` for the errors caused by a wrong configuration or a malformed request, as
    /// opposed to runtime failures.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ClassifierErr::UnknownLoss(_)
                | ClassifierErr::MissingInputShape
                | ClassifierErr::UnknownLayer(_)
                | ClassifierErr::MultiRowInput { .. }
                | ClassifierErr::InvalidGradientQuery(_)
                | ClassifierErr::InvalidModel(_)
                | ClassifierErr::InvalidShape { .. }
                | ClassifierErr::ClassOutOfRange { .. }
                | ClassifierErr::EmptyDataset
        )
    }
}

impl fmt::Display for ClassifierErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierErr::UnknownLoss(name) => write!(f, "unknown loss function `{name}`"),
            ClassifierErr::MissingInputShape => {
                write!(f, "the input shape is unknown, it must be set before importing a state")
            }
            ClassifierErr::UnknownLayer(name) => write!(f, "no layer named `{name}` in the model"),
            ClassifierErr::MultiRowInput { rows } => {
                write!(f, "gradients are computed on a single sample, got {rows} rows")
            }
            ClassifierErr::InvalidGradientQuery(msg) => write!(f, "invalid gradient query: {msg}"),
            ClassifierErr::InvalidModel(msg) => write!(f, "invalid model: {msg}"),
            ClassifierErr::InvalidShape {
                what,
                got,
                expected,
            } => write!(f, "invalid {what} shape: got {got:?}, expected {expected:?}"),
            ClassifierErr::ClassOutOfRange { class, n_classes } => {
                write!(f, "class {class} is out of range for {n_classes} classes")
            }
            ClassifierErr::EmptyDataset => write!(f, "the training set has no samples"),
            ClassifierErr::NotTrained => {
                write!(f, "the classifier has to be trained or loaded from a state first")
            }
            ClassifierErr::IndexOutOfBounds { index, len } => {
                write!(f, "sample index {index} is out of bounds for {len} samples")
            }
            ClassifierErr::DeviceUnavailable(device) => write!(f, "device {device} is unavailable"),
            ClassifierErr::Engine(e) => write!(f, "model error: {e}"),
            ClassifierErr::Shape(e) => write!(f, "shape error: {e}"),
            ClassifierErr::Io(e) => write!(f, "io error: {e}"),
            ClassifierErr::Serde(e) => write!(f, "serialization error: {e}"),
            ClassifierErr::ThreadPool(e) => write!(f, "thread pool error: {e}"),
        }
    }
}

impl Error for ClassifierErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClassifierErr::Engine(e) => Some(e),
            ClassifierErr::Shape(e) => Some(e),
            ClassifierErr::Io(e) => Some(e),
            ClassifierErr::Serde(e) => Some(e),
            ClassifierErr::ThreadPool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for ClassifierErr {
    fn from(value: MlErr) -> Self {
        match value {
            MlErr::UnknownLayer(name) => Self::UnknownLayer(name),
            other => Self::Engine(other),
        }
    }
}

impl From<ShapeError> for ClassifierErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<io::Error> for ClassifierErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ClassifierErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

impl From<rayon::ThreadPoolBuildError> for ClassifierErr {
    fn from(value: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(value)
    }
}
