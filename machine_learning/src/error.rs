use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    LayerDimMismatch {
        layer: String,
        got: usize,
        expected: usize,
    },
    UnknownLayer(String),
    DuplicateLayer(String),
    EmptyModel,
    InvalidInit(String),
    Io(io::Error),
    Json(serde_json::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::LayerDimMismatch {
                layer,
                got,
                expected,
            } => write!(
                f,
                "Layer `{layer}` receives {got} features but the previous layer outputs {expected}"
            ),
            MlErr::UnknownLayer(name) => write!(f, "No layer `{name}` found"),
            MlErr::DuplicateLayer(name) => {
                write!(f, "The layer name `{name}` is used more than once")
            }
            MlErr::EmptyModel => write!(f, "A model needs at least one layer"),
            MlErr::InvalidInit(msg) => write!(f, "Failed to initialize parameters: {msg}"),
            MlErr::Io(e) => write!(f, "io error: {e}"),
            MlErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io(e) => Some(e),
            MlErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
