pub mod activations;
pub mod layers;
pub mod loss;
mod sequential;
mod spec;

pub use sequential::{ParamSegment, Sequential};
pub use spec::{ActFnSpec, LayerSpec, ModelSpec};
