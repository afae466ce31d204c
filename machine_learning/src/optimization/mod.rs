mod optimizer;
mod sgd;

pub use optimizer::Optimizer;
pub use sgd::{ParamGroup, ParamGroupState, Sgd, SgdDefaults, SgdState};
