mod act_fn;
mod relu;
mod sigmoid;
pub mod softmax;
mod tanh;

pub use act_fn::ActFn;
pub use relu::Relu;
pub use sigmoid::Sigmoid;
pub use tanh::Tanh;
