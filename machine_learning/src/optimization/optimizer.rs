use crate::Result;

/// An algorithm that turns a gradient into a parameter update.
pub trait Optimizer {
    /// Applies one update step to `params`.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient used for taking the step.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}
