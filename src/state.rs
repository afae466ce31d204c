/// The training bookkeeping of a classifier. Parameters and gradients are kept flat, the model
/// slices them per layer.
#[derive(Debug, Clone)]
pub struct TrainingState {
    /// The current epoch.
    pub epoch: usize,
    /// The accuracy of the current epoch.
    pub acc: f32,
    pub best_acc: f32,

    pub params: Vec<f32>,
    pub grads: Vec<f32>,
}

impl TrainingState {
    pub fn new(params: Vec<f32>) -> Self {
        let grads = vec![0.0; params.len()];

        Self {
            epoch: 0,
            acc: 0.,
            best_acc: 0.,
            params,
            grads,
        }
    }
}
