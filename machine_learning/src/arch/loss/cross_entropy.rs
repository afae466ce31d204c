use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::LossFn;
use crate::arch::activations::softmax::softmax;

/// Cross-entropy loss over raw scores.
///
/// The targets are one-hot rows; the class of each sample is the arg-max of its row. The scores
/// go through a softmax before the negative log-likelihood is taken, and the loss is averaged
/// over the batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

fn target(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max { (i, v) } else { (best, max) }
        })
        .0
}

impl LossFn for CrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows();
        if n == 0 {
            return 0.;
        }

        let p = softmax(y_pred);
        let total: f32 = p
            .axis_iter(Axis(0))
            .zip(y.axis_iter(Axis(0)))
            .map(|(p, y)| -p[target(y)].max(f32::MIN_POSITIVE).ln())
            .sum();

        total / n as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.nrows().max(1) as f32;
        let mut d = softmax(y_pred);

        for (mut d, y) in d.axis_iter_mut(Axis(0)).zip(y.axis_iter(Axis(0))) {
            d[target(y)] -= 1.;
        }

        d / n
    }
}
