use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

/// Keeps the running average of a per-sample quantity.
#[derive(Debug, Default, Clone, Copy)]
pub struct AverageMeter {
    sum: f64,
    count: usize,
}

impl AverageMeter {
    /// Adds `val`, the average over `n` samples.
    #[inline]
    pub fn update(&mut self, val: f32, n: usize) {
        self.sum += val as f64 * n as f64;
        self.count += n;
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn avg(&self) -> f32 {
        if self.count == 0 {
            return 0.;
        }

        (self.sum / self.count as f64) as f32
    }
}

/// Returns the index of the greatest element, the first one on ties.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max { (i, v) } else { (best, max) }
        })
        .0
}

/// Returns the arg-max of every row.
pub fn argmax_rows(x: ArrayView2<f32>) -> Array1<usize> {
    x.map_axis(Axis(1), argmax)
}

/// Computes the fraction of rows whose highest score matches the highest target.
///
/// # Arguments
/// * `scores` - The model's output.
/// * `targets` - The one-hot encoded labels.
pub fn accuracy(scores: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
    let n = scores.nrows();
    if n == 0 {
        return 0.;
    }

    let hits = argmax_rows(scores)
        .iter()
        .zip(argmax_rows(targets).iter())
        .filter(|(p, t)| p == t)
        .count();

    hits as f32 / n as f32
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn meter_weights_by_sample_count() {
        let mut meter = AverageMeter::default();
        assert_eq!(meter.avg(), 0.);

        meter.update(1., 3);
        meter.update(0., 1);

        assert_eq!(meter.count(), 4);
        assert_eq!(meter.avg(), 0.75);
    }

    #[test]
    fn accuracy_compares_arg_max() {
        let scores = array![[0.1, 0.9], [0.8, 0.2], [0.3, 0.7], [0.6, 0.4]];
        let targets = array![[0., 1.], [1., 0.], [1., 0.], [1., 0.]];

        assert_eq!(accuracy(scores.view(), targets.view()), 0.75);
    }

    #[test]
    fn argmax_prefers_the_first_tie() {
        assert_eq!(argmax(array![1., 3., 3.].view()), 1);
        assert_eq!(argmax_rows(array![[0., 0.], [0., 1.]].view()), array![0, 1]);
    }
}
