//! Row-wise softmax and its local derivative.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Applies the softmax function to every row of `x`.
///
/// The maximum of each row is subtracted before exponentiating so large scores do not overflow.
///
/// # Arguments
/// * `x` - A matrix of scores, one sample per row.
///
/// # Returns
/// A matrix of the same shape whose rows sum up to one.
pub fn softmax(x: ArrayView2<f32>) -> Array2<f32> {
    let mut out = x.to_owned();

    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }

    out
}

/// Computes the row `pos` of the softmax Jacobian evaluated at `x`.
///
/// Entry `j` is the derivative of the `pos`-th softmax output with respect to the `j`-th score,
/// that is `s[pos] * (δ(pos, j) - s[j])`.
///
/// # Arguments
/// * `x` - The scores of a single sample.
/// * `pos` - The output whose derivative is requested.
///
/// # Returns
/// The Jacobian row, or `None` if `pos` is out of bounds.
pub fn softmax_gradient(x: ArrayView1<f32>, pos: usize) -> Option<Array1<f32>> {
    if pos >= x.len() {
        return None;
    }

    let s = softmax(x.insert_axis(Axis(0))).remove_axis(Axis(0));
    let s_pos = s[pos];

    let grad = s
        .iter()
        .enumerate()
        .map(|(j, &s_j)| {
            let delta = if j == pos { 1. } else { 0. };
            s_pos * (delta - s_j)
        })
        .collect();

    Some(grad)
}
