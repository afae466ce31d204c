use std::fmt::Debug;

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::{ClassifierErr, Result};

/// A preprocessing step applied to the raw input before inference and gradients.
pub trait Preprocess: Debug + Send + Sync {
    fn normalize(&self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Back-propagates `grad_out`, the gradient with respect to `normalize(x)`, into the raw
    /// input space.
    ///
    /// # Arguments
    /// * `x` - The raw input the gradient is evaluated at.
    /// * `grad_out` - The gradient with respect to the normalized input.
    ///
    /// # Returns
    /// The gradient with respect to `x`.
    fn gradient(&self, x: ArrayView2<f32>, grad_out: ArrayView2<f32>) -> Result<Array2<f32>>;
}

/// Scales every feature into `[0, 1]` using the range seen while fitting.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min: Array1<f32>,
    range: Array1<f32>,
}

impl MinMaxScaler {
    /// Learns the range of every feature.
    ///
    /// # Arguments
    /// * `x` - The samples, one per row.
    ///
    /// # Returns
    /// The fitted scaler or an error if `x` is empty.
    pub fn fit(x: ArrayView2<f32>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(ClassifierErr::EmptyDataset);
        }

        let min = x.fold_axis(Axis(0), f32::INFINITY, |&acc, &v| acc.min(v));
        let max = x.fold_axis(Axis(0), f32::NEG_INFINITY, |&acc, &v| acc.max(v));
        let range = (&max - &min).mapv(|r| if r > 0. { r } else { 1. });

        Ok(Self { min, range })
    }

    fn check_width(&self, x: ArrayView2<f32>) -> Result<()> {
        if x.ncols() != self.min.len() {
            return Err(ClassifierErr::InvalidShape {
                what: "preprocessor input",
                got: vec![x.nrows(), x.ncols()],
                expected: vec![x.nrows(), self.min.len()],
            });
        }

        Ok(())
    }
}

impl Preprocess for MinMaxScaler {
    fn normalize(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_width(x.view())?;
        Ok((&x - &self.min) / &self.range)
    }

    fn gradient(&self, x: ArrayView2<f32>, grad_out: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_width(x)?;

        if grad_out.dim() != x.dim() {
            return Err(ClassifierErr::InvalidShape {
                what: "preprocessor gradient",
                got: vec![grad_out.nrows(), grad_out.ncols()],
                expected: vec![x.nrows(), x.ncols()],
            });
        }

        Ok(&grad_out / &self.range)
    }
}
