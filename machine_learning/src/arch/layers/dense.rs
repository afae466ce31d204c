use ndarray::prelude::*;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::ParamKind;
use crate::{MlErr, Result, arch::activations::ActFn};

/// A fully connected layer computing `act_fn(x · W + b)`.
///
/// The parameters of the layer live outside of it, in a flat slice laid out as the
/// `(in, out)` weight matrix in row-major order followed by the `out` biases.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of input and output features.
    /// * `act_fn` - An optional activation applied to the affine output.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        let zeros = Array2::zeros((0, 0));

        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: zeros.clone(),
            z: zeros,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the amount of input and output features.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Describes the parameter tensors of this layer relative to its own slice.
    pub fn segments(&self) -> [(ParamKind, Vec<usize>, usize, usize); 2] {
        let w_size = self.size - self.dim.1;

        [
            (ParamKind::Weight, vec![self.dim.0, self.dim.1], 0, w_size),
            (ParamKind::Bias, vec![self.dim.1], w_size, self.size),
        ]
    }

    /// Fills `params` with values drawn from `U(-1/sqrt(in), 1/sqrt(in))`.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to sample with.
    /// * `params` - This layer's parameter slice.
    pub fn init<R: Rng>(&self, rng: &mut R, params: &mut [f32]) -> Result<()> {
        let bound = 1. / (self.dim.0 as f32).sqrt();
        let uniform =
            Uniform::new(-bound, bound).map_err(|e| MlErr::InvalidInit(e.to_string()))?;

        for p in params.iter_mut() {
            *p = uniform.sample(rng);
        }

        Ok(())
    }

    /// Makes a forward pass through the layer, caching what the backward pass needs.
    ///
    /// # Arguments
    /// * `params` - This layer's parameter slice.
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The output of the layer.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense layer input features",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        let z = x.dot(&w) + &b;
        self.x = x.to_owned();

        let a = match &self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        };

        self.z = z;
        Ok(a)
    }

    /// Propagates `d` backwards, accumulating the parameter gradient onto `grad`.
    ///
    /// # Arguments
    /// * `params` - This layer's parameter slice.
    /// * `grad` - This layer's gradient slice.
    /// * `d` - The gradient of the objective with respect to this layer's output.
    ///
    /// # Returns
    /// The gradient of the objective with respect to this layer's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if d.dim() != self.z.dim() {
            return Err(MlErr::SizeMismatch {
                what: "dense layer output gradient",
                got: d.len(),
                expected: self.z.len(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        dw += &self.x.t().dot(&d);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    ///
    /// # Arguments
    /// * `grad` - A gradient slice.
    ///
    /// # Returns
    /// A tuple containing the delta weights and delta biases.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len("dense layer gradient", grad.len())?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(|_| self.mismatch(w_size))?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).map_err(|_| self.mismatch(w_size))?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    ///
    /// # Arguments
    /// * `params` - A slice of parameters.
    ///
    /// # Returns
    /// A tuple containing the weights and biases.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("dense layer parameters", params.len())?;

        let w_size = self.size - self.dim.1;
        let (w_raw, b_raw) = params.split_at(w_size);
        let weights = ArrayView2::from_shape(self.dim, w_raw).map_err(|_| self.mismatch(w_size))?;
        let biases = ArrayView1::from_shape(self.dim.1, b_raw).map_err(|_| self.mismatch(w_size))?;
        Ok((weights, biases))
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected: self.size,
            });
        }

        Ok(())
    }

    fn mismatch(&self, got: usize) -> MlErr {
        MlErr::SizeMismatch {
            what: "dense layer weights",
            got,
            expected: self.dim.0 * self.dim.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    // W = [[1, 2], [3, 4], [5, 6]], b = [0.5, -0.5]
    const PARAMS: [f32; 8] = [1., 2., 3., 4., 5., 6., 0.5, -0.5];

    #[test]
    fn forward_is_affine() {
        let mut dense = Dense::new((3, 2), None);
        let x = array![[1., 0., -1.], [0., 1., 0.]];

        let out = dense.forward(&PARAMS, x.view()).unwrap();

        assert_eq!(out, array![[-3.5, -4.5], [3.5, 3.5]]);
    }

    #[test]
    fn backward_accumulates_grad_and_returns_input_delta() {
        let mut dense = Dense::new((3, 2), None);
        let mut grad = [0.; 8];
        let x = array![[1., 2., 3.]];

        dense.forward(&PARAMS, x.view()).unwrap();
        let d_in = dense.backward(&PARAMS, &mut grad, array![[1., 0.]]).unwrap();

        // Column 0 of W.
        assert_eq!(d_in, array![[1., 3., 5.]]);
        assert_eq!(grad, [1., 0., 2., 0., 3., 0., 1., 0.]);

        dense.forward(&PARAMS, x.view()).unwrap();
        dense.backward(&PARAMS, &mut grad, array![[1., 0.]]).unwrap();
        assert_eq!(grad[0], 2.);
    }

    #[test]
    fn wrong_input_width_fails() {
        let mut dense = Dense::new((3, 2), None);
        let x = array![[1., 2.]];

        assert!(matches!(
            dense.forward(&PARAMS, x.view()),
            Err(MlErr::SizeMismatch { got: 2, expected: 3, .. })
        ));
    }

    #[test]
    fn init_respects_bounds() {
        let dense = Dense::new((4, 3), None);
        let mut params = vec![0.; dense.size()];
        let mut rng = rand::rng();

        dense.init(&mut rng, &mut params).unwrap();

        assert!(params.iter().all(|p| p.abs() <= 0.5));
    }
}
