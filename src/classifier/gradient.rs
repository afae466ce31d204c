use log::warn;
use machine_learning::arch::activations::softmax::softmax_gradient;
use ndarray::{Array1, ArrayView2, Axis};

use super::NeuralClassifier;
use crate::{ClassifierErr, Result};

/// Describes which gradient `NeuralClassifier::gradient` computes.
///
/// At the output layer the gradient is the one of the raw score of `class_index`, unless a
/// `direction` over the outputs is given. Inner layers always need a `direction`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientQuery {
    class_index: Option<usize>,
    direction: Option<Array1<f32>>,
    layer: Option<String>,
}

impl GradientQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// The gradient of the score of `class`.
    pub fn class(class: usize) -> Self {
        Self::new().with_class(class)
    }

    pub fn with_class(mut self, class: usize) -> Self {
        self.class_index = Some(class);
        self
    }

    /// Back-propagates `direction` instead of a one-hot vector.
    pub fn with_direction<D: Into<Array1<f32>>>(mut self, direction: D) -> Self {
        self.direction = Some(direction.into());
        self
    }

    /// Stops the forward pass at `layer` and starts the backward one there.
    pub fn at_layer<S: Into<String>>(mut self, layer: S) -> Self {
        self.layer = Some(layer.into());
        self
    }
}

impl NeuralClassifier {
    /// Computes the gradient of a direction over a layer's output with respect to the input.
    ///
    /// The input goes through the preprocessor first, if any, and the gradient is chained
    /// through it, so it is taken with respect to the same raw input `decision_function` sees.
    ///
    /// # Arguments
    /// * `x` - A single sample, as a one row matrix.
    /// * `query` - The layer and the seed of the backward pass.
    ///
    /// # Returns
    /// The gradient, one value per input feature.
    pub fn gradient(&self, x: ArrayView2<f32>, query: &GradientQuery) -> Result<Array1<f32>> {
        let (_, n_features) = self.require_trained()?;

        if x.nrows() != 1 {
            return Err(ClassifierErr::MultiRowInput { rows: x.nrows() });
        }

        if x.ncols() != n_features {
            return Err(ClassifierErr::InvalidShape {
                what: "input",
                got: vec![x.nrows(), x.ncols()],
                expected: vec![1, n_features],
            });
        }

        let last = self.model.resolve(query.layer.as_deref())?;
        let at_output = query.layer.is_none();
        let through_softmax = at_output && self.config.softmax_outputs;

        let x = self.device.place(x)?;
        let normalized = match &self.preprocess {
            Some(preprocess) => Some(preprocess.normalize(x)?),
            None => None,
        };

        let mut model = self.model.clone();
        let input = normalized.as_ref().map_or(x, |n| n.view());
        let out = model.forward_to(&self.state.params, input, last)?;
        let width = out.ncols();

        let mut seed = match &query.direction {
            Some(direction) => {
                if direction.len() != width {
                    return Err(ClassifierErr::InvalidShape {
                        what: "direction",
                        got: vec![direction.len()],
                        expected: vec![width],
                    });
                }

                if query.class_index.is_some() && !through_softmax {
                    warn!("the class index is ignored when a direction is given");
                }

                direction.clone()
            }
            None if !at_output => {
                return Err(ClassifierErr::InvalidGradientQuery(
                    "a direction is required below the output layer",
                ));
            }
            None => {
                let class = query.class_index.ok_or(ClassifierErr::InvalidGradientQuery(
                    "either a class index or a direction is required",
                ))?;

                let mut one_hot = Array1::<f32>::zeros(width);
                *one_hot.get_mut(class).ok_or(ClassifierErr::ClassOutOfRange {
                    class,
                    n_classes: width,
                })? = 1.;
                one_hot
            }
        };

        if through_softmax {
            let class = query.class_index.ok_or(ClassifierErr::InvalidGradientQuery(
                "softmax outputs need a class index to pick the jacobian row",
            ))?;

            seed *= &softmax_gradient(out.row(0), class).ok_or(ClassifierErr::ClassOutOfRange {
                class,
                n_classes: width,
            })?;
        }

        let mut grad = vec![0.; model.size()];
        let seed = seed.insert_axis(Axis(0));
        let mut d = model.backward_from(&self.state.params, &mut grad, seed, last)?;

        if let Some(preprocess) = &self.preprocess {
            d = preprocess.gradient(x, d.view())?;
        }

        Ok(d.row(0).to_owned())
    }
}
