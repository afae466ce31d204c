use std::{collections::HashMap, ops::Range};

use log::debug;
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{
    layers::{Layer, ParamKind},
    loss::LossFn,
};
use crate::{MlErr, Result, optimization::Optimizer};

/// A named parameter tensor inside the flat parameter buffer of a `Sequential`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSegment {
    /// `<layer>.weight` or `<layer>.bias`.
    pub name: String,
    pub kind: ParamKind,
    pub shape: Vec<usize>,
    pub range: Range<usize>,
}

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// Layers are registered under a unique name in declaration order, so any of them can be used
/// as the point where a forward pass stops or a backward pass starts.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
    names: Vec<String>,
    index: HashMap<String, usize>,
    offsets: Vec<usize>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The named layers the sequential is composed of, in order.
    ///
    /// # Returns
    /// A new `Sequential` instance, or an error if there are no layers, a name is repeated or two
    /// consecutive layers disagree on the amount of features.
    pub fn new<I, S>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Layer)>,
        S: Into<String>,
    {
        let mut names = Vec::new();
        let mut registry = Vec::new();
        let mut index = HashMap::new();
        let mut offsets = Vec::new();
        let mut offset = 0;
        let mut width: Option<usize> = None;

        for (i, (name, layer)) in layers.into_iter().enumerate() {
            let name = name.into();

            if index.insert(name.clone(), i).is_some() {
                return Err(MlErr::DuplicateLayer(name));
            }

            if let Some((fan_in, fan_out)) = layer.dim() {
                if let Some(expected) = width.filter(|&w| w != fan_in) {
                    return Err(MlErr::LayerDimMismatch {
                        layer: name,
                        got: fan_in,
                        expected,
                    });
                }

                width = Some(fan_out);
            }

            offsets.push(offset);
            offset += layer.size();
            names.push(name);
            registry.push(layer);
        }

        if registry.is_empty() {
            return Err(MlErr::EmptyModel);
        }

        debug!("built a sequential of {} layers and {offset} parameters", registry.len());

        Ok(Self {
            layers: registry,
            names,
            index,
            offsets,
        })
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    /// Returns the amount of layers in the model.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the layer names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the amount of features the first constrained layer expects.
    pub fn in_features(&self) -> Option<usize> {
        self.layers.iter().find_map(|l| l.dim()).map(|(fan_in, _)| fan_in)
    }

    /// Resolves a layer reference into its position.
    ///
    /// # Arguments
    /// * `name` - The layer name, `None` stands for the output layer.
    ///
    /// # Returns
    /// The index of the layer or an error if no layer has that name.
    pub fn resolve(&self, name: Option<&str>) -> Result<usize> {
        match name {
            None => Ok(self.layers.len() - 1),
            Some(name) => self
                .index
                .get(name)
                .copied()
                .ok_or_else(|| MlErr::UnknownLayer(name.to_string())),
        }
    }

    /// Enumerates the named parameter tensors of the model, in buffer order.
    pub fn segments(&self) -> Vec<ParamSegment> {
        self.layers
            .iter()
            .zip(&self.names)
            .zip(&self.offsets)
            .flat_map(|((layer, name), &offset)| {
                layer.segments().into_iter().map(move |(kind, shape, range)| {
                    let suffix = match kind {
                        ParamKind::Weight => "weight",
                        ParamKind::Bias => "bias",
                    };

                    ParamSegment {
                        name: format!("{name}.{suffix}"),
                        kind,
                        shape,
                        range: offset + range.start..offset + range.end,
                    }
                })
            })
            .collect()
    }

    /// Draws a fresh set of parameters for the model.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to sample with.
    ///
    /// # Returns
    /// The flat parameter buffer.
    pub fn init_params<R: Rng>(&self, rng: &mut R) -> Result<Vec<f32>> {
        let mut params = vec![0.; self.size()];

        for (layer, &offset) in self.layers.iter().zip(&self.offsets) {
            layer.init(rng, &mut params[offset..offset + layer.size()])?;
        }

        Ok(params)
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let last = self.layers.len() - 1;
        self.forward_to(params, x, last)
    }

    /// Makes a forward pass that stops right after the layer at `last`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input data.
    /// * `last` - The index of the last layer to go through.
    ///
    /// # Returns
    /// The output of the layer at `last`.
    pub fn forward_to(
        &mut self,
        params: &[f32],
        x: ArrayView2<f32>,
        last: usize,
    ) -> Result<Array2<f32>> {
        self.check_params(params.len())?;
        self.check_layer(last)?;

        let mut a = x.to_owned();

        for (layer, &offset) in self.layers[..=last].iter_mut().zip(&self.offsets) {
            let size = layer.size();
            a = layer.forward(&params[offset..offset + size], a.view())?;
        }

        Ok(a)
    }

    /// Propagates `d` from the output layer down to the input.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - The buffer the parameter gradient is accumulated onto.
    /// * `d` - The gradient of the objective with respect to the model's output.
    ///
    /// # Returns
    /// The gradient of the objective with respect to the model's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let last = self.layers.len() - 1;
        self.backward_from(params, grad, d, last)
    }

    /// Propagates `d` from the layer at `last` down to the input. The layers up to `last` must
    /// have gone through `forward_to` beforehand.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - The buffer the parameter gradient is accumulated onto.
    /// * `d` - The gradient of the objective with respect to the output of the layer at `last`.
    /// * `last` - The index of the layer the backward pass starts at.
    ///
    /// # Returns
    /// The gradient of the objective with respect to the model's input.
    pub fn backward_from(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
        last: usize,
    ) -> Result<Array2<f32>> {
        self.check_params(params.len())?;
        self.check_params(grad.len())?;
        self.check_layer(last)?;

        for (layer, &offset) in self.layers[..=last]
            .iter_mut()
            .zip(&self.offsets[..=last])
            .rev()
        {
            let range = offset..offset + layer.size();
            d = layer.backward(&params[range.clone()], &mut grad[range], d)?;
        }

        Ok(d)
    }

    /// Runs one optimization step over a single batch: zeroes the gradient, computes the loss,
    /// back-propagates it and lets the optimizer update **`params`**.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer for writing the computed gradient.
    /// * `loss_fn` - The loss function.
    /// * `optimizer` - The optimizer that dictates how to update the parameters.
    /// * `x` - The batch samples.
    /// * `y` - The batch targets.
    ///
    /// # Returns
    /// The batch loss and the model output computed before the update.
    pub fn train_batch<L, O>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut O,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
    ) -> Result<(f32, Array2<f32>)>
    where
        L: LossFn + ?Sized,
        O: Optimizer + ?Sized,
    {
        let y_pred = self.forward(params, x)?;

        if y_pred.dim() != y.dim() {
            return Err(MlErr::SizeMismatch {
                what: "batch targets",
                got: y.len(),
                expected: y_pred.len(),
            });
        }

        let loss = loss_fn.loss(y_pred.view(), y);
        let d_last = loss_fn.loss_prime(y_pred.view(), y);

        grad.fill(0.);
        self.backward(params, grad, d_last)?;
        optimizer.update_params(params, grad)?;

        Ok((loss, y_pred))
    }

    fn check_params(&self, got: usize) -> Result<()> {
        let expected = self.size();

        if got != expected {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got,
                expected,
            });
        }

        Ok(())
    }

    fn check_layer(&self, idx: usize) -> Result<()> {
        if idx >= self.layers.len() {
            return Err(MlErr::SizeMismatch {
                what: "layers",
                got: idx + 1,
                expected: self.layers.len(),
            });
        }

        Ok(())
    }
}
