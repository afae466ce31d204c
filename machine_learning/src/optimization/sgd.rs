use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::Optimizer;
use crate::{
    MlErr, Result,
    arch::{ParamSegment, layers::ParamKind},
};

/// The hyperparameters every parameter group starts from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SgdDefaults {
    pub learning_rate: f32,
    pub momentum: f32,
    pub weight_decay: f32,
}

impl SgdDefaults {
    pub fn new(learning_rate: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay,
        }
    }
}

/// A set of parameter ranges sharing the same hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGroup {
    ranges: Vec<Range<usize>>,
    learning_rate: f32,
    momentum: f32,
    weight_decay: f32,
}

impl ParamGroup {
    /// Creates a new `ParamGroup`.
    ///
    /// # Arguments
    /// * `ranges` - The ranges of the flat parameter buffer this group updates.
    /// * `defaults` - The hyperparameters of the group.
    pub fn new(ranges: Vec<Range<usize>>, defaults: &SgdDefaults) -> Self {
        Self {
            ranges,
            learning_rate: defaults.learning_rate,
            momentum: defaults.momentum,
            weight_decay: defaults.weight_decay,
        }
    }

    /// Overrides the weight decay of the group.
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    fn len(&self) -> usize {
        self.ranges.iter().map(|r| r.len()).sum()
    }
}

/// The serializable hyperparameters of a group, `params` counts the scalars it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGroupState {
    pub learning_rate: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    pub params: usize,
}

/// The serializable state of an `Sgd` optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SgdState {
    pub param_groups: Vec<ParamGroupState>,
    pub momentum_buffer: Vec<f32>,
}

/// Stochastic gradient descent with momentum and L2 weight decay.
#[derive(Debug, Clone)]
pub struct Sgd {
    defaults: SgdDefaults,
    groups: Vec<ParamGroup>,
    velocity: Box<[f32]>,
}

impl Sgd {
    /// Creates a new `Sgd` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `defaults` - The hyperparameters the optimizer was configured with.
    /// * `groups` - The parameter groups.
    pub fn new(len: usize, defaults: SgdDefaults, groups: Vec<ParamGroup>) -> Self {
        Self {
            defaults,
            groups,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }

    /// Creates an `Sgd` optimizer over the parameters of a model.
    ///
    /// # Arguments
    /// * `defaults` - The hyperparameters of the optimizer.
    /// * `regularize_bias` - Whether biases are subject to weight decay.
    /// * `segments` - The parameter tensors of the model.
    ///
    /// # Returns
    /// A single group over every parameter, or two groups (weights first) when biases are left
    /// out of the weight decay.
    pub fn for_segments(
        defaults: SgdDefaults,
        regularize_bias: bool,
        segments: &[ParamSegment],
    ) -> Self {
        let len = segments.iter().map(|s| s.range.end).max().unwrap_or(0);

        let groups = if regularize_bias || defaults.weight_decay == 0. {
            let ranges = segments.iter().map(|s| s.range.clone()).collect();
            vec![ParamGroup::new(ranges, &defaults)]
        } else {
            let (weights, biases): (Vec<_>, Vec<_>) = segments
                .iter()
                .partition(|s| s.kind == ParamKind::Weight);

            let weights = weights.into_iter().map(|s| s.range.clone()).collect();
            let biases = biases.into_iter().map(|s| s.range.clone()).collect();

            vec![
                ParamGroup::new(weights, &defaults),
                ParamGroup::new(biases, &defaults).with_weight_decay(0.),
            ]
        };

        Self::new(len, defaults, groups)
    }

    /// Returns the hyperparameters the optimizer was configured with.
    pub fn defaults(&self) -> SgdDefaults {
        self.defaults
    }

    /// Sets the learning rate of every group.
    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        for group in &mut self.groups {
            group.learning_rate = learning_rate;
        }
    }

    /// Returns the learning rate of the first group.
    pub fn learning_rate(&self) -> f32 {
        self.groups
            .first()
            .map(|g| g.learning_rate)
            .unwrap_or(self.defaults.learning_rate)
    }

    /// Exports the optimizer's state.
    pub fn state(&self) -> SgdState {
        SgdState {
            param_groups: self
                .groups
                .iter()
                .map(|g| ParamGroupState {
                    learning_rate: g.learning_rate,
                    momentum: g.momentum,
                    weight_decay: g.weight_decay,
                    params: g.len(),
                })
                .collect(),
            momentum_buffer: self.velocity.to_vec(),
        }
    }

    /// Restores a previously exported state.
    ///
    /// # Arguments
    /// * `state` - The state to restore, an empty momentum buffer resets the velocity.
    ///
    /// # Returns
    /// An error if the state doesn't describe the same grouping of parameters.
    pub fn load_state(&mut self, state: &SgdState) -> Result<()> {
        if state.param_groups.len() != self.groups.len() {
            return Err(MlErr::SizeMismatch {
                what: "optimizer parameter groups",
                got: state.param_groups.len(),
                expected: self.groups.len(),
            });
        }

        for (saved, group) in state.param_groups.iter().zip(&self.groups) {
            if saved.params != group.len() {
                return Err(MlErr::SizeMismatch {
                    what: "optimizer parameter group",
                    got: saved.params,
                    expected: group.len(),
                });
            }
        }

        let buffer = &state.momentum_buffer;
        if !buffer.is_empty() && buffer.len() != self.velocity.len() {
            return Err(MlErr::SizeMismatch {
                what: "momentum buffer",
                got: buffer.len(),
                expected: self.velocity.len(),
            });
        }

        for (saved, group) in state.param_groups.iter().zip(&mut self.groups) {
            group.learning_rate = saved.learning_rate;
            group.momentum = saved.momentum;
            group.weight_decay = saved.weight_decay;
        }

        if buffer.is_empty() {
            self.velocity.fill(0.);
        } else {
            self.velocity.copy_from_slice(buffer);
        }

        Ok(())
    }
}

impl Optimizer for Sgd {
    /// Makes a step against the gradient, with weight decay added to it and the velocity
    /// accumulated with `momentum`.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient used for taking the step.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        let len = self.velocity.len();

        for (what, got) in [("parameters", params.len()), ("gradient", grad.len())] {
            if got != len {
                return Err(MlErr::SizeMismatch {
                    what,
                    got,
                    expected: len,
                });
            }
        }

        for group in &self.groups {
            let lr = group.learning_rate;
            let mu = group.momentum;
            let wd = group.weight_decay;

            for range in &group.ranges {
                params[range.clone()]
                    .iter_mut()
                    .zip(&grad[range.clone()])
                    .zip(self.velocity[range.clone()].iter_mut())
                    .for_each(|((w, g), v)| {
                        let g = g + wd * *w;
                        *v = mu * *v + g;
                        *w -= lr * *v;
                    });
            }
        }

        Ok(())
    }
}
