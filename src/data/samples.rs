use std::{fmt, sync::Arc};

use ndarray::{Array1, Array2, ArrayD, IxDyn, array};

use crate::{ClassifierErr, Result};

/// A per-sample transform, it receives the sample already reshaped to the input shape.
pub type Transform = Arc<dyn Fn(ArrayD<f32>) -> ArrayD<f32> + Send + Sync>;

/// The label placeholder emitted for unlabelled samples.
pub const NO_LABEL: f32 = -1.;

/// The two label layouts a `SampleSet` accepts.
#[derive(Debug, Clone)]
pub enum Labels {
    /// One class index per sample.
    Flat(Array1<usize>),
    /// One row per sample, usually one-hot encoded.
    Rows(Array2<f32>),
}

impl Labels {
    fn len(&self) -> usize {
        match self {
            Labels::Flat(y) => y.len(),
            Labels::Rows(y) => y.nrows(),
        }
    }
}

/// Turns a feature matrix and its optional labels into `(sample, label)` pairs.
#[derive(Clone)]
pub struct SampleSet {
    x: Array2<f32>,
    labels: Option<Labels>,
    input_shape: Option<Vec<usize>>,
    transform: Option<Transform>,
}

impl SampleSet {
    /// Creates a new `SampleSet`.
    ///
    /// # Arguments
    /// * `x` - The samples, one flat feature vector per row.
    /// * `labels` - The labels of the samples, if any.
    ///
    /// # Returns
    /// The sample set or an error if the amount of labels doesn't match the amount of samples.
    pub fn new(x: Array2<f32>, labels: Option<Labels>) -> Result<Self> {
        if let Some(labels) = &labels {
            if labels.len() != x.nrows() {
                return Err(ClassifierErr::InvalidShape {
                    what: "labels",
                    got: vec![labels.len()],
                    expected: vec![x.nrows()],
                });
            }
        }

        Ok(Self {
            x,
            labels,
            input_shape: None,
            transform: None,
        })
    }

    /// Reshapes every sample to `shape` before transforming it.
    ///
    /// # Returns
    /// An error if `shape` doesn't hold exactly one sample's features.
    pub fn with_input_shape(mut self, shape: &[usize]) -> Result<Self> {
        let size: usize = shape.iter().product();

        if size != self.x.ncols() {
            return Err(ClassifierErr::InvalidShape {
                what: "input",
                got: shape.to_vec(),
                expected: vec![self.x.ncols()],
            });
        }

        self.input_shape = Some(shape.to_vec());
        Ok(self)
    }

    pub fn with_transform(mut self, transform: Option<Transform>) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    /// Returns the sample at `index` and its label, `[NO_LABEL]` when there are no labels.
    pub fn get(&self, index: usize) -> Result<(ArrayD<f32>, Array1<f32>)> {
        if index >= self.len() {
            return Err(ClassifierErr::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }

        let mut sample = self.x.row(index).to_owned().into_dyn();

        if let Some(shape) = &self.input_shape {
            sample = sample.into_shape_with_order(IxDyn(shape))?;
        }

        if let Some(transform) = &self.transform {
            sample = transform(sample);
        }

        let label = match &self.labels {
            Some(Labels::Flat(y)) => array![y[index] as f32],
            Some(Labels::Rows(y)) => y.row(index).to_owned(),
            None => array![NO_LABEL],
        };

        Ok((sample, label))
    }
}

impl fmt::Debug for SampleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleSet")
            .field("len", &self.len())
            .field("labels", &self.labels.is_some())
            .field("input_shape", &self.input_shape)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}
