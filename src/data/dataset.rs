use ndarray::{Array1, Array2};

use crate::{ClassifierErr, Result};

/// A labelled dataset: one flat feature vector per row and one class index per sample.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array1<usize>,
}

impl Dataset {
    /// Creates a new dataset.
    ///
    /// # Arguments
    /// * `x` - The samples, one per row.
    /// * `y` - The class of every sample.
    ///
    /// # Returns
    /// The dataset or an error if the amount of samples and labels differ.
    pub fn new(x: Array2<f32>, y: Array1<usize>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ClassifierErr::InvalidShape {
                what: "labels",
                got: vec![y.len()],
                expected: vec![x.nrows()],
            });
        }

        Ok(Self { x, y })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    #[inline]
    pub fn x(&self) -> &Array2<f32> {
        &self.x
    }

    #[inline]
    pub fn y(&self) -> &Array1<usize> {
        &self.y
    }

    /// Returns the amount of classes, assuming they're numbered from zero.
    pub fn num_classes(&self) -> usize {
        self.y.iter().max().map_or(0, |&c| c + 1)
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.x.ncols()
    }

    /// Returns the labels one-hot encoded over `n_classes` columns.
    ///
    /// # Returns
    /// The binary label matrix or an error if a label doesn't fit.
    pub fn labels_as_binary(&self, n_classes: usize) -> Result<Array2<f32>> {
        let mut binary = Array2::zeros((self.len(), n_classes));

        for (mut row, &class) in binary.rows_mut().into_iter().zip(&self.y) {
            if class >= n_classes {
                return Err(ClassifierErr::ClassOutOfRange { class, n_classes });
            }

            row[class] = 1.;
        }

        Ok(binary)
    }
}
