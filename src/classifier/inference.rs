use log::debug;
use machine_learning::arch::activations::softmax::softmax;
use ndarray::{Array1, Array2, ArrayView2, Axis, concatenate};

use super::NeuralClassifier;
use crate::{
    ClassifierErr, Result,
    data::{DataLoader, SampleSet},
    metrics::argmax_rows,
};

impl NeuralClassifier {
    /// Predicts the class of every row of `x`.
    ///
    /// # Arguments
    /// * `x` - The samples, one per row.
    ///
    /// # Returns
    /// The predicted labels in row order.
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<usize>> {
        let scores = self.scores(x)?;
        Ok(argmax_rows(scores.view()))
    }

    /// Like `predict`, but also returns the score of every class.
    pub fn predict_with_scores(&self, x: ArrayView2<f32>) -> Result<(Array1<usize>, Array2<f32>)> {
        let scores = self.scores(x)?;
        Ok((argmax_rows(scores.view()), scores))
    }

    /// Returns the score of `class` for every row of `x`.
    pub fn decision_function(&self, x: ArrayView2<f32>, class: usize) -> Result<Array1<f32>> {
        let (n_classes, _) = self.require_trained()?;

        if class >= n_classes {
            return Err(ClassifierErr::ClassOutOfRange { class, n_classes });
        }

        Ok(self.scores(x)?.column(class).to_owned())
    }

    /// Returns the output of `layer` for every row of `x`, `None` being the output layer.
    pub fn layer_output(&self, x: ArrayView2<f32>, layer: Option<&str>) -> Result<Array2<f32>> {
        let last = self.model.resolve(layer)?;
        self.forward_batches(x, last)
    }

    fn scores(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let last = self.model.len() - 1;
        let scores = self.forward_batches(x, last)?;

        if self.config.softmax_outputs {
            return Ok(softmax(scores.view()));
        }

        Ok(scores)
    }

    /// Runs `x` through the model up to the layer at `last`, one batch at a time, on a scratch
    /// copy of the model.
    fn forward_batches(&self, x: ArrayView2<f32>, last: usize) -> Result<Array2<f32>> {
        let (_, n_features) = self.require_trained()?;

        if x.ncols() != n_features {
            return Err(ClassifierErr::InvalidShape {
                what: "input",
                got: vec![x.nrows(), x.ncols()],
                expected: vec![x.nrows(), n_features],
            });
        }

        let x = match &self.preprocess {
            Some(preprocess) => preprocess.normalize(x)?,
            None => x.to_owned(),
        };

        let mut model = self.model.clone();

        if x.nrows() == 0 {
            let zeros = Array2::zeros((1, n_features));
            let width = model.forward_to(&self.state.params, zeros.view(), last)?.ncols();
            return Ok(Array2::zeros((0, width)));
        }

        let mut samples = SampleSet::new(x, None)?;
        if let Some(shape) = &self.input_shape {
            samples = samples.with_input_shape(shape)?;
        }

        let loader = DataLoader::new(samples, self.config.batch_size, self.config.workers)?;
        let mut outputs = Vec::new();

        for (i, batch) in loader.batches().enumerate() {
            let batch = batch?;
            let x = self.device.place(batch.x.view())?;

            outputs.push(model.forward_to(&self.state.params, x, last)?);
            debug!("inference batch {}: {} samples", i + 1, batch.len());
        }

        let views: Vec<_> = outputs.iter().map(|out| out.view()).collect();
        Ok(concatenate(Axis(0), &views)?)
    }
}
