use log::{debug, info, warn};
use machine_learning::arch::loss::LossFn;
use ndarray::Array2;

use super::NeuralClassifier;
use crate::{
    ClassifierErr, Result,
    checkpoint::Checkpoint,
    data::{DataLoader, Dataset, Labels, SampleSet},
    loss::LossKind,
    metrics::{AverageMeter, accuracy},
};

/// How a `fit` call treats the current state of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    /// Continue from the current parameters and epoch instead of starting over.
    pub warm_start: bool,
    /// Keep the parameters of the most accurate epoch instead of the last one.
    pub store_best_params: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            warm_start: false,
            store_best_params: true,
        }
    }
}

/// What happened during a `fit` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitReport {
    /// The average loss of every epoch run.
    pub losses: Vec<f32>,
    /// The training accuracy of every epoch run.
    pub accuracies: Vec<f32>,
    /// The epoch whose parameters the classifier ended up with.
    pub best_epoch: Option<usize>,
}

impl NeuralClassifier {
    /// Trains the classifier on `dataset`.
    ///
    /// Runs the epochs from the current epoch counter up to the configured amount. After every
    /// epoch its training accuracy is compared against the best one, and once done the
    /// classifier keeps the parameters of the best epoch.
    ///
    /// # Arguments
    /// * `dataset` - The training set.
    /// * `options` - Whether to start over and whether to keep the best epoch.
    ///
    /// # Returns
    /// The per epoch losses and accuracies, or the first error found.
    pub fn fit(&mut self, dataset: &Dataset, options: FitOptions) -> Result<FitReport> {
        if dataset.is_empty() {
            return Err(ClassifierErr::EmptyDataset);
        }

        if !options.warm_start {
            self.reset()?;
        }

        let n_features = dataset.num_features();
        let shape = self
            .input_shape
            .clone()
            .unwrap_or_else(|| vec![n_features]);

        super::check_input_shape(&self.model, &shape)?;

        let size: usize = shape.iter().product();
        if size != n_features {
            return Err(ClassifierErr::InvalidShape {
                what: "training samples",
                got: vec![n_features],
                expected: vec![size],
            });
        }

        let n_out = self
            .model
            .clone()
            .forward(&self.state.params, Array2::zeros((1, n_features)).view())?
            .ncols();

        self.input_shape = Some(shape.clone());
        self.classes = Some(n_out);
        self.n_features = Some(n_features);

        if self.preprocess.is_some() {
            warn!("the preprocessor is skipped while training, the train transform is used");
        }

        let epochs = self.config.epochs;
        let start = self.state.epoch;

        if start >= epochs {
            warn!("maximum number of epochs ({epochs}) reached, there's nothing to train");
            return Ok(FitReport::default());
        }

        let loss_fn = self.config.loss.parse::<LossKind>()?.build();
        let labels = Labels::Rows(dataset.labels_as_binary(n_out)?);

        let samples = SampleSet::new(dataset.x().clone(), Some(labels))?
            .with_input_shape(&shape)?
            .with_transform(self.train_transform.clone());

        let mut loader = DataLoader::new(samples, self.config.batch_size, self.config.workers)?;

        self.run_epochs(&mut loader, loss_fn.as_ref(), start, epochs, options)
    }

    fn run_epochs(
        &mut self,
        loader: &mut DataLoader,
        loss_fn: &dyn LossFn,
        start: usize,
        epochs: usize,
        options: FitOptions,
    ) -> Result<FitReport> {
        let schedule = self.config.schedule.build();
        let base_lr = self.optimizer.defaults().learning_rate;
        let entry = self.export_state();

        let mut report = FitReport::default();
        let mut best: Option<(usize, Checkpoint)> = None;

        for epoch in start..epochs {
            self.state.epoch = epoch;

            self.optimizer.set_learning_rate(base_lr * schedule.factor(epoch));
            info!(
                "epoch [{}|{epochs}] started, learning rate {}",
                epoch + 1,
                self.optimizer.learning_rate()
            );

            loader.shuffle(&mut self.shuffle_rng);

            let mut losses = AverageMeter::default();
            let mut acc = AverageMeter::default();

            for (i, batch) in loader.batches().enumerate() {
                let batch = batch?;
                let x = self.device.place(batch.x.view())?;

                let (loss, out) = self.model.train_batch(
                    &mut self.state.params,
                    &mut self.state.grads,
                    loss_fn,
                    &mut self.optimizer,
                    x,
                    batch.y.view(),
                )?;

                losses.update(loss, batch.len());
                acc.update(accuracy(out.view(), batch.y.view()), batch.len());

                debug!(
                    "epoch {}, batch {}: {} samples seen, loss {:.4}, accuracy {:.2}",
                    epoch + 1,
                    i + 1,
                    losses.count(),
                    losses.avg(),
                    acc.avg()
                );
            }

            self.state.acc = acc.avg();
            report.losses.push(losses.avg());
            report.accuracies.push(self.state.acc);

            info!(
                "epoch [{}|{epochs}] finished: loss {:.4}, accuracy {:.2}",
                epoch + 1,
                losses.avg(),
                self.state.acc
            );

            // Ties keep the first epoch that reached the best accuracy.
            let improved = self.state.acc > self.state.best_acc
                || (self.state.acc == self.state.best_acc && best.is_none());

            if !options.store_best_params || improved {
                self.state.best_acc = self.state.acc;
                best = Some((epoch, self.export_state()));
            }
        }

        match best {
            Some((epoch, checkpoint)) => {
                if options.store_best_params {
                    info!(
                        "best accuracy {:.2} obtained on epoch {}",
                        self.state.best_acc,
                        epoch + 1
                    );
                }

                self.load_checkpoint(&checkpoint)?;
                report.best_epoch = Some(epoch);
            }
            None => {
                info!(
                    "no epoch reached the best accuracy {:.2}, keeping the previous parameters",
                    self.state.best_acc
                );
                self.load_checkpoint(&entry)?;
            }
        }

        Ok(report)
    }
}
