use std::num::NonZeroUsize;

use log::debug;
use ndarray::{Array1, Array2, ArrayD};
use rand::{Rng, seq::SliceRandom};
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use super::SampleSet;
use crate::{ClassifierErr, Result};

/// A batch of samples, flattened back to one row per sample, and their labels.
#[derive(Debug, Clone)]
pub struct Batch {
    pub x: Array2<f32>,
    pub y: Array2<f32>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }
}

/// Groups the samples of a `SampleSet` into batches. Samples keep their order unless shuffled,
/// and with more than one worker each batch is prepared on a dedicated thread pool.
pub struct DataLoader {
    samples: SampleSet,
    batch_size: usize,
    order: Vec<usize>,
    pool: Option<ThreadPool>,
}

impl DataLoader {
    /// Creates a new `DataLoader`.
    ///
    /// # Arguments
    /// * `samples` - The samples to batch.
    /// * `batch_size` - The amount of samples per batch, the last one may be shorter.
    /// * `workers` - The amount of threads preparing the samples of a batch.
    pub fn new(
        samples: SampleSet,
        batch_size: NonZeroUsize,
        workers: NonZeroUsize,
    ) -> Result<Self> {
        let pool = match workers.get() {
            1 => None,
            n => {
                debug!("preparing batches with {n} threads");
                Some(ThreadPoolBuilder::new().num_threads(n).build()?)
            }
        };

        Ok(Self {
            order: (0..samples.len()).collect(),
            samples,
            batch_size: batch_size.get(),
            pool,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Shuffles the order in which samples are visited.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    /// Returns an iterator over the batches of the current order.
    pub fn batches(&self) -> impl Iterator<Item = Result<Batch>> + '_ {
        self.order
            .chunks(self.batch_size)
            .map(|indices| self.load(indices))
    }

    fn load(&self, indices: &[usize]) -> Result<Batch> {
        let pairs: Vec<(ArrayD<f32>, Array1<f32>)> = match &self.pool {
            Some(pool) => pool.install(|| {
                indices
                    .par_iter()
                    .map(|&i| self.samples.get(i))
                    .collect::<Result<_>>()
            })?,
            None => indices
                .iter()
                .map(|&i| self.samples.get(i))
                .collect::<Result<_>>()?,
        };

        let x = stack(pairs.iter().map(|(x, _)| x.iter().copied().collect()), "sample")?;
        let y = stack(pairs.iter().map(|(_, y)| y.to_vec()), "label")?;

        Ok(Batch { x, y })
    }
}

/// Stacks flat rows of equal width into a matrix.
fn stack<I>(rows: I, what: &'static str) -> Result<Array2<f32>>
where
    I: ExactSizeIterator<Item = Vec<f32>>,
{
    let n = rows.len();
    let mut width = None;
    let mut data = Vec::new();

    for row in rows {
        let expected = *width.get_or_insert(row.len());

        if row.len() != expected {
            return Err(ClassifierErr::InvalidShape {
                what,
                got: vec![row.len()],
                expected: vec![expected],
            });
        }

        data.extend(row);
    }

    Ok(Array2::from_shape_vec((n, width.unwrap_or(0)), data)?)
}
