mod dataset;
mod loader;
mod samples;

pub use dataset::Dataset;
pub use loader::{Batch, DataLoader};
pub use samples::{Labels, SampleSet, Transform};
