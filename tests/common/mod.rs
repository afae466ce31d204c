#![allow(dead_code)]

use std::{
    num::NonZeroUsize,
    sync::{Mutex, Once},
};

use log::{Level, LevelFilter, Log, Metadata, Record};

use ndarray::{Array1, Array2};
use neural_classifier::{
    ActFnSpec, ClassifierConfig, LayerSpec, ModelSpec, NeuralClassifier, data::Dataset,
    schedule::ScheduleSpec,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

pub const CENTERS: [[f32; 2]; 3] = [[-3.0, -3.0], [3.0, -3.0], [0.0, 3.0]];

/// Deterministic, well separated blobs, classes interleaved row by row.
pub fn blobs(per_class: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = per_class * CENTERS.len();

    let y = Array1::from_shape_fn(n, |i| i % CENTERS.len());
    let x = Array2::from_shape_fn((n, 2), |(i, j)| {
        CENTERS[i % CENTERS.len()][j] + rng.random_range(-1.0..1.0)
    });

    Dataset::new(x, y).unwrap()
}

pub fn dense(name: &str, dim: (usize, usize), act_fn: Option<ActFnSpec>) -> LayerSpec {
    LayerSpec::Dense {
        name: name.to_string(),
        dim,
        act_fn,
    }
}

/// `fc1 -> act -> fc2` over the blobs.
pub fn mlp_spec() -> ModelSpec {
    ModelSpec::Sequential {
        layers: vec![
            dense("fc1", (2, 8), None),
            LayerSpec::Activation {
                name: "act".to_string(),
                act_fn: ActFnSpec::Tanh,
            },
            dense("fc2", (8, CENTERS.len()), None),
        ],
    }
}

pub fn linear_spec(n_in: usize, n_out: usize) -> ModelSpec {
    ModelSpec::Sequential {
        layers: vec![dense("fc", (n_in, n_out), None)],
    }
}

pub fn config(epochs: usize) -> ClassifierConfig {
    ClassifierConfig {
        learning_rate: 0.05,
        epochs,
        batch_size: NonZeroUsize::new(10).unwrap(),
        schedule: ScheduleSpec::Constant,
        random_state: Some(7),
        ..Default::default()
    }
}

pub fn trained(epochs: usize) -> (NeuralClassifier, Dataset) {
    let train = blobs(30, 1);
    let mut classifier = NeuralClassifier::new(mlp_spec(), config(epochs)).unwrap();
    classifier.fit(&train, Default::default()).unwrap();

    (classifier, train)
}

pub fn assert_close(got: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(got.len(), expected.len());

    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!((g - e).abs() <= tol, "at {i}: got {g}, expected {e}");
    }
}

/// Keeps the warnings logged by every test of the binary.
struct Recorder {
    warnings: Mutex<Vec<String>>,
}

static RECORDER: Recorder = Recorder {
    warnings: Mutex::new(Vec::new()),
};

impl Log for Recorder {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut warnings = self.warnings.lock().unwrap_or_else(|e| e.into_inner());
            warnings.push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Installs the recording logger, once per test binary.
pub fn record_warnings() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        log::set_logger(&RECORDER).unwrap();
        log::set_max_level(LevelFilter::Warn);
    });
}

/// Whether a warning containing `fragment` was logged. Tests share the logger, so look for
/// messages only the calling test can produce.
pub fn warned(fragment: &str) -> bool {
    RECORDER
        .warnings
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .any(|w| w.contains(fragment))
}
