use std::{env, num::NonZeroUsize};

use anyhow::Context;
use log::info;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng, rngs::StdRng};

use neural_classifier::{
    ActFnSpec, ClassifierConfig, FitOptions, LayerSpec, ModelSpec, NeuralClassifier,
    data::Dataset, schedule::ScheduleSpec,
};

const CENTERS: [[f32; 2]; 3] = [[-2.0, -2.0], [2.0, -2.0], [0.0, 2.0]];

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let spec = match env::var("MODEL") {
        Ok(path) => ModelSpec::from_json_file(&path)
            .with_context(|| format!("failed to read the model at {path}"))?,
        Err(_) => default_spec(),
    };

    let config = match env::var("CONFIG") {
        Ok(path) => ClassifierConfig::from_json_file(&path)
            .with_context(|| format!("failed to read the config at {path}"))?,
        Err(_) => default_config(),
    };

    let train = blobs(100, 1)?;
    let test = blobs(50, 2)?;

    let mut classifier = NeuralClassifier::new(spec, config)?;
    let report = classifier.fit(&train, FitOptions::default())?;
    info!(
        "trained {} epochs, kept epoch {:?}",
        report.losses.len(),
        report.best_epoch.map(|e| e + 1)
    );

    let predicted = classifier.predict(test.x().view())?;
    let hits = predicted
        .iter()
        .zip(test.y())
        .filter(|(p, y)| p == y)
        .count();

    println!(
        "train accuracy: {:.2}, test accuracy: {:.2}",
        classifier.best_acc(),
        hits as f32 / test.len() as f32
    );

    if let Ok(path) = env::var("CHECKPOINT") {
        classifier.export_state().save(&path)?;
        info!("checkpoint written to {path}");
    }

    Ok(())
}

fn default_spec() -> ModelSpec {
    ModelSpec::Sequential {
        layers: vec![
            LayerSpec::Dense {
                name: "fc1".to_string(),
                dim: (2, 16),
                act_fn: Some(ActFnSpec::Relu),
            },
            LayerSpec::Dense {
                name: "fc2".to_string(),
                dim: (16, CENTERS.len()),
                act_fn: None,
            },
        ],
    }
}

fn default_config() -> ClassifierConfig {
    ClassifierConfig {
        epochs: 30,
        batch_size: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
        schedule: ScheduleSpec::MultiStep {
            milestones: vec![20, 25],
            gamma: 0.1,
        },
        random_state: Some(42),
        ..Default::default()
    }
}

/// Samples `per_class` points around every center.
fn blobs(per_class: usize, seed: u64) -> neural_classifier::Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = per_class * CENTERS.len();

    let y = Array1::from_shape_fn(n, |i| i % CENTERS.len());
    let x = Array2::from_shape_fn((n, 2), |(i, j)| {
        CENTERS[i % CENTERS.len()][j] + rng.random_range(-1.0..1.0)
    });

    Dataset::new(x, y)
}
