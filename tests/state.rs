mod common;

use common::{blobs, config, mlp_spec, record_warnings, trained, warned};
use neural_classifier::{
    Checkpoint, ClassifierErr, FitOptions, Hyperparameters, NeuralClassifier,
};

#[test]
fn imported_state_predicts_the_same() {
    let (a, _) = trained(5);
    let test = blobs(20, 2);

    let raw = serde_json::to_string(&a.export_state()).unwrap();
    let checkpoint: Checkpoint = serde_json::from_str(&raw).unwrap();

    let mut b = NeuralClassifier::new(mlp_spec(), config(5)).unwrap();
    b.import_state(&checkpoint).unwrap();

    assert_eq!(b.predict(test.x().view()).unwrap(), a.predict(test.x().view()).unwrap());
    assert_eq!(b.start_epoch(), a.start_epoch() + 1);
    assert_eq!(b.weights(), a.weights());
    assert_eq!(b.n_classes(), Some(3));
    assert_eq!(b.n_features(), Some(2));
    assert_eq!(b.input_shape(), Some(&[2][..]));
}

#[test]
fn import_needs_an_input_shape() {
    let (a, _) = trained(2);
    let mut checkpoint = a.export_state();
    checkpoint.input_shape = None;

    let mut b = NeuralClassifier::new(mlp_spec(), config(2)).unwrap();
    let err = b.import_state(&checkpoint).unwrap_err();

    assert!(matches!(err, ClassifierErr::MissingInputShape));
    assert!(err.is_config());
    assert!(!b.is_trained());
    assert_eq!(b.start_epoch(), 0);
}

#[test]
fn missing_defaults_keep_the_current_hyperparameters() {
    record_warnings();
    let (a, _) = trained(2);
    let mut checkpoint = a.export_state();
    checkpoint.optimizer.defaults = None;

    let mut config = config(2);
    config.learning_rate = 0.2;

    let mut b = NeuralClassifier::new(mlp_spec(), config).unwrap();
    b.import_state(&checkpoint).unwrap();

    assert_eq!(b.hyperparameters().learning_rate, 0.2);
    assert!(b.is_trained());
    assert!(warned("no optimizer defaults"));
}

#[test]
fn bias_regularization_flag_rebuilds_the_optimizer() {
    let train = blobs(10, 3);
    let mut config_a = config(2);
    config_a.regularize_bias = false;
    config_a.weight_decay = 1e-2;

    let mut a = NeuralClassifier::new(mlp_spec(), config_a).unwrap();
    a.fit(&train, FitOptions::default()).unwrap();

    let checkpoint = a.export_state();
    assert_eq!(checkpoint.optimizer.state.param_groups.len(), 2);

    let mut b = NeuralClassifier::new(mlp_spec(), config(2)).unwrap();
    assert!(b.hyperparameters().regularize_bias);

    b.import_state(&checkpoint).unwrap();

    assert!(!b.hyperparameters().regularize_bias);
    assert_eq!(b.hyperparameters().weight_decay, 1e-2);
    assert_eq!(b.export_state().optimizer, checkpoint.optimizer);
}

#[test]
fn foreign_architectures_are_rejected() {
    let (a, _) = trained(1);
    let mut checkpoint = a.export_state();
    let bias = checkpoint.state_dict.remove("fc2.bias").unwrap();
    checkpoint.state_dict.insert("out.bias".to_string(), bias);

    let mut b = NeuralClassifier::new(mlp_spec(), config(1)).unwrap();
    let before = b.export_state();

    assert!(b.import_state(&checkpoint).is_err());
    assert_eq!(b.export_state(), before);
}

#[test]
fn maxed_out_epochs_change_nothing() {
    record_warnings();
    let (a, train) = trained(3);
    let mut checkpoint = a.export_state();
    checkpoint.epoch = 3;

    let mut b = NeuralClassifier::new(mlp_spec(), config(3)).unwrap();
    b.import_state(&checkpoint).unwrap();
    let before = b.export_state();

    let options = FitOptions {
        warm_start: true,
        store_best_params: true,
    };
    let report = b.fit(&train, options).unwrap();

    assert!(report.losses.is_empty());
    assert_eq!(report.best_epoch, None);
    assert_eq!(b.export_state(), before);
    assert!(warned("maximum number of epochs (3) reached"));
}

#[test]
fn warm_start_resumes_from_the_imported_epoch() {
    let (a, train) = trained(4);
    let mut checkpoint = a.export_state();
    checkpoint.epoch = 2;

    let mut b = NeuralClassifier::new(mlp_spec(), config(4)).unwrap();
    b.import_state(&checkpoint).unwrap();

    let options = FitOptions {
        warm_start: true,
        store_best_params: false,
    };
    let report = b.fit(&train, options).unwrap();

    assert_eq!(report.losses.len(), 2);
    assert_eq!(report.best_epoch, Some(3));
}

#[test]
fn clones_keep_the_epoch_and_the_predictions() {
    let (a, train) = trained(3);
    let b = a.try_clone().unwrap();

    assert_eq!(b.start_epoch(), a.start_epoch());
    assert_eq!(b.best_acc(), a.best_acc());
    assert_eq!(
        b.predict(train.x().view()).unwrap(),
        a.predict(train.x().view()).unwrap()
    );
}

#[test]
fn reconfigure_rebuilds_the_optimizer() {
    let (a, _) = trained(2);
    let hp = Hyperparameters {
        learning_rate: 0.5,
        momentum: 0.,
        weight_decay: 0.,
        regularize_bias: true,
    };

    let weights = a.weights();
    let b = a.reconfigure(hp);
    let state = b.export_state();

    assert_eq!(b.hyperparameters(), hp);
    assert_eq!(b.weights(), weights);
    assert!(state.optimizer.state.momentum_buffer.iter().all(|&v| v == 0.));
    assert_eq!(state.optimizer.state.param_groups[0].learning_rate, 0.5);
}
