mod common;

use std::{num::NonZeroUsize, sync::Arc};

use common::{blobs, config, mlp_spec, trained};
use ndarray::{Array2, Axis};
use neural_classifier::{ClassifierErr, NeuralClassifier, preprocess::{MinMaxScaler, Preprocess}};

#[test]
fn predictions_do_not_depend_on_the_batch_size() {
    let (classifier, _) = trained(5);
    let x = blobs(17, 11).x().slice(ndarray::s![..50, ..]).to_owned();
    assert_eq!(x.nrows(), 50);

    let mut snapshot = classifier.snapshot();
    let mut labels = Vec::new();

    for (batch_size, workers) in [(1, 1), (4, 1), (17, 1), (17, 3)] {
        snapshot.config.batch_size = NonZeroUsize::new(batch_size).unwrap();
        snapshot.config.workers = NonZeroUsize::new(workers).unwrap();

        let copy = NeuralClassifier::from_snapshot(&snapshot).unwrap();
        labels.push(copy.predict(x.view()).unwrap());
    }

    assert!(labels.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn inference_needs_training() {
    let classifier = NeuralClassifier::new(mlp_spec(), config(1)).unwrap();
    let x = Array2::zeros((1, 2));

    assert!(matches!(classifier.predict(x.view()), Err(ClassifierErr::NotTrained)));
    assert!(matches!(
        classifier.decision_function(x.view(), 0),
        Err(ClassifierErr::NotTrained)
    ));
}

#[test]
fn scores_and_labels_agree() {
    let (classifier, train) = trained(3);
    let (labels, scores) = classifier.predict_with_scores(train.x().view()).unwrap();

    assert_eq!(scores.dim(), (train.len(), 3));
    assert_eq!(classifier.predict(train.x().view()).unwrap(), labels);

    for class in 0..3 {
        let column = classifier.decision_function(train.x().view(), class).unwrap();
        assert_eq!(column, scores.column(class));
    }

    assert!(matches!(
        classifier.decision_function(train.x().view(), 3),
        Err(ClassifierErr::ClassOutOfRange { class: 3, n_classes: 3 })
    ));
}

#[test]
fn softmax_outputs_are_probabilities() {
    let train = blobs(10, 1);
    let mut config = config(2);
    config.softmax_outputs = true;

    let mut classifier = NeuralClassifier::new(mlp_spec(), config).unwrap();
    classifier.fit(&train, Default::default()).unwrap();

    let (_, scores) = classifier.predict_with_scores(train.x().view()).unwrap();

    for sum in scores.sum_axis(Axis(1)) {
        assert!((sum - 1.).abs() < 1e-5);
    }
}

#[test]
fn empty_inputs_give_empty_outputs() {
    let (classifier, _) = trained(1);
    let x = Array2::zeros((0, 2));

    assert_eq!(classifier.predict(x.view()).unwrap().len(), 0);
    assert_eq!(classifier.layer_output(x.view(), Some("fc1")).unwrap().dim(), (0, 8));
}

#[test]
fn wrong_widths_are_rejected() {
    let (classifier, _) = trained(1);
    let err = classifier.predict(Array2::zeros((2, 3)).view()).unwrap_err();

    assert!(matches!(err, ClassifierErr::InvalidShape { .. }));
}

#[test]
fn layer_outputs_follow_the_layer_names() {
    let (classifier, train) = trained(2);

    assert_eq!(classifier.layer_names(), ["fc1", "act", "fc2"]);

    let hidden = classifier.layer_output(train.x().view(), Some("act")).unwrap();
    assert_eq!(hidden.dim(), (train.len(), 8));
    assert!(hidden.iter().all(|v| v.abs() <= 1.));

    let last = classifier.layer_output(train.x().view(), None).unwrap();
    let (_, scores) = classifier.predict_with_scores(train.x().view()).unwrap();
    assert_eq!(last, scores);

    assert!(matches!(
        classifier.layer_output(train.x().view(), Some("fc9")),
        Err(ClassifierErr::UnknownLayer(_))
    ));
}

#[test]
fn preprocessing_applies_before_inference() {
    let (classifier, train) = trained(2);
    let scaler = MinMaxScaler::fit(train.x().view()).unwrap();
    let scaled = scaler.normalize(train.x().view()).unwrap();

    let plain = classifier.predict_with_scores(scaled.view()).unwrap().1;
    let preprocessed = classifier
        .try_clone()
        .unwrap()
        .with_preprocess(Arc::new(scaler))
        .predict_with_scores(train.x().view())
        .unwrap()
        .1;

    assert_eq!(plain, preprocessed);
}
