mod common;

use std::sync::Arc;

use common::{assert_close, config, linear_spec, mlp_spec, record_warnings, trained, warned};
use ndarray::{Array1, Array2, array};
use neural_classifier::{
    ClassifierConfig, ClassifierErr, GradientQuery, NeuralClassifier, preprocess::MinMaxScaler,
};

/// A `3 -> 2` linear classifier with the given weights, stored `(in, out)`.
fn linear(weights: [[f32; 2]; 3], config: ClassifierConfig) -> NeuralClassifier {
    let mut classifier = NeuralClassifier::new(linear_spec(3, 2), config).unwrap();
    let mut checkpoint = classifier.export_state();

    let w = checkpoint.state_dict.get_mut("fc.weight").unwrap();
    w.data = weights.iter().flatten().copied().collect();
    let b = checkpoint.state_dict.get_mut("fc.bias").unwrap();
    b.data = vec![0.5, -0.5];
    checkpoint.input_shape = Some(vec![3]);

    classifier.import_state(&checkpoint).unwrap();
    classifier
}

fn finite_difference<F>(x: &Array2<f32>, h: f32, f: F) -> Vec<f32>
where
    F: Fn(&Array2<f32>) -> f32,
{
    (0..x.ncols())
        .map(|j| {
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[[0, j]] += h;
            minus[[0, j]] -= h;

            (f(&plus) - f(&minus)) / (2. * h)
        })
        .collect()
}

const W: [[f32; 2]; 3] = [[1., 2.], [3., 4.], [5., 6.]];

#[test]
fn class_gradient_of_a_linear_model_is_its_weight_column() {
    let classifier = linear(W, config(1));
    let x = array![[0.3, -0.7, 1.1]];

    for k in 0..2 {
        let grad = classifier.gradient(x.view(), &GradientQuery::class(k)).unwrap();
        let column: Vec<f32> = W.iter().map(|row| row[k]).collect();
        assert_close(grad.as_slice().unwrap(), &column, 1e-6);

        let numeric = finite_difference(&x, 1e-2, |x| {
            classifier.decision_function(x.view(), k).unwrap()[0]
        });
        assert_close(grad.as_slice().unwrap(), &numeric, 1e-4);
    }
}

#[test]
fn directions_mix_the_weight_columns() {
    record_warnings();
    let classifier = linear(W, config(1));
    let x = array![[0.3, -0.7, 1.1]];
    let expected: Vec<f32> = W.iter().map(|row| 2. * row[0] - row[1]).collect();

    let at_output = GradientQuery::new().with_direction(vec![2.0_f32, -1.0]);
    let at_layer = at_output.clone().at_layer("fc");
    let with_class = at_output.clone().with_class(1);

    for query in [at_output, at_layer, with_class] {
        let grad = classifier.gradient(x.view(), &query).unwrap();
        assert_close(grad.as_slice().unwrap(), &expected, 1e-5);
    }

    assert!(warned("the class index is ignored"));
}

#[test]
fn hidden_layer_gradients_match_finite_differences() {
    let (classifier, _) = trained(3);
    let x = array![[0.4, -1.2]];
    let d = array![0.5_f32, -1., 0.25, 2., -0.75, 1., 0., 0.3];

    let query = GradientQuery::new().with_direction(d.clone()).at_layer("act");
    let grad = classifier.gradient(x.view(), &query).unwrap();

    let numeric = finite_difference(&x, 1e-3, |x| {
        classifier
            .layer_output(x.view(), Some("act"))
            .unwrap()
            .row(0)
            .dot(&d)
    });

    assert_eq!(grad.len(), 2);
    assert_close(grad.as_slice().unwrap(), &numeric, 1e-3);
}

#[test]
fn gradients_chain_through_the_preprocessor() {
    let (classifier, train) = trained(3);
    let scaler = MinMaxScaler::fit(train.x().view()).unwrap();
    let classifier = classifier.with_preprocess(Arc::new(scaler));
    let x = array![[0.4, -1.2]];

    for k in 0..2 {
        let grad = classifier.gradient(x.view(), &GradientQuery::class(k)).unwrap();

        let numeric = finite_difference(&x, 1e-2, |x| {
            classifier.decision_function(x.view(), k).unwrap()[0]
        });
        assert_close(grad.as_slice().unwrap(), &numeric, 1e-3);
    }
}

#[test]
fn softmax_outputs_chain_through_the_jacobian() {
    let small = [[0.1, 0.2], [0.3, -0.4], [0.5, 0.6]];
    let mut config = config(1);
    config.softmax_outputs = true;

    let classifier = linear(small, config);
    let x = array![[0.3, -0.7, 1.1]];
    let k = 1;

    // With a unit direction the seed is the whole Jacobian row, i.e. the gradient of `s[k]`.
    let query = GradientQuery::class(k).with_direction(vec![1.0_f32, 1.0]);
    let grad = classifier.gradient(x.view(), &query).unwrap();

    let numeric = finite_difference(&x, 1e-2, |x| {
        classifier.decision_function(x.view(), k).unwrap()[0]
    });
    assert_close(grad.as_slice().unwrap(), &numeric, 1e-4);

    // Alone, the class picks the diagonal term of the Jacobian.
    let s = classifier.decision_function(x.view(), k).unwrap()[0];
    let grad = classifier.gradient(x.view(), &GradientQuery::class(k)).unwrap();
    let expected: Vec<f32> = small.iter().map(|row| s * (1. - s) * row[k]).collect();
    assert_close(grad.as_slice().unwrap(), &expected, 1e-5);

    let without_class = GradientQuery::new().with_direction(vec![1.0_f32, 1.0]);
    assert!(matches!(
        classifier.gradient(x.view(), &without_class),
        Err(ClassifierErr::InvalidGradientQuery(_))
    ));
}

#[test]
fn malformed_queries_are_configuration_errors() {
    let classifier = linear(W, config(1));
    let x = array![[0.3, -0.7, 1.1]];

    let rows = Array2::zeros((2, 3));
    let err = classifier.gradient(rows.view(), &GradientQuery::class(0)).unwrap_err();
    assert!(matches!(err, ClassifierErr::MultiRowInput { rows: 2 }));
    assert!(err.is_config());

    let query = GradientQuery::new().with_direction(vec![1.0_f32, 0.0]).at_layer("nonexistent");
    let err = classifier.gradient(x.view(), &query).unwrap_err();
    assert!(matches!(&err, ClassifierErr::UnknownLayer(name) if name == "nonexistent"));
    assert!(err.is_config());

    let no_direction = GradientQuery::class(0).at_layer("fc");
    assert!(matches!(
        classifier.gradient(x.view(), &no_direction),
        Err(ClassifierErr::InvalidGradientQuery(_))
    ));

    assert!(matches!(
        classifier.gradient(x.view(), &GradientQuery::new()),
        Err(ClassifierErr::InvalidGradientQuery(_))
    ));

    assert!(matches!(
        classifier.gradient(x.view(), &GradientQuery::class(2)),
        Err(ClassifierErr::ClassOutOfRange { class: 2, n_classes: 2 })
    ));

    let short = GradientQuery::new().with_direction(Array1::<f32>::ones(3));
    assert!(matches!(
        classifier.gradient(x.view(), &short),
        Err(ClassifierErr::InvalidShape { what: "direction", .. })
    ));
}

#[test]
fn gradients_need_training() {
    let classifier = NeuralClassifier::new(mlp_spec(), config(1)).unwrap();
    let x = array![[0., 0.]];

    assert!(matches!(
        classifier.gradient(x.view(), &GradientQuery::class(0)),
        Err(ClassifierErr::NotTrained)
    ));
}

#[test]
fn gradients_leave_the_state_untouched() {
    let (classifier, _) = trained(2);
    let before = classifier.export_state();
    let x = array![[1., 1.]];

    classifier.gradient(x.view(), &GradientQuery::class(0)).unwrap();

    assert_eq!(classifier.export_state(), before);
}
