use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::error::FlagforgeError;
use crate::layers::dense::with_bias_column;
use crate::layers::WeightInit;
use crate::loss::Loss;
use crate::network::Network;

fn network(sizes: &[usize], loss: Loss, seed: u64) -> Network {
    let mut rng = StdRng::seed_from_u64(seed);
    Network::new(
        sizes,
        (Activation::Sigmoid, Activation::Linear),
        WeightInit::XavierUniform,
        loss,
        0.1,
        &mut rng,
    )
    .unwrap()
}

#[test]
fn test_network_creation() {
    let network = network(&[3, 4, 2], Loss::Difference, 1);

    assert_eq!(network.num_layers(), 3);
    assert_eq!(network.layers[0].weights.as_ref().unwrap().dim(), (3, 4));
    assert_eq!(network.layers[0].bias.as_ref().unwrap().dim(), (1, 4));
    assert_eq!(network.layers[1].weights.as_ref().unwrap().dim(), (4, 2));
    assert!(network.layers[2].weights.is_none());
}

#[test]
fn test_forward_pass_shape() {
    let mut network = network(&[3, 4, 2], Loss::Difference, 1);
    let output = network.forward_propagate(array![1.0, 2.0, 3.0].view()).unwrap();
    assert_eq!(output.dim(), (1, 2));
}

#[test]
fn test_forward_rejects_wrong_input_length() {
    let mut network = network(&[3, 4, 2], Loss::Difference, 1);
    let result = network.forward_propagate(array![1.0, 2.0].view());
    assert!(matches!(result, Err(FlagforgeError::DimensionMismatch { .. })));
}

#[test]
fn test_back_propagate_rejects_wrong_target_shape() {
    let mut network = network(&[3, 4, 2], Loss::Difference, 1);
    network.forward_propagate(array![1.0, 2.0, 3.0].view()).unwrap();
    let result = network.back_propagate(&array![[0.0, 0.0, 0.0]]);
    assert!(matches!(result, Err(FlagforgeError::DimensionMismatch { .. })));
}

#[test]
fn test_single_sample_regression_converges() {
    let mut network = network(&[1, 4, 1], Loss::Difference, 42);
    let input = array![0.5];
    let target = array![[0.2]];

    let first_loss = network.train_step(input.view(), &target).unwrap();
    let mut last_loss = first_loss;
    for _ in 1..500 {
        last_loss = network.train_step(input.view(), &target).unwrap();
    }

    assert!(last_loss < first_loss, "loss went from {} to {}", first_loss, last_loss);
    let output = network.predict(input.view()).unwrap();
    assert!((output[0] - 0.2).abs() < 0.05);
}

#[test]
fn test_masked_gradient_is_zero_off_action() {
    let losses = [
        Loss::Difference,
        Loss::Squared,
        Loss::ClippedSquared { clip: 0.5 },
        Loss::Huber { delta: 1.0 },
    ];

    for loss in losses {
        for action in 0..4 {
            let mut network = network(&[3, 6, 4], loss, 7);
            let output = network.forward_propagate(array![0.3, -0.2, 0.9].view()).unwrap();
            network.back_propagate_masked(&output, 5.0, action).unwrap();

            let gradient = network.output_gradient().unwrap();
            for (index, &g) in gradient.iter().enumerate() {
                if index == action {
                    assert!(g != 0.0, "{:?}: no signal at action {}", loss, action);
                } else {
                    assert_eq!(g, 0.0, "{:?}: leak at {} for action {}", loss, index, action);
                }
            }
        }
    }
}

#[test]
fn test_masked_rejects_out_of_range_action() {
    let mut network = network(&[3, 6, 4], Loss::Difference, 7);
    let output = network.forward_propagate(array![0.3, -0.2, 0.9].view()).unwrap();
    let result = network.back_propagate_masked(&output, 1.0, 4);
    assert!(matches!(result, Err(FlagforgeError::InvalidAction { action: 4, max_actions: 4 })));
}

#[test]
fn test_update_uses_gradients_from_before_any_change() {
    let mut network = network(&[2, 3, 2], Loss::Difference, 3);
    network.forward_propagate(array![0.4, -0.7].view()).unwrap();
    network.back_propagate(&array![[1.0, -1.0]]).unwrap();

    let lr = 0.05;
    let expected: Vec<Array2<f32>> = (0..2)
        .map(|i| {
            let gradient = network.layers[i + 1].gradient.as_ref().unwrap();
            let augmented = network.layers[i].augmented_weights().unwrap();
            augmented - &(with_bias_column(&network.layers[i].activations).t().dot(gradient) * lr)
        })
        .collect();

    network.update_weights(lr).unwrap();

    for (i, expected) in expected.iter().enumerate() {
        let actual = network.layers[i].augmented_weights().unwrap();
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-6, "layer {}: {} vs {}", i, a, e);
        }
    }
}

#[test]
fn test_copy_weights_from() {
    let source = network(&[3, 5, 2], Loss::Difference, 1);
    let mut dest = network(&[3, 5, 2], Loss::Difference, 2);
    assert!(!dest.weights_equal(&source));

    dest.copy_weights_from(&source).unwrap();
    assert!(dest.weights_equal(&source));

    let mut other_shape = network(&[3, 4, 2], Loss::Difference, 1);
    assert!(other_shape.copy_weights_from(&source).is_err());
}

#[test]
fn test_forward_leaves_weights_untouched() {
    let mut network = network(&[3, 5, 2], Loss::Difference, 1);
    let before = network.clone();
    network.forward_propagate(array![1.0, 0.0, -1.0].view()).unwrap();
    assert!(network.weights_equal(&before));
}

#[test]
fn test_backprop_matches_finite_differences() {
    // With the Difference loss the update direction is the gradient of
    // 0.5 * |o - t|^2, checked here against central differences at every
    // augmented weight, bias rows included.
    let input = array![0.3, -0.8, 0.5];
    let target = array![[0.1, -0.4]];
    let half_squared_error = |network: &mut Network| {
        let output = network.forward_propagate(input.view()).unwrap();
        0.5 * (&output - &target).mapv(|d| d * d).sum()
    };

    let mut network = network(&[3, 4, 3, 2], Loss::Difference, 13);
    network.forward_propagate(input.view()).unwrap();
    network.back_propagate(&target).unwrap();

    let last = network.num_layers() - 1;
    let analytic: Vec<Array2<f32>> = (0..last)
        .map(|i| {
            let gradient = network.layers[i + 1].gradient.as_ref().unwrap();
            with_bias_column(&network.layers[i].activations).t().dot(gradient)
        })
        .collect();

    let eps = 1e-2;
    for i in 0..last {
        let base = network.layers[i].augmented_weights().unwrap();
        for ((r, c), &expected) in analytic[i].indexed_iter() {
            let mut probe = network.clone();

            let mut plus = base.clone();
            plus[[r, c]] += eps;
            probe.layers[i].set_augmented_weights(&plus).unwrap();
            let loss_plus = half_squared_error(&mut probe);

            let mut minus = base.clone();
            minus[[r, c]] -= eps;
            probe.layers[i].set_augmented_weights(&minus).unwrap();
            let loss_minus = half_squared_error(&mut probe);

            let numeric = (loss_plus - loss_minus) / (2.0 * eps);
            assert!(
                (numeric - expected).abs() < 1e-3 + 1e-2 * expected.abs(),
                "layer {} [{}, {}]: numeric {} vs backprop {}",
                i,
                r,
                c,
                numeric,
                expected
            );
        }
    }
}
