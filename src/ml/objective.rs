// ============================================================
// Layer 5: Loss and Metric
// ============================================================
// The runner is generic over both, so they are expressed as
// backend-generic traits: the same value scores autodiff
// tensors in training and plain tensors in evaluation.

use burn::{nn::loss::CrossEntropyLossConfig, prelude::*};

/// Differentiable scalar loss between logits and class targets.
pub trait Criterion {
    /// logits: [batch, classes], targets: [batch] → loss: [1]
    fn loss<B: Backend>(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1>;
}

/// Pure score of predictions against targets.
pub trait Metric {
    fn compute<B: Backend>(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f64;
}

/// Mean cross-entropy over the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropy;

impl Criterion for CrossEntropy {
    fn loss<B: Backend>(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets)
    }
}

/// Fraction of rows whose argmax equals the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accuracy;

impl Metric for Accuracy {
    fn compute<B: Backend>(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f64 {
        let [batch, _] = logits.dims();
        if batch == 0 {
            return 0.0;
        }

        // argmax(1) returns shape [batch, 1] - squeeze to [batch]
        let predicted = logits.argmax(1).flatten::<1>(0, 1);
        let correct: i64 = predicted
            .equal(targets)
            .int().sum().into_scalar().elem::<i64>();

        correct as f64 / batch as f64
    }
}
