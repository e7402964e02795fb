// ============================================================
// Layer 3: Pass Metrics
// ============================================================
// A pass accumulates (loss, accuracy) once per batch and is
// finalised by dividing the sums by the number of batches.
//
// Every batch has equal weight, whatever its size. A short last
// batch therefore counts as much as a full one. This matches the
// numbers reported by earlier runs and is kept on purpose.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Running sums for one traversal of a batch source.
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    loss_sum: f64,
    accuracy_sum: f64,
    count: usize,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the scalar loss and accuracy of one batch.
    pub fn add(&mut self, loss: f64, accuracy: f64) {
        self.loss_sum += loss;
        self.accuracy_sum += accuracy;
        self.count += 1;
    }

    /// Divide the sums by the batch count.
    ///
    /// Fails when no batch was recorded rather than producing NaN.
    pub fn finish(self) -> Result<PassMetrics> {
        ensure!(
            self.count > 0,
            "cannot average metrics over an empty pass (0 batches)"
        );
        let n = self.count as f64;
        Ok(PassMetrics {
            loss: self.loss_sum / n,
            accuracy: self.accuracy_sum / n,
            batches: self.count,
        })
    }
}

/// Mean loss and accuracy of one train or eval pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassMetrics {
    pub loss: f64,
    pub accuracy: f64,
    /// Number of batches the means were taken over
    pub batches: usize,
}

/// Results of one epoch: a training pass followed by a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub train: PassMetrics,
    pub val: PassMetrics,
}

impl EpochMetrics {
    pub fn new(train: PassMetrics, val: PassMetrics) -> Self {
        Self { train, val }
    }

    /// True if this epoch's validation loss beats `best_val_loss`.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val.loss < best_val_loss
    }
}

impl fmt::Display for EpochMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Train Loss: {:.4} | Train Acc: {:.4} | Val Loss: {:.4} | Val Acc: {:.4}",
            self.train.loss, self.train.accuracy, self.val.loss, self.val.accuracy,
        )
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn pass(loss: f64, accuracy: f64) -> PassMetrics {
        PassMetrics { loss, accuracy, batches: 1 }
    }

    #[test]
    fn test_two_batch_mean() {
        let mut acc = MetricAccumulator::new();
        acc.add(1.0, 0.5);
        acc.add(3.0, 1.0);
        let m = acc.finish().unwrap();
        assert_eq!(m.loss, 2.0);
        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.batches, 2);
    }

    #[test]
    fn test_matches_reference_sum_then_divide() {
        let losses = [0.9, 1.7, 0.31, 2.25, 0.04];
        let accs = [0.1, 0.5, 0.75, 0.0, 1.0];

        let mut acc = MetricAccumulator::new();
        for (l, a) in losses.iter().zip(accs.iter()) {
            acc.add(*l, *a);
        }
        let m = acc.finish().unwrap();

        let ref_loss = losses.iter().sum::<f64>() / losses.len() as f64;
        let ref_acc = accs.iter().sum::<f64>() / accs.len() as f64;
        assert!((m.loss - ref_loss).abs() < 1e-12);
        assert!((m.accuracy - ref_acc).abs() < 1e-12);
    }

    #[test]
    fn test_empty_pass_is_an_error() {
        assert!(MetricAccumulator::new().finish().is_err());
    }

    #[test]
    fn test_summary_line_format() {
        let m = EpochMetrics::new(pass(0.123456, 0.5), pass(2.0, 0.99999));
        assert_eq!(
            m.to_string(),
            "Train Loss: 0.1235 | Train Acc: 0.5000 | Val Loss: 2.0000 | Val Acc: 1.0000"
        );
    }

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(pass(2.5, 0.2), pass(2.3, 0.2));
        // 2.3 < 3.0 → this is an improvement
        assert!(m.is_improvement(3.0));
        // 2.3 is NOT less than 2.0 → not an improvement
        assert!(!m.is_improvement(2.0));
    }
}
