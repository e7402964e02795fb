// ============================================================
// Layer 4: Sequence Batcher
// ============================================================
// Stacks a list of SequenceSamples into tensors:
//
//   Input:  N samples with token sequences of varying length
//   Output: SequenceBatch with inputs [N, seq_len], targets [N]
//
// Every row is made exactly seq_len long:
//   - longer sequences keep their first seq_len tokens
//   - shorter sequences are LEFT-padded with [PAD]
//
// Left padding keeps the last time step a real token, which is
// where the classifier reads its prediction from.

use burn::prelude::*;

use crate::data::dataset::SequenceSample;

/// Token id reserved for padding.
pub const PAD_ID: u32 = 0;

/// A batch ready for the forward pass. Batch-major layout.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Token ids - shape: [batch_size, seq_len]
    pub inputs: Tensor<B, 2, Int>,

    /// Class indices - shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> SequenceBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.targets.dims()[0]
    }

    /// Move both tensors to `device`. A no-op when already there.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            inputs:  self.inputs.to_device(device),
            targets: self.targets.to_device(device),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SequenceBatcher {
    seq_len: usize,
}

impl SequenceBatcher {
    pub fn new(seq_len: usize) -> Self {
        Self { seq_len }
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Pad or truncate one token sequence to exactly `seq_len` ids.
    pub fn fit(&self, tokens: &[u32]) -> Vec<i32> {
        let kept = &tokens[..tokens.len().min(self.seq_len)];
        let mut row = vec![PAD_ID as i32; self.seq_len - kept.len()];
        row.extend(kept.iter().map(|&t| t as i32));
        row
    }

    /// Convert samples into one batch on `device`. `items` must not be empty.
    pub fn batch<B: Backend>(&self, items: &[SequenceSample], device: &B::Device) -> SequenceBatch<B> {
        let batch_size = items.len();

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| self.fit(&s.tokens))
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label as i32)
            .collect();

        let inputs = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), device
        ).reshape([batch_size, self.seq_len]);

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);

        SequenceBatch { inputs, targets }
    }
}
