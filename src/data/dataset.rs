use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One tokenised example: token ids and its class index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSample {
    pub tokens: Vec<u32>,
    pub label:  usize,
}

impl SequenceSample {
    pub fn new(tokens: Vec<u32>, label: usize) -> Self {
        Self { tokens, label }
    }
}

pub struct SequenceDataset {
    samples: Vec<SequenceSample>,
}

impl SequenceDataset {
    pub fn new(samples: Vec<SequenceSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<SequenceSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
