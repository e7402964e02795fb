// ============================================================
// Layer 4: Batch Loader
// ============================================================
// Feeds batches to the epoch runner.
//
// A BatchSource is a finite, restartable, lazy sequence of
// batches whose length is known up front: every call to iter()
// starts a fresh traversal, and num_batches() tells the runner
// how many batches that traversal will yield.
//
// Batches are built on demand, one at a time, so only the
// current batch's tensors are alive during a pass.

use burn::{data::dataset::Dataset, prelude::*};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::cell::Cell;

use crate::data::{
    batcher::{SequenceBatch, SequenceBatcher},
    dataset::{SequenceDataset, SequenceSample},
};

/// Anything the epoch runner can traverse.
pub trait BatchSource<B: Backend> {
    /// Number of batches one traversal yields.
    fn num_batches(&self) -> usize;

    /// Start a new traversal.
    fn iter(&self) -> impl Iterator<Item = SequenceBatch<B>> + '_;
}

/// Batches a dataset in index order, or in a seeded shuffled order
/// that changes on every traversal.
pub struct BatchLoader<B: Backend, D = SequenceDataset> {
    dataset:      D,
    batcher:      SequenceBatcher,
    batch_size:   usize,
    device:       B::Device,
    shuffle_seed: Option<u64>,
    traversals:   Cell<u64>,
}

impl<B: Backend, D: Dataset<SequenceSample>> BatchLoader<B, D> {
    /// `batch_size` must be at least 1.
    pub fn new(dataset: D, batcher: SequenceBatcher, batch_size: usize, device: B::Device) -> Self {
        Self {
            dataset,
            batcher,
            batch_size: batch_size.max(1),
            device,
            shuffle_seed: None,
            traversals: Cell::new(0),
        }
    }

    /// Reshuffle the sample order at the start of every traversal.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn num_items(&self) -> usize {
        self.dataset.len()
    }

    fn order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();

        if let Some(seed) = self.shuffle_seed {
            let traversal = self.traversals.get();
            self.traversals.set(traversal + 1);

            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(traversal));
            order.shuffle(&mut rng);
        }
        order
    }
}

impl<B: Backend, D: Dataset<SequenceSample>> BatchSource<B> for BatchLoader<B, D> {
    fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    fn iter(&self) -> impl Iterator<Item = SequenceBatch<B>> + '_ {
        let order = self.order();
        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();

        chunks.into_iter().map(move |indices| {
            let items: Vec<SequenceSample> = indices
                .iter()
                .filter_map(|&i| self.dataset.get(i))
                .collect();
            self.batcher.batch(&items, &self.device)
        })
    }
}
