// ============================================================
// Layer 2: Evaluate Use Case
// ============================================================
// Scores a trained checkpoint on a labelled TSV file:
//   1. Rebuild the architecture from train_config.json
//   2. Load the saved tokenizer and weights (best, else latest)
//   3. Encode the file with the training label set
//   4. Run one evaluation pass on the inner backend

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use crate::application::train_use_case::{clean_samples, encode_samples, TrainConfig};
use crate::data::{
    batcher::SequenceBatcher,
    dataloader::BatchLoader,
    dataset::SequenceDataset,
    loader::TsvLoader,
};
use crate::domain::{metrics::PassMetrics, sample::LabelSet, traits::TextSource};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::{
    backend::{default_device, Device, InnerBackend},
    model::RecurrentClassifier,
    runner::EpochRunner,
};

pub struct EvaluateUseCase {
    config:    TrainConfig,
    labels:    LabelSet,
    tokenizer: Tokenizer,
    model:     RecurrentClassifier<InnerBackend>,
    device:    Device,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let ckpt   = CheckpointManager::new(checkpoint_dir)?;
        let config = ckpt.load_config()?;
        let labels = LabelSet::from_names(config.labels.clone());

        let tokenizer = TokenizerStore::new(checkpoint_dir).load()?;

        let device = default_device();
        let model  = config.model_config()?.init::<InnerBackend>(&device);
        let model  = ckpt.load_model(model, &device)?;

        Ok(Self { config, labels, tokenizer, model, device })
    }

    /// Mean loss and accuracy over `data_path`, batched like training.
    pub fn evaluate(&self, data_path: &str) -> Result<PassMetrics> {
        let raw = TsvLoader::new(data_path).load_all()?;
        let samples = clean_samples(raw);
        tracing::info!("Evaluating on {} examples from '{}'", samples.len(), data_path);

        let encoded = encode_samples(&samples, &self.tokenizer, &self.labels)
            .with_context(|| format!("'{}' does not match the trained label set", data_path))?;

        let loader = BatchLoader::<InnerBackend>::new(
            SequenceDataset::new(encoded),
            SequenceBatcher::new(self.config.max_seq_len),
            self.config.batch_size,
            self.device.clone(),
        );

        EpochRunner::default().eval_pass(&self.model, &loader, &self.device)
    }
}
