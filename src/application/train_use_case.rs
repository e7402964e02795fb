// ============================================================
// Layer 2: TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the TSV file          (Layer 4 - data)
//   Step 2: Clean the text             (Layer 4 - data)
//   Step 3: Collect the label set      (Layer 3 - domain)
//   Step 4: Split train/validation     (Layer 4 - data)
//   Step 5: Build tokenizer            (Layer 6 - infra)
//   Step 6: Encode samples             (Layer 4 - data)
//   Step 7: Save config                (Layer 6 - infra)
//   Step 8: Run training loop          (Layer 5 - ml)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::{
    dataset::{SequenceDataset, SequenceSample},
    loader::TsvLoader,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::{
    sample::{LabelSet, LabeledText},
    traits::TextSource,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    tokenizer_store::{encode_ids, TokenizerStore},
};
use crate::ml::{
    model::RecurrentClassifierConfig,
    runner::DEFAULT_CLIP_NORM,
    scheduler::Schedule,
    trainer::{run_training, TrainingSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved next to the
// checkpoints and reloaded by `evaluate` to rebuild the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data:           String,
    pub checkpoint_dir: String,
    pub max_seq_len:    usize,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub clip_norm:      f64,
    pub schedule:       Schedule,
    pub embed_dim:      usize,
    pub hidden_size:    usize,
    pub num_layers:     usize,
    pub dropout:        f64,
    pub vocab_size:     usize,
    pub val_fraction:   f64,
    pub seed:           u64,
    /// Class names in index order; filled in from the data.
    #[serde(default)]
    pub labels:         Vec<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data:           "data/train.tsv".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            max_seq_len:    64,
            batch_size:     32,
            epochs:         5,
            lr:             1e-3,
            clip_norm:      DEFAULT_CLIP_NORM,
            schedule:       Schedule::OneCycle,
            embed_dim:      128,
            hidden_size:    256,
            num_layers:     2,
            dropout:        0.2,
            vocab_size:     20000,
            val_fraction:   0.2,
            seed:           42,
            labels:         Vec::new(),
        }
    }
}

impl TrainConfig {
    /// Reject settings that would fail later, before any work is done.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_seq_len > 0, "max_seq_len must be at least 1");
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.lr.is_finite() && self.lr > 0.0, "lr must be positive, got {}", self.lr);
        ensure!(
            self.clip_norm.is_finite() && self.clip_norm > 0.0,
            "clip_norm must be positive, got {}",
            self.clip_norm
        );
        ensure!(
            self.val_fraction > 0.0 && self.val_fraction < 1.0,
            "val_fraction must be in (0, 1), got {}",
            self.val_fraction
        );
        ensure!((0.0..1.0).contains(&self.dropout), "dropout must be in [0, 1), got {}", self.dropout);
        ensure!(self.vocab_size > 2, "vocab_size must leave room for words beyond [PAD] and [UNK]");
        ensure!(self.embed_dim > 0 && self.hidden_size > 0, "embed_dim and hidden_size must be at least 1");
        Ok(())
    }

    /// Architecture of the classifier for this run. Needs the labels.
    pub fn model_config(&self) -> Result<RecurrentClassifierConfig> {
        ensure!(
            self.labels.len() >= 2,
            "a classifier needs at least 2 labels, found {}",
            self.labels.len()
        );
        Ok(RecurrentClassifierConfig::new(
            self.vocab_size,
            self.labels.len(),
            self.embed_dim,
            self.hidden_size,
            self.num_layers,
            self.dropout,
        ))
    }
}

/// Clean each text and drop the ones that end up empty.
pub fn clean_samples(samples: Vec<LabeledText>) -> Vec<LabeledText> {
    let preprocessor = Preprocessor::new();
    samples
        .into_iter()
        .filter_map(|s| {
            let text = preprocessor.clean(&s.text);
            (!text.is_empty()).then(|| LabeledText::new(s.label, text))
        })
        .collect()
}

/// Tokenise texts and map labels to class indices.
pub fn encode_samples(
    samples:   &[LabeledText],
    tokenizer: &Tokenizer,
    labels:    &LabelSet,
) -> Result<Vec<SequenceSample>> {
    samples
        .iter()
        .map(|s| {
            let tokens = encode_ids(tokenizer, &s.text)?;
            Ok(SequenceSample::new(tokens, labels.index_of(&s.label)?))
        })
        .collect()
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        self.config.validate()?;
        let mut cfg = self.config.clone();

        // ── Step 1: Load labelled lines ───────────────────────────────────────
        tracing::info!("Loading examples from '{}'", cfg.data);
        let raw = TsvLoader::new(&cfg.data).load_all()?;
        tracing::info!("Loaded {} examples", raw.len());

        // ── Step 2: Clean / normalise text ────────────────────────────────────
        let samples = clean_samples(raw);

        // ── Step 3: Label set ─────────────────────────────────────────────────
        let labels = LabelSet::from_samples(&samples);
        ensure!(
            labels.len() >= 2,
            "need at least 2 distinct labels in '{}', found {}",
            cfg.data,
            labels.len()
        );
        cfg.labels = labels.names().to_vec();
        tracing::info!("{} classes: {}", labels.len(), cfg.labels.join(", "));

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (train, val) = split_train_val(samples, 1.0 - cfg.val_fraction, cfg.seed);
        ensure!(!train.is_empty(), "training split is empty; add more data");
        ensure!(!val.is_empty(), "validation split is empty; add more data or raise val_fraction");
        tracing::info!("Split: {} train, {} validation", train.len(), val.len());

        // ── Step 5: Tokenizer from the training texts only ────────────────────
        let texts: Vec<String> = train.iter().map(|s| s.text.clone()).collect();
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir).build(&texts, cfg.vocab_size)?;

        // ── Step 6: Encode ────────────────────────────────────────────────────
        let train_dataset = SequenceDataset::new(encode_samples(&train, &tokenizer, &labels)?);
        let val_dataset   = SequenceDataset::new(encode_samples(&val, &tokenizer, &labels)?);

        // ── Step 7: Save config for evaluation ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(&cfg)?;
        let metrics_log = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 8: Run training loop (Layer 5) ───────────────────────────────
        run_training(&cfg, train_dataset, val_dataset, &ckpt_manager, &metrics_log)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bad = [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { max_seq_len: 0, ..TrainConfig::default() },
            TrainConfig { clip_norm: 0.0, ..TrainConfig::default() },
            TrainConfig { clip_norm: f64::NAN, ..TrainConfig::default() },
            TrainConfig { val_fraction: 1.0, ..TrainConfig::default() },
            TrainConfig { val_fraction: 0.0, ..TrainConfig::default() },
            TrainConfig { dropout: 1.0, ..TrainConfig::default() },
            TrainConfig { vocab_size: 2, ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    #[test]
    fn test_model_config_needs_two_labels() {
        let cfg = TrainConfig { labels: vec!["only".into()], ..TrainConfig::default() };
        assert!(cfg.model_config().is_err());

        let cfg = TrainConfig { labels: vec!["a".into(), "b".into(), "c".into()], ..cfg };
        let model = cfg.model_config().unwrap();
        assert_eq!(model.num_classes, 3);
        assert_eq!(model.vocab_size, cfg.vocab_size);
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg  = TrainConfig { labels: vec!["x".into(), "y".into()], ..TrainConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.labels, cfg.labels);
        assert_eq!(back.schedule, Schedule::OneCycle);
        assert!(json.contains("\"one-cycle\""));
    }

    #[test]
    fn test_clean_samples_drops_blank_text() {
        let cleaned = clean_samples(vec![
            LabeledText::new("a", "  hello\u{00A0}  world "),
            LabeledText::new("b", " \t "),
        ]);
        assert_eq!(cleaned, vec![LabeledText::new("a", "hello world")]);
    }

    #[test]
    fn test_execute_trains_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("train.tsv");
        let mut f = std::fs::File::create(&data_path).unwrap();
        for i in 0..12 {
            let (label, text) = if i % 2 == 0 {
                ("pos", "good great fine")
            } else {
                ("neg", "bad awful poor")
            };
            writeln!(f, "{label}\t{text} {i}").unwrap();
        }

        let ckpt_dir = dir.path().join("ckpt").to_string_lossy().to_string();
        let cfg = TrainConfig {
            data:           data_path.to_string_lossy().to_string(),
            checkpoint_dir: ckpt_dir.clone(),
            max_seq_len:    6,
            batch_size:     4,
            epochs:         1,
            embed_dim:      4,
            hidden_size:    4,
            num_layers:     1,
            vocab_size:     30,
            val_fraction:   0.25,
            ..TrainConfig::default()
        };

        let summary = TrainUseCase::new(cfg).execute().unwrap();
        assert_eq!(summary.best_epoch, 1);
        assert_eq!(summary.last.train.batches, 3);
        assert_eq!(summary.last.val.batches, 1);

        let saved = CheckpointManager::new(&ckpt_dir).unwrap().load_config().unwrap();
        assert_eq!(saved.labels, vec!["neg".to_string(), "pos".to_string()]);
        assert!(std::path::Path::new(&ckpt_dir).join("tokenizer.json").exists());
    }

    #[test]
    fn test_single_label_data_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("one.tsv");
        std::fs::write(&data_path, "a\tx\na\ty\na\tz\n").unwrap();

        let cfg = TrainConfig {
            data:           data_path.to_string_lossy().to_string(),
            checkpoint_dir: dir.path().join("ckpt").to_string_lossy().to_string(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
