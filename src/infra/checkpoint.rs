// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. model_epoch_{n}.mpk - weights after epoch n
//   2. model_best.mpk      - weights of the lowest val loss so far
//   3. latest_epoch.json      - which epoch was last saved
//   4. train_config.json      - run config incl. architecture and labels
//
// The config is needed to rebuild the exact architecture before
// weights can be loaded into it.
//
// Burn's CompactRecorder:
//   - named MessagePack, half precision
//   - loading fails if the architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::RecurrentClassifier;

const BEST_STEM: &str = "model_best";

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Save model weights for `epoch` and point latest_epoch.json at it.
    pub fn save_model<B: Backend>(&self, model: &RecurrentClassifier<B>, epoch: usize) -> Result<()> {
        self.record(model, format!("model_epoch_{epoch}"))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Overwrite the best-so-far checkpoint.
    pub fn save_best<B: Backend>(&self, model: &RecurrentClassifier<B>, epoch: usize) -> Result<()> {
        self.record(model, BEST_STEM.to_string())?;
        tracing::debug!("Saved best checkpoint (epoch {})", epoch);
        Ok(())
    }

    /// Load weights into `model`: the best checkpoint if one
    /// exists, otherwise the latest epoch.
    ///
    /// `model` must have the architecture the checkpoint was saved with.
    pub fn load_model<B: Backend>(
        &self,
        model:  RecurrentClassifier<B>,
        device: &B::Device,
    ) -> Result<RecurrentClassifier<B>> {
        let ext  = <CompactRecorder as FileRecorder<B>>::file_extension();
        let best = self.dir.join(BEST_STEM);
        let path = if best.with_extension(ext).exists() {
            tracing::info!("Loading best checkpoint");
            best
        } else {
            let epoch = self.latest_epoch()?;
            tracing::info!("Loading checkpoint from epoch {}", epoch);
            self.dir.join(format!("model_epoch_{epoch}"))
        };

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Save the run configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'evaluate'.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }

    /// Epoch number stored in latest_epoch.json.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");

        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest_epoch.json'. Have you run 'train' first?")?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }

    fn record<B: Backend>(&self, model: &RecurrentClassifier<B>, stem: String) -> Result<()> {
        // the recorder appends the extension itself
        let path = self.dir.join(stem);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        Ok(())
    }
}
