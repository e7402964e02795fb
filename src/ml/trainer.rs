// ============================================================
// Layer 5: Training Loop
// ============================================================
// Drives the EpochRunner for `cfg.epochs` epochs.
//
//   - training loader on TrainBackend (Autodiff<Inner>), shuffled
//     with the run seed, reshuffled every epoch
//   - validation loader on InnerBackend, fixed order
//   - one scheduler for the whole run: total steps are
//     epochs × training batches
//   - after each epoch: CSV row, epoch checkpoint, and a "best"
//     checkpoint whenever validation loss improves
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, ensure, Result};
use burn::optim::AdamConfig;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::SequenceBatcher,
    dataloader::{BatchLoader, BatchSource},
    dataset::SequenceDataset,
};
use crate::domain::metrics::EpochMetrics;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    backend::{default_device, InnerBackend, TrainBackend},
    model::RecurrentClassifier,
    runner::EpochRunner,
};

/// Outcome of a full training run.
#[derive(Debug, Clone, Copy)]
pub struct TrainingSummary {
    pub best_epoch: usize,
    pub best:       EpochMetrics,
    pub last:       EpochMetrics,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: SequenceDataset,
    val_dataset:   SequenceDataset,
    ckpt_manager:  &CheckpointManager,
    metrics_log:   &MetricsLogger,
) -> Result<TrainingSummary> {
    ensure!(cfg.epochs > 0, "epochs must be at least 1");

    let device = default_device();
    tracing::info!("Using device: {:?}", device);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config()?;
    let mut model: RecurrentClassifier<TrainBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} GRU layers, hidden_size={}, {} classes",
        model.num_layers(), model_cfg.hidden_size, model_cfg.num_classes,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Loaders ───────────────────────────────────────────────────────────────
    let batcher = SequenceBatcher::new(cfg.max_seq_len);
    tracing::info!("Sequences padded or truncated to {} tokens", batcher.seq_len());
    let train_loader = BatchLoader::<TrainBackend>::new(
        train_dataset, batcher.clone(), cfg.batch_size, device.clone(),
    )
    .with_shuffle(cfg.seed);
    let val_loader = BatchLoader::<InnerBackend>::new(
        val_dataset, batcher, cfg.batch_size, device.clone(),
    );
    tracing::info!(
        "{} training examples in {} batches, {} validation examples in {} batches",
        train_loader.num_items(),
        train_loader.num_batches(),
        val_loader.num_items(),
        val_loader.num_batches(),
    );

    // ── Schedule and runner ───────────────────────────────────────────────────
    let total_steps   = cfg.epochs * train_loader.num_batches();
    let mut scheduler = cfg.schedule.build(cfg.lr, total_steps);
    let runner        = EpochRunner::default().with_clip_norm(cfg.clip_norm);
    tracing::info!(
        "{:?} schedule over {} steps, gradients clipped to global norm {}",
        cfg.schedule, total_steps, runner.clip_norm(),
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut best: Option<(usize, EpochMetrics)> = None;
    let mut last: Option<EpochMetrics> = None;

    for epoch in 1..=cfg.epochs {
        println!("Epoch {epoch}/{}", cfg.epochs);

        let (next, metrics) = runner.run_epoch(
            model, &mut optim, &train_loader, &val_loader, &mut scheduler, &device,
        )?;
        model = next;

        metrics_log.log(epoch, &metrics)?;
        ckpt_manager.save_model(&model, epoch)?;

        let improved = best.map_or(true, |(_, b)| metrics.is_improvement(b.val.loss));
        if improved {
            ckpt_manager.save_best(&model, epoch)?;
            tracing::info!("New best validation loss {:.4} at epoch {}", metrics.val.loss, epoch);
            best = Some((epoch, metrics));
        }
        last = Some(metrics);
    }

    let (Some((best_epoch, best)), Some(last)) = (best, last) else {
        bail!("training finished without completing an epoch");
    };

    tracing::info!("Training complete! Best epoch: {}", best_epoch);
    Ok(TrainingSummary { best_epoch, best, last })
}
