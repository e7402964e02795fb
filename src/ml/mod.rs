// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// Everything that builds autodiff graphs or steps an optimizer
// lives here.
//
//   backend.rs    - Autodiff<Inner> for training, Inner for eval
//
//   model.rs      - SequenceModel contract and the GRU classifier
//                   • token embedding
//                   • stacked GRU layers with explicit hidden state
//                   • dropout only in Mode::Train
//                   • linear head on the last time step
//
//   objective.rs  - Criterion (cross-entropy) and Metric (accuracy)
//
//   clip.rs       - global gradient-norm clipping
//
//   scheduler.rs  - ConstantLr and OneCycleLr
//
//   runner.rs     - EpochRunner: train_pass, eval_pass, run_epoch
//
//   trainer.rs    - multi-epoch loop with checkpoints and CSV log
//
// Reference: Burn Book §5 (Training)
//            Cho et al. (2014) GRU
//            Smith & Topin (2018) Super-Convergence (one-cycle)

/// Backend aliases and device selection
pub mod backend;

/// Recurrent sequence classifier
pub mod model;

/// Loss and accuracy
pub mod objective;

/// Global gradient-norm clipping
pub mod clip;

/// Learning-rate schedules
pub mod scheduler;

/// The epoch runner: one training pass, one evaluation pass
pub mod runner;

/// Full training run over many epochs
pub mod trainer;
