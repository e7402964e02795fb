// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Everything that touches the checkpoint directory:
//
//   checkpoint.rs      - model weights via Burn's CompactRecorder,
//                        plus train_config.json so `evaluate` can
//                        rebuild the same architecture
//
//   tokenizer_store.rs - word-level tokenizer built from the
//                        training texts, saved as tokenizer.json
//
//   metrics.rs         - one CSV row per epoch
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
