// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// From a labelled text file to tensor batches:
//
//   data.tsv
//       │
//       ▼
//   TsvLoader         → reads `label<TAB>text` lines
//       │
//       ▼
//   Preprocessor      → cleans each text to a single line
//       │
//       ▼
//   Tokenizer         → word-level ids (infra::tokenizer_store)
//       │
//       ▼
//   SequenceDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   SequenceBatcher   → pads / truncates and stacks into tensors
//       │
//       ▼
//   BatchLoader       → restartable batch source for the runner

/// Reads labelled examples from TSV files
pub mod loader;

/// Cleans raw example text
pub mod preprocessor;

/// Implements Burn's Dataset trait for tokenised samples
pub mod dataset;

/// Pads, truncates and stacks samples into tensor batches
pub mod batcher;

/// Restartable batch sources consumed by the epoch runner
pub mod dataloader;

/// Seeded train/validation split
pub mod splitter;
