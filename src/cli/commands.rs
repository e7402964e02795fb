// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and
// their flags.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::ml::scheduler::Schedule;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the sequence classifier on a labelled TSV file
    Train(TrainArgs),

    /// Score a trained checkpoint on a labelled TSV file
    Evaluate(EvaluateArgs),
}

/// Learning-rate schedule, as spelled on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ScheduleArg {
    /// Same rate for every step
    Constant,
    /// Cosine warm-up to --lr, then cosine decay
    OneCycle,
}

impl From<ScheduleArg> for Schedule {
    fn from(a: ScheduleArg) -> Self {
        match a {
            ScheduleArg::Constant => Schedule::Constant,
            ScheduleArg::OneCycle => Schedule::OneCycle,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// TSV file with one `label<TAB>text` example per line
    #[arg(long, default_value = "data/train.tsv")]
    pub data: String,

    /// Directory to save checkpoints, tokenizer and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Tokens kept per example; shorter ones are left-padded
    #[arg(long, default_value_t = 64)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Peak learning rate (the constant rate with --schedule constant)
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Upper bound on the global gradient norm
    #[arg(long, default_value_t = 0.25)]
    pub clip_norm: f64,

    #[arg(long, value_enum, default_value_t = ScheduleArg::OneCycle)]
    pub schedule: ScheduleArg,

    #[arg(long, default_value_t = 128)]
    pub embed_dim: usize,

    /// Width of every GRU layer
    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Dropout probability, applied only while training
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Maximum vocabulary entries, including [PAD] and [UNK]
    #[arg(long, default_value_t = 20000)]
    pub vocab_size: usize,

    /// Share of examples held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub val_fraction: f64,

    /// Seed for the split and the per-epoch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data:           a.data,
            checkpoint_dir: a.checkpoint_dir,
            max_seq_len:    a.max_seq_len,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            clip_norm:      a.clip_norm,
            schedule:       a.schedule.into(),
            embed_dim:      a.embed_dim,
            hidden_size:    a.hidden_size,
            num_layers:     a.num_layers,
            dropout:        a.dropout,
            vocab_size:     a.vocab_size,
            val_fraction:   a.val_fraction,
            seed:           a.seed,
            labels:         Vec::new(),
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// TSV file to score, same format as for training
    #[arg(long)]
    pub data: String,

    /// Directory where `train` saved its checkpoints
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
