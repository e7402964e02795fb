// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
//   1. `train`    - trains the classifier on a TSV file
//   2. `evaluate` - scores a saved checkpoint on a TSV file

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

use crate::application::{
    evaluate_use_case::EvaluateUseCase,
    train_use_case::TrainUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "seq-finetune",
    version,
    about = "Train a recurrent text classifier with gradient clipping and LR scheduling."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on: {}", args.data);
    let checkpoint_dir = args.checkpoint_dir.clone();

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete. Best epoch {} ({}). Checkpoints in '{}'.",
        summary.best_epoch, summary.best, checkpoint_dir,
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let use_case = EvaluateUseCase::new(&args.checkpoint_dir)?;
    let metrics  = use_case.evaluate(&args.data)?;

    println!(
        "Loss: {:.4} | Acc: {:.4} | Batches: {}",
        metrics.loss, metrics.accuracy, metrics.batches,
    );
    Ok(())
}
