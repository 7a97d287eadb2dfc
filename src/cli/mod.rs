// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Arguments are parsed
// with clap and every command is delegated to one Layer 2 use
// case:
//
//   1. `index`    - rebuild the PubMed index from PubMed dumps
//   2. `build`    - construct PU tasks from the index
//   3. `train`    - PU (or PN baseline) training on a task's splits
//   4. `evaluate` - score a split with a trained checkpoint
//
// Any error bubbles up to main and ends the process with a
// non-zero exit code.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BuildArgs, Commands, EvaluateArgs, IndexArgs, TrainArgs};

use crate::application::{
    build_use_case::BuildUseCase,
    evaluate_use_case::EvaluateUseCase,
    index_use_case::IndexUseCase,
    train_use_case::TrainUseCase,
};
use crate::infra::metrics::BinaryCounts;

#[derive(Parser, Debug)]
#[command(
    name = "pubmed-pu",
    version,
    about = "Build PubMed PU benchmark tasks and train nnPU classifiers on them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case. Never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Index(args)    => run_index(args),
            Commands::Build(args)    => run_build(args),
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_index(args: IndexArgs) -> Result<()> {
    tracing::info!("Indexing dumps from '{}' into '{}'", args.dump_dir, args.es.index_name);
    let report = IndexUseCase::new(args.into()).execute()?;
    println!(
        "Indexed {} documents from {} files ({} skipped, {} partial writes).",
        report.indexed, report.files, report.skipped, report.partial
    );
    Ok(())
}

fn run_build(args: BuildArgs) -> Result<()> {
    let dirs = BuildUseCase::new(args.into()).execute()?;
    println!("Built {} tasks:", dirs.len());
    for dir in dirs {
        println!("  {}", dir.display());
    }
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on '{}'", args.train);
    let summary = TrainUseCase::new(args.into()).execute()?;
    match summary.best_epoch {
        Some(epoch) => println!("Training complete. Best validation F1 {:.4} at epoch {}.", summary.best_f1, epoch),
        None        => println!("Training complete. Validation F1 stayed at 0, latest epoch kept."),
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let eval = EvaluateUseCase::new(args.into()).execute()?;
    println!("\nLoss: {:.4}", eval.loss);
    print_counts("label_true", &eval.against_true);
    print_counts("label", &eval.against_noisy);
    Ok(())
}

fn print_counts(name: &str, c: &BinaryCounts) {
    println!(
        "Against {:<10} accuracy={:.4} precision={:.4} recall={:.4} f1={:.4} (tp={} fp={} tn={} fn={})",
        name,
        c.accuracy(), c.precision(), c.recall(), c.f1(),
        c.true_positive, c.false_positive, c.true_negative, c.false_negative,
    );
}
