use std::{path::PathBuf, process::ExitCode};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use cifar_cli::run_info;
use cifar_config::TrainParams;
use cifar_core::{TrainingBackend, backend_name, resolve_devices};
use cifar_training::{FitOutcome, RunIdentity, TrainError, Trainer};

#[derive(Parser)]
#[command(
    name = "cifar-seed",
    about = "Train a binarized CIFAR-10 classifier",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Training parameters (used when no subcommand is given)
    #[command(flatten)]
    params: TrainParams,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a training run
    Info {
        /// Run directory to inspect
        run_dir: PathBuf,
        /// Show detailed metrics for each epoch
        #[arg(long, short)]
        verbose: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => match train(cli.params) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        },
        Some(Commands::Info { run_dir, verbose }) => match run_info::RunInfo::load(&run_dir) {
            Ok(info) => {
                run_info::print_info(&info, verbose);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error loading run info from {}: {e}", run_dir.display());
                ExitCode::FAILURE
            }
        },
        Some(Commands::Completions { shell }) => {
            generate(shell, &mut Cli::command(), "cifar-seed", &mut std::io::stdout());
            ExitCode::SUCCESS
        }
    }
}

fn train(params: TrainParams) -> Result<(), TrainError> {
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let identity = RunIdentity::at(root, &chrono::Local::now());

    let trainer = Trainer::configure(params, identity)?;
    let plan = &trainer.plan;
    let model = &trainer.params.model;

    match trainer.resume_epoch {
        Some(epoch) => println!("Resuming training from epoch {epoch}"),
        None => println!("Training binarized CIFAR-10 classifier..."),
    }
    println!("Run directory: {}", plan.run_dir.display());
    println!(
        "Backend: {}, GPUs: {}, Distributed: {}",
        backend_name(),
        plan.gpus,
        plan.distributed_backend
            .map_or_else(|| "none".to_string(), |b| b.to_string())
    );
    println!(
        "Batch size: {}, Epochs: {}, LR: {}",
        model.batch_size,
        plan.max_epochs(),
        model.learning_rate
    );
    println!(
        "Model: width {}, hidden {}, binarize {}",
        model.width, model.hidden, model.binarize
    );
    if plan.fast_dev_run {
        println!("Fast dev run: one batch, one epoch, no checkpoints");
    }
    if let Some(seed) = trainer.params.seed {
        println!("Using fixed RNG seed: {seed}");
    }

    let devices = resolve_devices(&plan.gpus);
    match trainer.fit::<TrainingBackend>(devices)? {
        FitOutcome::Trained { run_dir, epochs } => {
            println!("Finished {epochs} epochs; model saved to {}", run_dir.display());
        }
        FitOutcome::AlreadyComplete { epoch, max_epochs } => {
            println!(
                "Training already completed (checkpoint {epoch} >= epochs {max_epochs}). Nothing to do."
            );
        }
    }
    Ok(())
}
