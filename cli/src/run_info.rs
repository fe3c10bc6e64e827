use std::path::{Path, PathBuf};

use cifar_training::{MODEL_FILE, RunRecord, TrainError, latest_checkpoint, saved_epochs};

/// Metrics parsed from an epoch's log files
#[derive(Debug, Default, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: Option<f64>,
    pub accuracy: Option<f64>,
}

/// Summary of a run directory: its record, checkpoints and metrics
#[derive(Debug)]
pub struct RunInfo {
    pub run_dir: PathBuf,
    pub record: RunRecord,
    pub latest_checkpoint: Option<usize>,
    pub saved_epochs: Vec<usize>,
    pub total_epochs: usize,
    pub train_metrics: Vec<EpochMetrics>,
    pub valid_metrics: Vec<EpochMetrics>,
    pub has_final_model: bool,
}

impl RunInfo {
    pub fn load(path: &Path) -> Result<Self, TrainError> {
        let (run_dir, mut record) = RunRecord::locate(path)?;
        record.plan.rebase(&run_dir);

        let checkpoint_dir = record.plan.checkpoint_dir();
        let latest_checkpoint = latest_checkpoint(&checkpoint_dir);
        let saved_epochs = saved_epochs(&checkpoint_dir);

        let has_final_model = run_dir.join(format!("{MODEL_FILE}.mpk")).exists();

        let train_metrics = parse_epoch_metrics(&run_dir.join("train"));
        let valid_metrics = parse_epoch_metrics(&run_dir.join("valid"));

        let total_epochs = train_metrics.len().max(valid_metrics.len());

        Ok(RunInfo {
            run_dir,
            record,
            latest_checkpoint,
            saved_epochs,
            total_epochs,
            train_metrics,
            valid_metrics,
            has_final_model,
        })
    }
}

/// Parse metrics from all epochs in a metrics directory (train/ or valid/)
fn parse_epoch_metrics(metrics_dir: &Path) -> Vec<EpochMetrics> {
    let mut metrics: Vec<EpochMetrics> = std::fs::read_dir(metrics_dir)
        .into_iter()
        .flatten()
        .filter_map(std::result::Result::ok)
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            let epoch: usize = name.strip_prefix("epoch-")?.parse().ok()?;
            Some((epoch, e.path()))
        })
        .map(|(epoch, path)| EpochMetrics {
            epoch,
            loss: parse_metric_log(&path.join("Loss.log")).map(|v| average(&v)),
            accuracy: parse_metric_log(&path.join("Accuracy.log")).map(|v| average(&v)),
        })
        .collect();

    metrics.sort_by_key(|m| m.epoch);
    metrics
}

/// Parse a metric log file (CSV format: value,step)
fn parse_metric_log(path: &Path) -> Option<Vec<f64>> {
    let content = std::fs::read_to_string(path).ok()?;
    let values: Vec<f64> = content
        .lines()
        .filter_map(|line| line.split(',').next()?.trim().parse().ok())
        .collect();

    if values.is_empty() { None } else { Some(values) }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

// UI helpers
const BOX_WIDTH: usize = 66;

fn box_top(title: &str) {
    let padding = BOX_WIDTH.saturating_sub(5 + title.chars().count());
    println!("╭─ {title} {}╮", "─".repeat(padding));
}

fn box_bottom() {
    println!("╰{}╯", "─".repeat(BOX_WIDTH - 2));
}

fn box_row(label: &str, value: impl std::fmt::Display) {
    let content = format!(" {label:<15} {value}");
    let padding = (BOX_WIDTH - 2).saturating_sub(content.chars().count());
    println!("│{content}{}│", " ".repeat(padding));
}

fn progress_bar(current: usize, total: usize, width: usize) -> String {
    let pct = if total > 0 {
        (current as f64 / total as f64).min(1.0)
    } else {
        0.0
    };
    let filled = (pct * width as f64) as usize;
    format!(
        "[{}{}] {:.0}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        pct * 100.0
    )
}

fn print_metrics_table(title: &str, metrics: &[EpochMetrics]) {
    box_top(title);
    println!("│ {:>5} │ {:>10} │ {:>10} │", "Epoch", "Loss", "Accuracy");
    println!("├───────┼────────────┼────────────┤");
    for m in metrics {
        let loss = m.loss.map_or("-".into(), |v| format!("{v:.4}"));
        let acc = m.accuracy.map_or("-".into(), |v| format!("{v:.2}%"));
        println!("│ {:>5} │ {:>10} │ {:>10} │", m.epoch, loss, acc);
    }
    box_bottom();
    println!();
}

fn print_latest(title: &str, metrics: &[EpochMetrics]) {
    let Some(m) = metrics.last() else {
        return;
    };
    box_top(&format!("{title} (epoch {})", m.epoch));
    if let Some(v) = m.loss {
        box_row("Loss:", format!("{v:.4}"));
    }
    if let Some(v) = m.accuracy {
        box_row("Accuracy:", format!("{v:.2}%"));
    }
    box_bottom();
    println!();
}

/// Pretty-print the run info
pub fn print_info(info: &RunInfo, verbose: bool) {
    let params = &info.record.params;
    let model = &params.model;
    let plan = &info.record.plan;

    println!("╭{}╮", "─".repeat(BOX_WIDTH - 2));
    println!("│{:^width$}│", "Training Run Info", width = BOX_WIDTH - 2);
    println!("╰{}╯", "─".repeat(BOX_WIDTH - 2));
    println!();

    box_top("Run");
    box_row("Directory:", info.run_dir.display());
    box_row("Logger:", &info.record.identity.name);
    box_row("Version:", &info.record.identity.version);
    box_bottom();
    println!();

    box_top("Model Configuration");
    box_row("Width:", model.width);
    box_row("Hidden:", model.hidden);
    box_row("Dropout:", model.dropout);
    box_row("Binarize:", model.binarize);
    box_bottom();
    println!();

    box_top("Trainer Configuration");
    box_row("Batch Size:", model.batch_size);
    box_row("Learning Rate:", format!("{:.2e}", model.learning_rate));
    box_row("Max Epochs:", plan.max_epochs());
    box_row("GPUs:", &plan.gpus);
    box_row(
        "Distributed:",
        plan.distributed_backend
            .map_or_else(|| "none".to_string(), |b| b.to_string()),
    );
    box_row("Fast Dev Run:", plan.fast_dev_run);
    box_row("Overfit Pct:", plan.overfit_pct);
    box_row(
        "Early Stop:",
        plan.early_stopping.as_ref().map_or_else(
            || "off".to_string(),
            |es| format!("{} (patience {})", es.monitor, es.patience),
        ),
    );
    box_row(
        "Checkpoints:",
        match &plan.checkpoint {
            cifar_training::CheckpointSetting::FrameworkDefault => "framework default".to_string(),
            cifar_training::CheckpointSetting::Periodic { period, .. } => {
                format!("every {period} epochs")
            }
        },
    );
    box_bottom();
    println!();

    box_top("Training Progress");
    box_row(
        "Progress:",
        progress_bar(info.total_epochs, plan.max_epochs(), 30),
    );
    box_row(
        "Epochs:",
        format!("{} / {}", info.total_epochs, plan.max_epochs()),
    );
    if let Some(cp) = info.latest_checkpoint {
        box_row("Latest Ckpt:", format!("epoch {cp}"));
    }
    box_row(
        "Final Model:",
        if info.has_final_model { "yes" } else { "no" },
    );
    box_bottom();
    println!();

    print_latest("Latest Training Metrics", &info.train_metrics);
    print_latest("Latest Validation Metrics", &info.valid_metrics);

    if verbose && !info.saved_epochs.is_empty() {
        let epochs: Vec<String> = info.saved_epochs.iter().map(ToString::to_string).collect();
        box_top("Saved Checkpoints");
        box_row("Epochs:", epochs.join(", "));
        box_bottom();
        println!();
    }

    if verbose && !info.train_metrics.is_empty() {
        print_metrics_table("Training Metrics by Epoch", &info.train_metrics);
    }

    if verbose && !info.valid_metrics.is_empty() {
        print_metrics_table("Validation Metrics by Epoch", &info.valid_metrics);
    }
}
