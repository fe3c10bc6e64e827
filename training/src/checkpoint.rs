//! Checkpoint discovery for resumed runs.

use std::path::Path;

/// Files burn's file checkpointer writes per epoch.
const CHECKPOINT_PARTS: [&str; 3] = ["model", "optim", "scheduler"];

/// Find the latest checkpoint epoch in `checkpoint_dir`.
/// Only returns epochs where all three checkpoint files (model, optim, scheduler) exist.
#[must_use]
pub fn latest_checkpoint(checkpoint_dir: &Path) -> Option<usize> {
    std::fs::read_dir(checkpoint_dir)
        .ok()?
        .filter_map(std::result::Result::ok)
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.strip_prefix("model-")?
                .strip_suffix(".mpk")?
                .parse::<usize>()
                .ok()
        })
        .filter(|epoch| {
            let complete = is_complete(checkpoint_dir, *epoch);
            if !complete {
                tracing::warn!("checkpoint {epoch} is incomplete (missing optim/scheduler), skipping");
            }
            complete
        })
        .max()
}

/// Whether every part of the checkpoint for `epoch` exists.
#[must_use]
pub fn is_complete(checkpoint_dir: &Path, epoch: usize) -> bool {
    CHECKPOINT_PARTS
        .iter()
        .all(|part| checkpoint_dir.join(format!("{part}-{epoch}.mpk")).is_file())
}

/// Epochs with a saved model file, ascending.
#[must_use]
pub fn saved_epochs(checkpoint_dir: &Path) -> Vec<usize> {
    let mut epochs: Vec<usize> = std::fs::read_dir(checkpoint_dir)
        .into_iter()
        .flatten()
        .filter_map(std::result::Result::ok)
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.strip_prefix("model-")?.strip_suffix(".mpk")?.parse().ok()
        })
        .collect();
    epochs.sort_unstable();
    epochs
}
