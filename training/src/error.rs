use std::path::PathBuf;

use cifar_data::DataError;

/// Errors that end a training run before or during `fit`.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("failed to create run directory {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("failed to read run record {0}: {1}")]
    ReadRecord(PathBuf, String),
    #[error("failed to write run record {0}: {1}")]
    WriteRecord(PathBuf, String),
    #[error("no run record found at {0} (expected a run directory containing hparams.json)")]
    MissingRecord(PathBuf),
    #[error("no complete checkpoint found in {0}")]
    NoCheckpoint(PathBuf),
    #[error("overfit_pct must be within [0, 1], got {0}")]
    OverfitRange(f64),
    #[error("multi-node training is not supported (nodes = {0}); launch one process per node")]
    MultiNode(usize),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("failed to save model to {0}: {1}")]
    SaveModel(PathBuf, String),
}
