#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::too_many_lines,
    clippy::type_complexity
)]

pub mod callbacks;
pub mod checkpoint;
pub mod classification;
mod error;
pub mod logger;
pub mod plan;
pub mod trainer;

pub use callbacks::{CheckpointSetting, EarlyStopping, EveryNEpochs, Mode, Monitor};
pub use checkpoint::{is_complete, latest_checkpoint, saved_epochs};
pub use classification::CifarClassifier;
pub use error::TrainError;
pub use logger::{
    CHECKPOINT_DIR, DEFAULT_LOGGER_NAME, RECORD_FILE, RunIdentity, RunLogger, RunRecord,
    TRAIN_LOG_DIR, VERSION_FORMAT, last_logged_epoch, timestamp_version,
};
pub use plan::{DistributedBackend, TrainerPlan};
pub use trainer::{FitOutcome, MODEL_FILE, Trainer};
