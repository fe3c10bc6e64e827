#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

//! This is the facade crate that re-exports commonly used items
//! from all sub-crates and provides the `cifar-seed` binary.

pub mod run_info;

pub use cifar_config::{GpuSpec, ModelHparams, Toggle, TrainParams, TrainerFlags};
pub use cifar_core::{
    BnnClassifier, BnnClassifierConfig, GpuBackend, TrainingBackend, backend_name, resolve_devices,
};
pub use cifar_data::{Cifar10, CifarBatch, CifarBatcher};
pub use cifar_training::{
    FitOutcome, RunIdentity, RunRecord, TrainError, Trainer, TrainerPlan, latest_checkpoint,
};
