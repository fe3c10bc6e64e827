#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]

//! cifar-seed core
//!
//! This crate provides:
//! - `GpuBackend` / `TrainingBackend` - backend aliases picked by cargo feature
//! - `resolve_devices` - devices for a `GpuSpec`
//! - `BinaryConv2d`, `BinaryLinear` - sign-binarized layers
//! - `BnnClassifier` - the CIFAR-10 classifier

pub mod backend;
pub mod binary;
pub mod model;

pub use backend::{GpuBackend, GpuDevice, TrainingBackend, backend_name, resolve_devices};
pub use binary::{BinaryConv2d, BinaryLinear, binarize, hard_tanh};
pub use cifar_config::{GpuSpec, ModelHparams, TrainParams, TrainerFlags};
pub use model::{BnnClassifier, BnnClassifierConfig, IMAGE_SIZE, NUM_CLASSES};
