//! cifar-seed data - CIFAR-10 loading and batching
//!
//! This crate provides:
//! - `Cifar10` - download, extraction and the train/test image-folder splits
//! - `CifarBatcher` - normalized image batches for training
//! - `sample_n`, `whole`, `fraction_len` - shuffled, truncated dataset views

pub mod batcher;
pub mod dataset;
pub mod subset;

pub use batcher::{CIFAR10_MEAN, CIFAR10_STD, CifarBatch, CifarBatcher};
pub use dataset::{CIFAR10_DIR, CIFAR10_URL, Cifar10, CifarItem, DataError, unpack};
pub use subset::{Subset, fraction_len, sample_n, whole};
