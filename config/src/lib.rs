//! Hyperparameter records and flag types shared between the cifar-seed crates.

mod train;
mod types;

pub use train::*;
pub use types::*;
