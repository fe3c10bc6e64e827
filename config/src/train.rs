//! Trainer flags and model hyperparameters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{GpuSpec, Toggle};

/// Flags that configure the trainer: devices, epochs, callbacks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct TrainerFlags {
    /// GPU count or comma-separated device indices
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1"))]
    pub gpus: GpuSpec,
    /// Number of nodes
    #[serde(default = "default_nodes")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1"))]
    pub nodes: usize,
    /// Maximum number of training epochs
    #[serde(default = "default_max_nb_epochs")]
    #[cfg_attr(
        feature = "clap",
        arg(long = "max_nb_epochs", default_value = "500", value_parser = parse_positive)
    )]
    pub max_nb_epochs: usize,
    /// Run a single train and validation batch (0 or 1)
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0"))]
    pub debug: Toggle,
    /// Fraction of the data to train and validate on (0 uses all of it)
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long = "overfit_pct", default_value = "0.0"))]
    pub overfit_pct: f64,
    /// Stop when validation loss stops improving (0 or 1)
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long = "early-stopping", default_value = "0"))]
    pub early_stopping: Toggle,
    /// Data loader worker threads (0 loads on the training thread)
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long = "num-data-loaders", default_value = "0"))]
    pub num_data_loaders: usize,
    /// Save a checkpoint every N epochs (0 uses the framework default)
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long = "save-weights-every-n", default_value = "0"))]
    pub save_weights_every_n: usize,
}

fn default_nodes() -> usize {
    1
}
fn default_max_nb_epochs() -> usize {
    500
}

impl Default for TrainerFlags {
    fn default() -> Self {
        Self {
            gpus: GpuSpec::default(),
            nodes: default_nodes(),
            max_nb_epochs: default_max_nb_epochs(),
            debug: Toggle::default(),
            overfit_pct: 0.0,
            early_stopping: Toggle::default(),
            num_data_loaders: 0,
            save_weights_every_n: 0,
        }
    }
}

/// Hyperparameters owned by the classifier and its data pipeline.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct ModelHparams {
    #[serde(default = "default_learning_rate")]
    #[cfg_attr(feature = "clap", arg(long = "learning_rate", default_value = "0.001"))]
    pub learning_rate: f64,
    #[serde(default = "default_batch_size")]
    #[cfg_attr(
        feature = "clap",
        arg(long = "batch_size", default_value = "64", value_parser = parse_positive)
    )]
    pub batch_size: usize,
    /// Channels in the first convolution block; later blocks double it
    #[serde(default = "default_width")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "64", value_parser = parse_positive))]
    pub width: usize,
    /// Units in the hidden dense layer
    #[serde(default = "default_hidden")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "512", value_parser = parse_positive))]
    pub hidden: usize,
    #[serde(default = "default_dropout")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0.2"))]
    pub dropout: f64,
    /// Binarize hidden weights and activations
    #[serde(default = "default_true")]
    #[cfg_attr(
        feature = "clap",
        arg(long, default_value = "true", action = clap::ArgAction::Set)
    )]
    pub binarize: bool,
}

fn default_learning_rate() -> f64 {
    1e-3
}
fn default_batch_size() -> usize {
    64
}
fn default_width() -> usize {
    64
}
fn default_hidden() -> usize {
    512
}
fn default_dropout() -> f64 {
    0.2
}
fn default_true() -> bool {
    true
}

impl Default for ModelHparams {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            batch_size: default_batch_size(),
            width: default_width(),
            hidden: default_hidden(),
            dropout: default_dropout(),
            binarize: default_true(),
        }
    }
}

/// Full hyperparameter record for a training run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct TrainParams {
    #[serde(default, flatten)]
    #[cfg_attr(feature = "clap", command(flatten))]
    pub trainer: TrainerFlags,
    #[serde(default, flatten)]
    #[cfg_attr(feature = "clap", command(flatten))]
    pub model: ModelHparams,
    /// Resume a previous run from its directory
    #[serde(skip)]
    #[cfg_attr(feature = "clap", arg(long = "restart-from-checkpoint"))]
    pub restart_from_checkpoint: Option<PathBuf>,
    /// Where CIFAR-10 is downloaded and extracted
    #[serde(default = "default_data_root")]
    #[cfg_attr(feature = "clap", arg(long = "data-root", default_value = "./data"))]
    pub data_root: PathBuf,
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub seed: Option<u64>,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            trainer: TrainerFlags::default(),
            model: ModelHparams::default(),
            restart_from_checkpoint: None,
            data_root: default_data_root(),
            seed: None,
        }
    }
}

/// Parse a strictly positive integer flag.
pub fn parse_positive(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{s}' is not a positive integer")),
    }
}
