//! Early stopping and checkpoint settings, and their burn strategies.

use std::path::PathBuf;

use burn::{
    prelude::Backend,
    train::{
        MetricEarlyStoppingStrategy, StoppingCondition,
        checkpoint::{CheckpointingAction, CheckpointingStrategy},
        metric::{
            LossMetric,
            store::{Aggregate, Direction, EventStoreClient, Split},
        },
    },
};
use serde::{Deserialize, Serialize};

/// Metric an early-stopping callback watches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Monitor {
    /// Mean loss over the validation split
    ValLoss,
}

impl std::fmt::Display for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValLoss => write!(f, "val_loss"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Min,
    Max,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopping {
    pub monitor: Monitor,
    pub min_delta: f64,
    /// Epochs without improvement before stopping
    pub patience: usize,
    pub mode: Mode,
}

impl EarlyStopping {
    /// Stop after 3 epochs without a lower validation loss.
    #[must_use]
    pub fn val_loss() -> Self {
        Self {
            monitor: Monitor::ValLoss,
            min_delta: 0.0,
            patience: 3,
            mode: Mode::Min,
        }
    }

    pub fn strategy<B: Backend>(&self) -> MetricEarlyStoppingStrategy {
        if self.min_delta != 0.0 {
            tracing::warn!(
                "min_delta {} ignored: any improvement resets patience",
                self.min_delta
            );
        }
        let direction = match self.mode {
            Mode::Min => Direction::Lowest,
            Mode::Max => Direction::Highest,
        };
        let metric = match self.monitor {
            Monitor::ValLoss => LossMetric::<B>::new(),
        };
        MetricEarlyStoppingStrategy::new(
            &metric,
            Aggregate::Mean,
            direction,
            Split::Valid,
            StoppingCondition::NoImprovementSince {
                n_epochs: self.patience,
            },
        )
    }
}

/// How checkpoints are taken during `fit`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CheckpointSetting {
    /// burn's built-in checkpointing strategy
    FrameworkDefault,
    /// Save every `period` epochs into `dir` and keep every checkpoint
    Periodic { dir: PathBuf, period: usize },
}

impl CheckpointSetting {
    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, Self::FrameworkDefault)
    }
}

/// Saves on every epoch divisible by `period`, never deletes.
#[derive(Clone, Debug)]
pub struct EveryNEpochs {
    period: usize,
}

impl EveryNEpochs {
    /// `period` of zero is treated as one.
    #[must_use]
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    #[must_use]
    pub fn saves_at(&self, epoch: usize) -> bool {
        epoch > 0 && epoch % self.period == 0
    }
}

impl CheckpointingStrategy for EveryNEpochs {
    fn checkpointing(
        &mut self,
        epoch: usize,
        _collector: &EventStoreClient,
    ) -> Vec<CheckpointingAction> {
        if self.saves_at(epoch) {
            vec![CheckpointingAction::Save]
        } else {
            Vec::new()
        }
    }
}
