//! The resolved trainer arguments of a run.

use std::path::{Path, PathBuf};

use cifar_config::{GpuSpec, TrainParams};
use serde::{Deserialize, Serialize};

use crate::{
    TrainError,
    callbacks::{CheckpointSetting, EarlyStopping},
    logger::{CHECKPOINT_DIR, RunIdentity},
};

/// Multi-device distribution mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributedBackend {
    /// Replicate the model on every device and split each batch
    #[serde(rename = "dp")]
    DataParallel,
}

impl std::fmt::Display for DistributedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataParallel => write!(f, "dp"),
        }
    }
}

/// Everything the learner is built from, resolved from the hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainerPlan {
    pub run_dir: PathBuf,
    pub max_nb_epochs: usize,
    pub gpus: GpuSpec,
    pub distributed_backend: Option<DistributedBackend>,
    pub nodes: usize,
    pub show_progress_bar: bool,
    pub overfit_pct: f64,
    pub fast_dev_run: bool,
    pub early_stopping: Option<EarlyStopping>,
    pub checkpoint: CheckpointSetting,
    pub num_data_loaders: usize,
}

impl TrainerPlan {
    /// Resolve the plan of a fresh run.
    pub fn fresh(params: &TrainParams, identity: &RunIdentity) -> Result<Self, TrainError> {
        let flags = &params.trainer;

        if !(0.0..=1.0).contains(&flags.overfit_pct) {
            return Err(TrainError::OverfitRange(flags.overfit_pct));
        }

        let early_stopping = flags
            .early_stopping
            .is_on()
            .then(EarlyStopping::val_loss);

        let checkpoint = match flags.save_weights_every_n {
            0 => CheckpointSetting::FrameworkDefault,
            period => CheckpointSetting::Periodic {
                dir: identity.checkpoint_dir(),
                period,
            },
        };

        let distributed_backend =
            (!flags.gpus.is_single()).then_some(DistributedBackend::DataParallel);

        Ok(Self {
            run_dir: identity.run_dir(),
            max_nb_epochs: flags.max_nb_epochs,
            gpus: flags.gpus.clone(),
            distributed_backend,
            nodes: flags.nodes,
            show_progress_bar: true,
            overfit_pct: flags.overfit_pct,
            fast_dev_run: flags.debug.is_on(),
            early_stopping,
            checkpoint,
            num_data_loaders: flags.num_data_loaders,
        })
    }

    /// Epochs `fit` runs for.
    #[must_use]
    pub fn max_epochs(&self) -> usize {
        if self.fast_dev_run {
            1
        } else {
            self.max_nb_epochs
        }
    }

    #[must_use]
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.run_dir.join(CHECKPOINT_DIR)
    }

    /// Whether a checkpointer is registered with the learner.
    #[must_use]
    pub fn checkpoints_enabled(&self) -> bool {
        !self.fast_dev_run
    }

    /// Point the plan at a run directory that has moved since it was recorded.
    pub fn rebase(&mut self, run_dir: &Path) {
        self.run_dir = run_dir.to_path_buf();
        if let CheckpointSetting::Periodic { dir, .. } = &mut self.checkpoint {
            *dir = run_dir.join(CHECKPOINT_DIR);
        }
    }
}

#[cfg(test)]
mod tests {
    use cifar_config::{Toggle, TrainerFlags};

    use super::*;

    fn identity() -> RunIdentity {
        RunIdentity::new("/work", "lightning_logs", "2024-01-01_00-00-00")
    }

    fn plan(flags: TrainerFlags) -> TrainerPlan {
        let params = TrainParams {
            trainer: flags,
            ..TrainParams::default()
        };
        TrainerPlan::fresh(&params, &identity()).unwrap()
    }

    #[test]
    fn test_early_stopping_only_when_enabled() {
        let on = plan(TrainerFlags {
            early_stopping: Toggle(true),
            ..TrainerFlags::default()
        });
        assert_eq!(on.early_stopping, Some(EarlyStopping::val_loss()));

        let off = plan(TrainerFlags::default());
        assert_eq!(off.early_stopping, None);
    }

    #[test]
    fn test_checkpoint_setting() {
        let default = plan(TrainerFlags::default());
        assert!(default.checkpoint.is_default());

        let periodic = plan(TrainerFlags {
            save_weights_every_n: 4,
            ..TrainerFlags::default()
        });
        assert_eq!(
            periodic.checkpoint,
            CheckpointSetting::Periodic {
                dir: PathBuf::from("/work/lightning_logs/version_2024-01-01_00-00-00/checkpoint"),
                period: 4,
            }
        );
    }

    #[test]
    fn test_data_parallel_unless_single_gpu() {
        let single = plan(TrainerFlags {
            gpus: GpuSpec::Count(1),
            ..TrainerFlags::default()
        });
        assert_eq!(single.distributed_backend, None);

        for gpus in [
            GpuSpec::Count(0),
            GpuSpec::Count(2),
            GpuSpec::Indices(vec![0, 1]),
            GpuSpec::Indices(vec![1]),
        ] {
            let p = plan(TrainerFlags {
                gpus,
                ..TrainerFlags::default()
            });
            assert_eq!(p.distributed_backend, Some(DistributedBackend::DataParallel));
        }
    }

    #[test]
    fn test_example_invocation() {
        // --max_nb_epochs 10 --gpus 1 --early-stopping 1 --save-weights-every-n 0
        let p = plan(TrainerFlags {
            max_nb_epochs: 10,
            gpus: GpuSpec::Count(1),
            early_stopping: Toggle(true),
            save_weights_every_n: 0,
            ..TrainerFlags::default()
        });
        assert_eq!(p.max_nb_epochs, 10);
        assert_eq!(p.max_epochs(), 10);
        assert_eq!(p.distributed_backend, None);
        let es = p.early_stopping.unwrap();
        assert_eq!(es.patience, 3);
        assert_eq!(es.monitor.to_string(), "val_loss");
        assert_eq!(p.checkpoint, CheckpointSetting::FrameworkDefault);
        assert!(p.show_progress_bar);
    }

    #[test]
    fn test_fast_dev_run() {
        let p = plan(TrainerFlags {
            debug: Toggle(true),
            max_nb_epochs: 50,
            ..TrainerFlags::default()
        });
        assert!(p.fast_dev_run);
        assert_eq!(p.max_epochs(), 1);
        assert!(!p.checkpoints_enabled());
    }

    #[test]
    fn test_overfit_range() {
        let params = TrainParams {
            trainer: TrainerFlags {
                overfit_pct: 1.5,
                ..TrainerFlags::default()
            },
            ..TrainParams::default()
        };
        let err = TrainerPlan::fresh(&params, &identity()).unwrap_err();
        assert!(matches!(err, TrainError::OverfitRange(_)));

        let params = TrainParams {
            trainer: TrainerFlags {
                overfit_pct: -0.1,
                ..TrainerFlags::default()
            },
            ..TrainParams::default()
        };
        assert!(TrainerPlan::fresh(&params, &identity()).is_err());
    }

    #[test]
    fn test_rebase() {
        let mut p = plan(TrainerFlags {
            save_weights_every_n: 2,
            ..TrainerFlags::default()
        });
        p.rebase(Path::new("/moved/version_x"));
        assert_eq!(p.run_dir, PathBuf::from("/moved/version_x"));
        assert_eq!(
            p.checkpoint,
            CheckpointSetting::Periodic {
                dir: PathBuf::from("/moved/version_x/checkpoint"),
                period: 2,
            }
        );
    }
}
