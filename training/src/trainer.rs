//! Configure a run and fit the classifier.

use std::path::{Path, PathBuf};

use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::{Dataset, vision::ImageFolderDataset},
    },
    module::Module,
    optim::AdamConfig,
    record::CompactRecorder,
    tensor::backend::AutodiffBackend,
    train::{
        LearnerBuilder,
        metric::{AccuracyMetric, LossMetric},
        renderer::{MetricState, MetricsRenderer, TrainingProgress},
    },
};
use cifar_config::TrainParams;
use cifar_data::{Cifar10, CifarBatch, CifarBatcher, CifarItem, Subset, fraction_len, sample_n, whole};

use crate::{
    TrainError,
    callbacks::{CheckpointSetting, EveryNEpochs},
    checkpoint::latest_checkpoint,
    classification::CifarClassifier,
    logger::{RunIdentity, RunLogger, RunRecord, last_logged_epoch},
    plan::TrainerPlan,
};

/// File stem of the final model inside the run directory.
pub const MODEL_FILE: &str = "model";

const DEFAULT_SHUFFLE_SEED: u64 = 42;

type View = Subset<ImageFolderDataset, CifarItem>;

/// Renderer for runs without a progress display.
struct QuietRenderer;

impl MetricsRenderer for QuietRenderer {
    fn update_train(&mut self, _state: MetricState) {}
    fn update_valid(&mut self, _state: MetricState) {}
    fn render_train(&mut self, _item: TrainingProgress) {}
    fn render_valid(&mut self, _item: TrainingProgress) {}
}

/// How a call to [`Trainer::fit`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FitOutcome {
    /// Training ran; the final model is at `<run_dir>/model.mpk`.
    /// `epochs` is the last epoch trained, which early stopping can bring
    /// below the cap.
    Trained { run_dir: PathBuf, epochs: usize },
    /// The resumed checkpoint already reached the epoch limit.
    AlreadyComplete { epoch: usize, max_epochs: usize },
}

/// A configured run, fresh or resumed.
#[derive(Clone, Debug)]
pub struct Trainer {
    pub params: TrainParams,
    pub plan: TrainerPlan,
    /// Checkpoint epoch to continue from
    pub resume_epoch: Option<usize>,
}

impl Trainer {
    /// Set up a new run under `identity`: create its directory and record.
    pub fn fresh(params: TrainParams, identity: RunIdentity) -> Result<Self, TrainError> {
        let plan = TrainerPlan::fresh(&params, &identity)?;
        let logger = RunLogger::create(identity)?;
        logger.write_record(&RunRecord {
            identity: logger.identity().clone(),
            params: params.clone(),
            plan: plan.clone(),
        })?;

        Ok(Self {
            params,
            plan,
            resume_epoch: None,
        })
    }

    /// Continue the run containing `path` from its latest complete checkpoint.
    ///
    /// The recorded hyperparameters and plan are used as-is.
    pub fn resume(path: &Path) -> Result<Self, TrainError> {
        let (run_dir, record) = RunRecord::locate(path)?;
        let mut plan = record.plan;
        plan.rebase(&run_dir);

        let checkpoint_dir = plan.checkpoint_dir();
        let epoch = latest_checkpoint(&checkpoint_dir)
            .ok_or(TrainError::NoCheckpoint(checkpoint_dir))?;
        tracing::info!("Resuming {} from epoch {epoch}", run_dir.display());

        Ok(Self {
            params: record.params,
            plan,
            resume_epoch: Some(epoch),
        })
    }

    /// Resume if `params` names a checkpoint, otherwise start a fresh run.
    pub fn configure(params: TrainParams, identity: RunIdentity) -> Result<Self, TrainError> {
        match params.restart_from_checkpoint.clone() {
            Some(path) => {
                tracing::debug!("Ignoring command-line hyperparameters for resumed run");
                Self::resume(&path)
            }
            None => Self::fresh(params, identity),
        }
    }

    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.plan.run_dir
    }

    /// Train on `devices`; an empty list uses the backend's default device.
    pub fn fit<B: AutodiffBackend>(&self, devices: Vec<B::Device>) -> Result<FitOutcome, TrainError> {
        let plan = &self.plan;
        if plan.nodes != 1 {
            return Err(TrainError::MultiNode(plan.nodes));
        }

        let max_epochs = plan.max_epochs();
        if let Some(epoch) = self.resume_epoch.filter(|epoch| *epoch >= max_epochs) {
            return Ok(FitOutcome::AlreadyComplete { epoch, max_epochs });
        }

        if let Some(seed) = self.params.seed {
            B::seed(seed);
        }

        let mut devices = devices;
        if devices.is_empty() {
            devices.push(B::Device::default());
        }
        let device = devices[0].clone();

        let (train, valid) = self.datasets()?;
        tracing::info!("Training on {} items, validating on {}", train.len(), valid.len());
        let (train_loader, valid_loader) = self.dataloaders::<B>(train, valid);

        let model = CifarClassifier::<B>::new(&self.params.model, &device);

        let devices = if plan.distributed_backend.is_some() && devices.len() > 1 {
            devices
        } else {
            vec![device]
        };

        let mut builder = LearnerBuilder::new(plan.run_dir.clone())
            .metric_train_numeric(AccuracyMetric::new())
            .metric_valid_numeric(AccuracyMetric::new())
            .metric_train_numeric(LossMetric::new())
            .metric_valid_numeric(LossMetric::new())
            .with_application_logger(None)
            .devices(devices)
            .num_epochs(max_epochs)
            .summary();

        if !plan.show_progress_bar {
            builder = builder.renderer(QuietRenderer);
        }

        if let Some(early_stopping) = &plan.early_stopping {
            builder = builder.early_stopping(early_stopping.strategy::<B>());
        }

        if plan.checkpoints_enabled() {
            builder = builder.with_file_checkpointer(CompactRecorder::new());
            if let CheckpointSetting::Periodic { period, .. } = &plan.checkpoint {
                builder = builder.with_checkpointing_strategy(EveryNEpochs::new(*period));
            }
        }

        if let Some(epoch) = self.resume_epoch {
            builder = builder.checkpoint(epoch);
        }

        let learner = builder.build(model, AdamConfig::new().init(), self.params.model.learning_rate);
        let trained = learner.fit(train_loader, valid_loader);

        let model_path = plan.run_dir.join(MODEL_FILE);
        trained
            .save_file(model_path.clone(), &CompactRecorder::new())
            .map_err(|e| TrainError::SaveModel(model_path, e.to_string()))?;

        Ok(FitOutcome::Trained {
            run_dir: plan.run_dir.clone(),
            epochs: last_logged_epoch(&plan.run_dir).unwrap_or(max_epochs),
        })
    }

    /// Train and validation views, truncated for fast-dev and overfit runs.
    fn datasets(&self) -> Result<(View, View), TrainError> {
        let root = &self.params.data_root;
        Cifar10::download(root)?;
        let train = Cifar10::train(root)?;
        let valid = Cifar10::test(root)?;

        let plan = &self.plan;
        let seed = self.shuffle_seed();
        let views = if plan.fast_dev_run {
            let n = self.params.model.batch_size;
            (sample_n(train, n, seed), sample_n(valid, n, seed))
        } else if plan.overfit_pct > 0.0 {
            let n_train = fraction_len(train.len(), plan.overfit_pct);
            let n_valid = fraction_len(valid.len(), plan.overfit_pct);
            (sample_n(train, n_train, seed), sample_n(valid, n_valid, seed))
        } else {
            (whole(train, seed), whole(valid, seed))
        };
        Ok(views)
    }

    fn shuffle_seed(&self) -> u64 {
        self.params.seed.unwrap_or(DEFAULT_SHUFFLE_SEED)
    }

    fn dataloaders<B: AutodiffBackend>(
        &self,
        train: View,
        valid: View,
    ) -> (
        std::sync::Arc<dyn DataLoader<B, CifarBatch<B>>>,
        std::sync::Arc<dyn DataLoader<B::InnerBackend, CifarBatch<B::InnerBackend>>>,
    ) {
        let batch_size = self.params.model.batch_size;
        let workers = self.plan.num_data_loaders;

        let mut train_builder = DataLoaderBuilder::<B, CifarItem, CifarBatch<B>>::new(CifarBatcher::new())
            .batch_size(batch_size)
            .shuffle(self.shuffle_seed());
        let mut valid_builder = DataLoaderBuilder::<
            B::InnerBackend,
            CifarItem,
            CifarBatch<B::InnerBackend>,
        >::new(CifarBatcher::new())
        .batch_size(batch_size);

        if workers > 0 {
            train_builder = train_builder.num_workers(workers);
            valid_builder = valid_builder.num_workers(workers);
        }

        (train_builder.build(train), valid_builder.build(valid))
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};
    use cifar_config::TrainerFlags;
    use tempfile::tempdir;

    use super::*;
    use crate::logger::RECORD_FILE;

    #[test]
    fn test_fresh_writes_record() {
        let dir = tempdir().unwrap();
        let identity = RunIdentity::new(dir.path(), "lightning_logs", "v1");
        let trainer = Trainer::fresh(TrainParams::default(), identity.clone()).unwrap();

        assert_eq!(trainer.run_dir(), identity.run_dir());
        assert!(identity.run_dir().join(RECORD_FILE).is_file());
        assert_eq!(trainer.resume_epoch, None);
    }

    #[test]
    fn test_fresh_rejects_bad_overfit_without_creating_run() {
        let dir = tempdir().unwrap();
        let identity = RunIdentity::new(dir.path(), "lightning_logs", "v1");
        let params = TrainParams {
            trainer: TrainerFlags {
                overfit_pct: 2.0,
                ..TrainerFlags::default()
            },
            ..TrainParams::default()
        };
        assert!(Trainer::fresh(params, identity.clone()).is_err());
        assert!(!identity.run_dir().exists());
    }

    #[test]
    fn test_fit_rejects_multi_node() {
        let dir = tempdir().unwrap();
        let params = TrainParams {
            trainer: TrainerFlags {
                nodes: 2,
                ..TrainerFlags::default()
            },
            data_root: dir.path().join("data"),
            ..TrainParams::default()
        };
        let trainer = Trainer::fresh(params, RunIdentity::new(dir.path(), "logs", "v1")).unwrap();
        let err = trainer.fit::<Autodiff<NdArray>>(Vec::new()).unwrap_err();
        assert!(matches!(err, TrainError::MultiNode(2)));
        assert!(!dir.path().join("data").exists());
    }
}
