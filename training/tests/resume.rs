//! Integration tests for resuming runs.
//!
//! These tests verify that:
//! 1. Only complete checkpoints are picked up
//! 2. A restart path reuses the recorded run instead of creating a new one
//! 3. A run that already reached its epoch limit has nothing left to do

use std::{fs, path::Path};

use burn::backend::{Autodiff, NdArray};
use cifar_config::{Toggle, TrainParams, TrainerFlags};
use cifar_training::{
    FitOutcome, RunIdentity, RunRecord, TrainError, Trainer, is_complete, latest_checkpoint,
    saved_epochs,
};
use tempfile::tempdir;

/// Create fake checkpoint files to simulate a partial training run.
fn create_fake_checkpoints(run_dir: &Path, epoch: usize) {
    let checkpoint_dir = run_dir.join("checkpoint");
    fs::create_dir_all(&checkpoint_dir).unwrap();

    for e in 1..=epoch {
        fs::write(checkpoint_dir.join(format!("model-{e}.mpk")), b"fake").unwrap();
        fs::write(checkpoint_dir.join(format!("optim-{e}.mpk")), b"fake").unwrap();
        fs::write(checkpoint_dir.join(format!("scheduler-{e}.mpk")), b"fake").unwrap();
    }
}

fn params(max_nb_epochs: usize) -> TrainParams {
    TrainParams {
        trainer: TrainerFlags {
            max_nb_epochs,
            early_stopping: Toggle(true),
            ..TrainerFlags::default()
        },
        ..TrainParams::default()
    }
}

#[test]
fn test_checkpoint_detection() {
    let dir = tempdir().unwrap();
    let run_dir = dir.path().join("lightning_logs/version_a");
    let checkpoint_dir = run_dir.join("checkpoint");

    // No checkpoints yet
    assert_eq!(latest_checkpoint(&checkpoint_dir), None);

    create_fake_checkpoints(&run_dir, 3);
    assert_eq!(latest_checkpoint(&checkpoint_dir), Some(3));

    create_fake_checkpoints(&run_dir, 5);
    assert_eq!(latest_checkpoint(&checkpoint_dir), Some(5));
    assert_eq!(saved_epochs(&checkpoint_dir), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_incomplete_checkpoint_skipped() {
    let dir = tempdir().unwrap();
    let run_dir = dir.path().join("run");
    create_fake_checkpoints(&run_dir, 2);

    // Crash while writing epoch 3: only the model made it to disk
    let checkpoint_dir = run_dir.join("checkpoint");
    fs::write(checkpoint_dir.join("model-3.mpk"), b"fake").unwrap();

    assert!(is_complete(&checkpoint_dir, 2));
    assert!(!is_complete(&checkpoint_dir, 3));
    assert_eq!(latest_checkpoint(&checkpoint_dir), Some(2));
}

#[test]
fn test_restart_uses_recorded_run() {
    let dir = tempdir().unwrap();
    let first = RunIdentity::new(dir.path(), "lightning_logs", "first");
    let trainer = Trainer::fresh(params(10), first.clone()).unwrap();
    create_fake_checkpoints(trainer.run_dir(), 4);

    // Command-line flags of the restart are ignored in favour of the record
    let second = RunIdentity::new(dir.path(), "lightning_logs", "second");
    let restart = TrainParams {
        restart_from_checkpoint: Some(first.run_dir()),
        ..params(99)
    };
    let resumed = Trainer::configure(restart, second.clone()).unwrap();

    assert_eq!(resumed.run_dir(), first.run_dir());
    assert_eq!(resumed.resume_epoch, Some(4));
    assert_eq!(resumed.plan.max_nb_epochs, 10);
    assert!(resumed.plan.early_stopping.is_some());
    assert!(!second.run_dir().exists());
}

#[test]
fn test_restart_from_checkpoint_dir() {
    let dir = tempdir().unwrap();
    let identity = RunIdentity::new(dir.path(), "lightning_logs", "a");
    let trainer = Trainer::fresh(params(10), identity.clone()).unwrap();
    create_fake_checkpoints(trainer.run_dir(), 1);

    let resumed = Trainer::resume(&identity.checkpoint_dir()).unwrap();
    assert_eq!(resumed.run_dir(), identity.run_dir());
    assert_eq!(resumed.resume_epoch, Some(1));
}

#[test]
fn test_restart_moved_run_dir() {
    let dir = tempdir().unwrap();
    let identity = RunIdentity::new(dir.path().join("old"), "lightning_logs", "a");
    let trainer = Trainer::fresh(params(10), identity.clone()).unwrap();
    create_fake_checkpoints(trainer.run_dir(), 2);

    let moved = dir.path().join("moved");
    fs::rename(identity.run_dir(), &moved).unwrap();

    let resumed = Trainer::resume(&moved).unwrap();
    assert_eq!(resumed.run_dir(), moved);
    assert_eq!(resumed.plan.checkpoint_dir(), moved.join("checkpoint"));
    assert_eq!(resumed.resume_epoch, Some(2));

    // The record itself is left untouched
    let (_, record) = RunRecord::locate(&moved).unwrap();
    assert_eq!(record.plan.run_dir, identity.run_dir());
}

#[test]
fn test_restart_without_checkpoint() {
    let dir = tempdir().unwrap();
    let identity = RunIdentity::new(dir.path(), "lightning_logs", "a");
    Trainer::fresh(params(10), identity.clone()).unwrap();

    let err = Trainer::resume(&identity.run_dir()).unwrap_err();
    assert!(matches!(err, TrainError::NoCheckpoint(_)));
}

#[test]
fn test_restart_without_record() {
    let dir = tempdir().unwrap();
    let err = Trainer::resume(dir.path()).unwrap_err();
    assert!(matches!(err, TrainError::MissingRecord(_)));
}

#[test]
fn test_resume_at_epoch_limit_does_nothing() {
    let dir = tempdir().unwrap();
    let identity = RunIdentity::new(dir.path(), "lightning_logs", "a");
    let trainer = Trainer::fresh(params(3), identity.clone()).unwrap();
    create_fake_checkpoints(trainer.run_dir(), 3);

    let resumed = Trainer::resume(&identity.run_dir()).unwrap();
    let outcome = resumed.fit::<Autodiff<NdArray>>(Vec::new()).unwrap();
    assert_eq!(
        outcome,
        FitOutcome::AlreadyComplete {
            epoch: 3,
            max_epochs: 3
        }
    );
}
