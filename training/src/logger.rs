//! Run identity, run directory and the persisted run record.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use cifar_config::TrainParams;
use serde::{Deserialize, Serialize};

use crate::{TrainError, plan::TrainerPlan};

/// Logger name used when none is given; runs land in `<root>/lightning_logs/`.
pub const DEFAULT_LOGGER_NAME: &str = "lightning_logs";

/// `strftime` format of timestamp-derived versions.
pub const VERSION_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Run record file inside the run directory.
pub const RECORD_FILE: &str = "hparams.json";

/// Subdirectory burn's file checkpointer writes to.
///
/// The checkpointer fixes this name, so runs use `checkpoint/` rather than
/// the conventional `checkpoints/`.
pub const CHECKPOINT_DIR: &str = "checkpoint";

/// Subdirectory burn's metric logger writes training epochs to, as `epoch-N/`.
pub const TRAIN_LOG_DIR: &str = "train";

/// Where a run lives: `<root>/<name>/version_<version>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    pub root: PathBuf,
    pub name: String,
    pub version: String,
}

impl RunIdentity {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Identity under the default logger name with a version taken from `time`.
    pub fn at<Tz>(root: impl Into<PathBuf>, time: &chrono::DateTime<Tz>) -> Self
    where
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self::new(root, DEFAULT_LOGGER_NAME, timestamp_version(time))
    }

    #[must_use]
    pub fn run_dir(&self) -> PathBuf {
        self.root
            .join(&self.name)
            .join(format!("version_{}", self.version))
    }

    #[must_use]
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.run_dir().join(CHECKPOINT_DIR)
    }
}

/// Format `time` as a run version string.
pub fn timestamp_version<Tz>(time: &chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format(VERSION_FORMAT).to_string()
}

/// Highest epoch with training metrics logged under `run_dir`.
#[must_use]
pub fn last_logged_epoch(run_dir: &Path) -> Option<usize> {
    std::fs::read_dir(run_dir.join(TRAIN_LOG_DIR))
        .ok()?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str()?.strip_prefix("epoch-")?.parse().ok())
        .max()
}

/// Everything needed to inspect or resume a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub identity: RunIdentity,
    pub params: TrainParams,
    pub plan: TrainerPlan,
}

impl RunRecord {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrainError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TrainError::ReadRecord(path.to_path_buf(), e.to_string()))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| TrainError::ReadRecord(path.to_path_buf(), e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TrainError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| TrainError::WriteRecord(path.to_path_buf(), e.to_string()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| TrainError::WriteRecord(path.to_path_buf(), e.to_string()))
    }

    /// Find the run directory for `path` and load its record.
    ///
    /// `path` may be the run directory itself or any directory inside it,
    /// such as its checkpoint directory.
    pub fn locate(path: impl AsRef<Path>) -> Result<(PathBuf, Self), TrainError> {
        let path = path.as_ref();
        let run_dir = path
            .ancestors()
            .take(2)
            .find(|dir| dir.join(RECORD_FILE).is_file())
            .ok_or_else(|| TrainError::MissingRecord(path.to_path_buf()))?
            .to_path_buf();
        let record = Self::load(run_dir.join(RECORD_FILE))?;
        Ok((run_dir, record))
    }
}

/// Owns the run directory of a fresh run.
#[derive(Debug)]
pub struct RunLogger {
    identity: RunIdentity,
}

impl RunLogger {
    /// Create the run directory for `identity`.
    pub fn create(identity: RunIdentity) -> Result<Self, TrainError> {
        let run_dir = identity.run_dir();
        std::fs::create_dir_all(&run_dir).map_err(|e| TrainError::Io(run_dir.clone(), e))?;
        tracing::info!("Logging run to {}", run_dir.display());
        Ok(Self { identity })
    }

    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.identity.version
    }

    #[must_use]
    pub fn run_dir(&self) -> PathBuf {
        self.identity.run_dir()
    }

    /// Write the run record into the run directory.
    pub fn write_record(&self, record: &RunRecord) -> Result<PathBuf, TrainError> {
        let path = self.run_dir().join(RECORD_FILE);
        record.save(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_version_format() {
        let time = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(timestamp_version(&time), "2024-03-09_07-05-01");

        let identity = RunIdentity::at("/work", &time);
        assert_eq!(identity.name, DEFAULT_LOGGER_NAME);
        assert_eq!(
            identity.run_dir(),
            PathBuf::from("/work/lightning_logs/version_2024-03-09_07-05-01")
        );
        assert_eq!(
            identity.checkpoint_dir(),
            PathBuf::from("/work/lightning_logs/version_2024-03-09_07-05-01/checkpoint")
        );
    }

    #[test]
    fn test_logger_creates_run_dir() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::create(RunIdentity::new(dir.path(), "logs", "v1")).unwrap();
        assert!(dir.path().join("logs/version_v1").is_dir());
        assert_eq!(logger.name(), "logs");
        assert_eq!(logger.version(), "v1");
    }

    #[test]
    fn test_locate_from_run_or_checkpoint_dir() {
        let dir = tempdir().unwrap();
        let identity = RunIdentity::new(dir.path(), "logs", "v1");
        let logger = RunLogger::create(identity.clone()).unwrap();
        let params = TrainParams::default();
        let plan = TrainerPlan::fresh(&params, &identity).unwrap();
        logger
            .write_record(&RunRecord {
                identity: identity.clone(),
                params,
                plan,
            })
            .unwrap();

        let (run_dir, record) = RunRecord::locate(identity.run_dir()).unwrap();
        assert_eq!(run_dir, identity.run_dir());
        assert_eq!(record.identity, identity);

        std::fs::create_dir_all(identity.checkpoint_dir()).unwrap();
        let (run_dir, _) = RunRecord::locate(identity.checkpoint_dir()).unwrap();
        assert_eq!(run_dir, identity.run_dir());
    }

    #[test]
    fn test_last_logged_epoch() {
        let dir = tempdir().unwrap();
        assert_eq!(last_logged_epoch(dir.path()), None);

        for name in ["epoch-1", "epoch-2", "epoch-10", "notes"] {
            std::fs::create_dir_all(dir.path().join(TRAIN_LOG_DIR).join(name)).unwrap();
        }
        std::fs::write(dir.path().join(TRAIN_LOG_DIR).join("epoch-99"), b"").unwrap();
        assert_eq!(last_logged_epoch(dir.path()), Some(10));
    }

    #[test]
    fn test_locate_missing_record() {
        let dir = tempdir().unwrap();
        let err = RunRecord::locate(dir.path()).unwrap_err();
        assert!(matches!(err, TrainError::MissingRecord(_)));
    }
}
