//! CIFAR-10 download and image-folder splits.

use std::path::{Path, PathBuf};

use burn::data::dataset::vision::{ImageDatasetItem, ImageFolderDataset};
use flate2::read::GzDecoder;
use tar::Archive;

/// PNG export of CIFAR-10, laid out as `cifar10/{train,test}/<class>/*.png`.
pub const CIFAR10_URL: &str = "https://s3.amazonaws.com/fast-ai-sample/cifar10.tgz";

/// Directory the archive extracts to, relative to the data root.
pub const CIFAR10_DIR: &str = "cifar10";

/// Written last by the archive; its presence marks a complete extraction.
const MARKER_FILE: &str = "labels.txt";

pub type CifarItem = ImageDatasetItem;

/// CIFAR-10 split on disk.
pub struct Cifar10;

impl Cifar10 {
    /// Extracted dataset directory under `root`.
    #[must_use]
    pub fn dir(root: &Path) -> PathBuf {
        root.join(CIFAR10_DIR)
    }

    #[must_use]
    pub fn is_extracted(root: &Path) -> bool {
        Self::dir(root).join(MARKER_FILE).exists()
    }

    /// Download and extract CIFAR-10 into `root` unless already present.
    pub fn download(root: &Path) -> Result<PathBuf, DataError> {
        Self::download_from(root, CIFAR10_URL)
    }

    /// Same as [`Cifar10::download`], fetching the archive from `url`.
    pub fn download_from(root: &Path, url: &str) -> Result<PathBuf, DataError> {
        if Self::is_extracted(root) {
            tracing::debug!("CIFAR-10 already extracted at {}", Self::dir(root).display());
            return Ok(Self::dir(root));
        }

        std::fs::create_dir_all(root).map_err(|e| DataError::Io(root.to_path_buf(), e))?;
        tracing::info!("Downloading CIFAR-10 from {url}");
        let bytes = fetch(url)?;
        tracing::info!("Extracting {} bytes into {}", bytes.len(), root.display());
        unpack(&bytes, root)?;

        if !Self::is_extracted(root) {
            return Err(DataError::Incomplete(Self::dir(root)));
        }
        Ok(Self::dir(root))
    }

    pub fn train(root: &Path) -> Result<ImageFolderDataset, DataError> {
        Self::split(root, "train")
    }

    /// The held-out split. Runs validate on it.
    pub fn test(root: &Path) -> Result<ImageFolderDataset, DataError> {
        Self::split(root, "test")
    }

    fn split(root: &Path, split: &str) -> Result<ImageFolderDataset, DataError> {
        let dir = Self::dir(root).join(split);
        if !dir.is_dir() {
            return Err(DataError::MissingSplit(dir));
        }
        ImageFolderDataset::new_classification(&dir).map_err(|e| DataError::Load(dir, e.to_string()))
    }
}

fn fetch(url: &str) -> Result<Vec<u8>, DataError> {
    let body = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::bytes)
        .map_err(|e| DataError::Download(url.to_string(), e.to_string()))?;
    Ok(body.to_vec())
}

/// Unpack a gzip-compressed tarball into `dest`.
pub fn unpack(bytes: &[u8], dest: &Path) -> Result<(), DataError> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    archive
        .unpack(dest)
        .map_err(|e| DataError::Extract(dest.to_path_buf(), e))
}

/// Errors raised while preparing the dataset.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to create data directory {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("failed to download {0}: {1}")]
    Download(String, String),
    #[error("failed to extract archive into {0}: {1}")]
    Extract(PathBuf, std::io::Error),
    #[error("archive extracted into {0} but {MARKER_FILE} is missing")]
    Incomplete(PathBuf),
    #[error("dataset split {0} not found")]
    MissingSplit(PathBuf),
    #[error("failed to load images from {0}: {1}")]
    Load(PathBuf, String),
}
