//! Collaborators outside the REST API: dataset upload, model download and
//! dataset preparation.

use std::path::{Path, PathBuf};
use thiserror::Error;

mod dataset;
mod runner;
mod uploader;

pub use dataset::{sorted_chunks, CommandPreparer, SeededPartitioner};
pub use runner::{model_file_name, RunnerCli, EXPECTED_RUNNER_VERSION};
pub use uploader::UploaderCli;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{} does not exist or is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("could not run the uploader: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("reading the dataset failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("the uploader exited with {status}: {stderr}")]
    Tool { status: String, stderr: String },
    #[error("uploading {} failed: {source}", .file.display())]
    Remote {
        file: PathBuf,
        #[source]
        source: crate::api::error::ApiError,
    },
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("model file name {0} must end with .eim")]
    InvalidName(String),
    #[error("the model runner is not installed or not on PATH")]
    NotInstalled,
    #[error("could not run the model runner: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("the model runner exited with {0}")]
    Tool(String),
}

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("{} does not exist or is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("preparing the dataset failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("the preparation command exited with {0}")]
    Tool(String),
    #[error("cannot split into zero chunks")]
    NoChunks,
    #[error("output {} overlaps the images in {}", .output.display(), .input.display())]
    Overlap { input: PathBuf, output: PathBuf },
}

/// Moves a directory of labeled images into the remote project.
///
/// Labels are inferred remotely from file names.
pub trait DatasetTransport {
    fn upload(&mut self, dir: &Path) -> Result<(), UploadError>;
}

/// Fetches a trained model artifact by file name.
pub trait ArtifactDownloader {
    fn download(&mut self, model_file: &str) -> Result<(), DownloadError>;
}

/// Regenerates the local dataset partitions for one repetition.
///
/// The same seed must always produce the same partition contents.
pub trait DatasetPreparer {
    fn prepare(&mut self, seed: u64) -> Result<(), PrepareError>;
}

pub(crate) fn require_dir(dir: &Path) -> Result<(), UploadError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(UploadError::NotADirectory(dir.to_owned()))
    }
}
