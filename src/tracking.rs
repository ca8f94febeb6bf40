//! Experiment runs: polling jobs, driving one pipeline through training and
//! evaluation, and sweeping over many configurations.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{
    api::{
        error::ApiError,
        job::{JobHandle, JobState},
        pipeline::{DspType, ResizePolicy},
        results::ResultRecord,
        training::{ImageSize, ModelVariant, TrainingParameters},
    },
    tools::{DownloadError, PrepareError, UploadError},
};

mod poll;
mod run;
mod sweep;

#[cfg(test)]
pub(crate) mod fake;

pub use poll::{Poller, Sleep, ThreadSleep};
pub use run::PipelineRun;
pub use sweep::{FailurePolicy, ModelGroup, Sweep, SweepPlan, SweepReport, SweepStrategy};

/// Steps of a pipeline run, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    PipelineDeleted,
    DatasetUploaded,
    PipelineCreated,
    FeaturesRequested,
    FeaturesReady,
    TrainingBlockResolved,
    TrainingRequested,
    TrainingComplete,
    EvaluationRequested,
    EvaluationComplete,
    ResultsPersisted,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::PipelineDeleted => "pipeline deleted",
            Stage::DatasetUploaded => "dataset uploaded",
            Stage::PipelineCreated => "pipeline created",
            Stage::FeaturesRequested => "features requested",
            Stage::FeaturesReady => "features ready",
            Stage::TrainingBlockResolved => "training block resolved",
            Stage::TrainingRequested => "training requested",
            Stage::TrainingComplete => "training complete",
            Stage::EvaluationRequested => "evaluation requested",
            Stage::EvaluationComplete => "evaluation complete",
            Stage::ResultsPersisted => "results persisted",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("remote call failed after `{stage}`: {source}")]
    Remote {
        stage: Stage,
        #[source]
        source: ApiError,
    },
    #[error("{} job {} ended as {state:?} after `{stage}`", .job.kind, .job.id)]
    Job {
        stage: Stage,
        job: JobHandle,
        state: JobState,
    },
    #[error("the pipeline has no {block} block after `{stage}`")]
    BlockNotFound { stage: Stage, block: &'static str },
    #[error("uploading the dataset failed: {0}")]
    Upload(#[source] UploadError),
    #[error("downloading the model failed: {0}")]
    Download(#[from] DownloadError),
    #[error("preparing the datasets failed: {0}")]
    Prepare(#[from] PrepareError),
    #[error("cannot list dataset {}: {source}", .path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset {} has no chunk directories", .0.display())]
    EmptyDataset(PathBuf),
}

impl RunError {
    /// Local setup problems that no later configuration can recover from.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            RunError::Upload(UploadError::NotADirectory(_))
                | RunError::Prepare(PrepareError::NotADirectory(_))
                | RunError::Prepare(PrepareError::NoChunks)
                | RunError::Prepare(PrepareError::Overlap { .. })
                | RunError::Listing { .. }
                | RunError::EmptyDataset(_)
        )
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunError::Remote { stage, .. }
            | RunError::Job { stage, .. }
            | RunError::BlockNotFound { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the run got past uploading its dataset before failing.
    pub fn after_upload(&self) -> bool {
        match self {
            RunError::Download(_) => true,
            _ => self.stage().map_or(false, |stage| stage >= Stage::DatasetUploaded),
        }
    }
}

impl From<UploadError> for RunError {
    fn from(error: UploadError) -> Self {
        RunError::Upload(error)
    }
}

/// Knobs shared by every run of a sweep.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub pipeline_name: String,
    pub dsp_type: DspType,
    pub resize_policy: ResizePolicy,
    pub training: TrainingParameters,
    /// Carry on when deleting the old pipeline or wiping data fails.
    pub tolerate_delete_failure: bool,
    pub download_model: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            pipeline_name: "MyImpulse".to_string(),
            dsp_type: DspType::Image,
            resize_policy: ResizePolicy::Squash,
            training: TrainingParameters::default(),
            tolerate_delete_failure: true,
            download_model: false,
        }
    }
}

/// One point of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub dataset_path: PathBuf,
    pub model: ModelVariant,
    pub image_size: ImageSize,
    pub repetition: u32,
    pub save_name: String,
    pub upload_dataset: bool,
}

impl ExperimentConfig {
    pub fn new(
        save_name: impl Into<String>,
        dataset_path: impl Into<PathBuf>,
        model: ModelVariant,
        image_size: ImageSize,
        repetition: u32,
    ) -> Self {
        ExperimentConfig {
            dataset_path: dataset_path.into(),
            model,
            image_size,
            repetition,
            save_name: save_name.into(),
            upload_dataset: true,
        }
    }

    pub fn without_upload(mut self) -> Self {
        self.upload_dataset = false;
        self
    }
}

/// `{dataset}_{size}_{model}_run{repetition}`, named after the dataset directory.
pub fn base_save_name(dataset: &Path, image_size: ImageSize, model: ModelVariant, repetition: u32) -> String {
    let leaf = dataset
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dataset.to_string_lossy().into_owned());
    format!("{}_{}_{}_run{}", leaf, image_size, model, repetition)
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A results file was already there; nothing was sent.
    Skipped { results: PathBuf },
    Completed(ResultRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_names_use_the_dataset_leaf() {
        let name = base_save_name(
            Path::new("BASE/EXP1_FRONT_CHUNKED"),
            ImageSize::Px160,
            ModelVariant::MobileNetV2_160A75,
            2,
        );
        assert_eq!(name, "EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run2");
    }

    #[test]
    fn precondition_errors_are_recognised() {
        assert!(RunError::EmptyDataset(PathBuf::from("x")).is_precondition());
        assert!(RunError::from(UploadError::NotADirectory(PathBuf::from("x"))).is_precondition());
        let remote = RunError::Remote {
            stage: Stage::PipelineCreated,
            source: ApiError::Missing("id"),
        };
        assert!(!remote.is_precondition());
        assert_eq!(remote.stage(), Some(Stage::PipelineCreated));
    }

    #[test]
    fn failures_know_whether_the_dataset_was_sent() {
        let early = RunError::Remote {
            stage: Stage::Idle,
            source: ApiError::Missing("id"),
        };
        let late = RunError::BlockNotFound {
            stage: Stage::DatasetUploaded,
            block: "dsp",
        };
        let upload = RunError::from(UploadError::Tool {
            status: "exit status: 1".to_string(),
            stderr: String::new(),
        });
        assert!(!early.after_upload());
        assert!(!upload.after_upload());
        assert!(late.after_upload());
        assert!(Stage::PipelineDeleted < Stage::DatasetUploaded);
    }
}
