use serde::Deserialize;
use std::fmt::Display;

use crate::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    FeatureGeneration,
    Training,
    Evaluation,
}

impl Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobKind::FeatureGeneration => "feature generation",
            JobKind::Training => "training",
            JobKind::Evaluation => "evaluation",
        };
        f.write_str(name)
    }
}

/// A remote job that was started. Jobs cannot be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    pub id: JobId,
    pub kind: JobKind,
}

impl JobHandle {
    pub fn new(id: JobId, kind: JobKind) -> Self {
        JobHandle { id, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
    /// The status response held no job record.
    Unknown,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Running)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct JobStatusResponse {
    #[serde(default)]
    job: Option<JobRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobRecord {
    #[serde(default)]
    finished_successful: Option<bool>,
}

impl From<JobStatusResponse> for JobState {
    fn from(response: JobStatusResponse) -> Self {
        match response.job {
            None => JobState::Unknown,
            Some(JobRecord { finished_successful: None }) => JobState::Running,
            Some(JobRecord { finished_successful: Some(true) }) => JobState::Succeeded,
            Some(JobRecord { finished_successful: Some(false) }) => JobState::Failed,
        }
    }
}
