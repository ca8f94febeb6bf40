//! In-memory collaborators that record every call into a shared log.

use std::{
    cell::RefCell,
    collections::VecDeque,
    path::Path,
    rc::Rc,
    time::Duration,
};

use super::Sleep;
use crate::{
    api::{
        client::JobClient,
        error::ApiError,
        job::{JobHandle, JobKind, JobState},
        pipeline::{BlockInfo, PipelineBlocks, PipelineDescriptor, PipelineSpec, KERAS_TRANSFER_IMAGE},
        training::{ModelVariant, TrainingParameters},
    },
    tools::{ArtifactDownloader, DatasetPreparer, DatasetTransport, DownloadError, PrepareError, UploadError},
    BlockId, JobId,
};

pub const RESULT_BODY: &str = r#"{"success":true,"accuracy":{"totalSummary":{"good":7,"bad":1},"accuracyScore":0.875}}"#;

#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|logged| *logged == entry).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0.borrow().iter().filter(|logged| logged.starts_with(prefix)).count()
    }

    /// Entries without the status polling noise.
    pub fn actions(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| !entry.starts_with("job_status") && entry != "new_block_id")
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

fn rejected() -> ApiError {
    ApiError::Rejected {
        body: r#"{"success":false,"error":"scripted failure"}"#.to_string(),
    }
}

pub struct FakeClient {
    log: CallLog,
    statuses: VecDeque<JobState>,
    failures: Vec<String>,
    next_id: u64,
    pub blocks: PipelineBlocks,
    pub result_body: String,
}

impl FakeClient {
    pub fn new() -> Self {
        FakeClient::with_log(CallLog::default())
    }

    pub fn with_log(log: CallLog) -> Self {
        let block = |id: u64, kind: &str| BlockInfo {
            id: BlockId::from(id),
            kind: kind.to_string(),
            name: kind.to_string(),
        };
        FakeClient {
            log,
            statuses: VecDeque::new(),
            failures: Vec::new(),
            next_id: 1,
            blocks: PipelineBlocks {
                input_blocks: vec![block(11, "image")],
                dsp_blocks: vec![block(12, "image")],
                learn_blocks: vec![block(13, KERAS_TRANSFER_IMAGE)],
            },
            result_body: RESULT_BODY.to_string(),
        }
    }

    pub fn count(&self, entry: &str) -> usize {
        self.log.count(entry)
    }

    /// States returned by successive status queries; `Succeeded` once exhausted.
    pub fn script_statuses(&mut self, states: &[JobState]) {
        self.statuses.extend(states.iter().copied());
    }

    /// Every call whose log entry contains `pattern` is rejected.
    pub fn fail_on(&mut self, pattern: &str) {
        self.failures.push(pattern.to_string());
    }

    fn record(&mut self, entry: String) -> Result<(), ApiError> {
        let fails = self.failures.iter().any(|pattern| entry.contains(pattern.as_str()));
        self.log.push(entry);
        if fails {
            Err(rejected())
        } else {
            Ok(())
        }
    }

    fn start(&mut self, kind: JobKind) -> JobHandle {
        let id = self.next_id;
        self.next_id += 1;
        JobHandle::new(JobId::from(id), kind)
    }
}

impl JobClient for FakeClient {
    fn new_block_id(&mut self) -> Result<BlockId, ApiError> {
        self.record("new_block_id".to_string())?;
        Ok(BlockId::from(100 + self.next_id))
    }

    fn create_pipeline(&mut self, spec: &PipelineSpec) -> Result<PipelineDescriptor, ApiError> {
        self.record(format!("create_pipeline({} {})", spec.image_size, spec.model))?;
        Ok(PipelineDescriptor {
            input_block_id: BlockId::from(11),
            dsp_block_id: BlockId::from(12),
            learn_block_id: BlockId::from(13),
            dsp_type: spec.dsp_type,
            resize_policy: spec.resize_policy,
        })
    }

    fn get_pipeline(&mut self) -> Result<PipelineBlocks, ApiError> {
        self.record("get_pipeline".to_string())?;
        Ok(self.blocks.clone())
    }

    fn delete_pipeline(&mut self) -> Result<(), ApiError> {
        self.record("delete_pipeline".to_string())
    }

    fn generate_features(&mut self, dsp_block: BlockId) -> Result<JobHandle, ApiError> {
        self.record(format!("generate_features({})", dsp_block.get()))?;
        Ok(self.start(JobKind::FeatureGeneration))
    }

    fn start_training(
        &mut self,
        learn_block: BlockId,
        model: ModelVariant,
        _parameters: &TrainingParameters,
    ) -> Result<JobHandle, ApiError> {
        self.record(format!("start_training({} {})", learn_block.get(), model))?;
        Ok(self.start(JobKind::Training))
    }

    fn start_evaluation(&mut self) -> Result<JobHandle, ApiError> {
        self.record("start_evaluation".to_string())?;
        Ok(self.start(JobKind::Evaluation))
    }

    fn job_status(&mut self, job: JobId) -> Result<JobState, ApiError> {
        self.record(format!("job_status({})", job))?;
        Ok(self.statuses.pop_front().unwrap_or(JobState::Succeeded))
    }

    fn classify_results(&mut self) -> Result<String, ApiError> {
        self.record("classify_results".to_string())?;
        Ok(self.result_body.clone())
    }

    fn delete_all_data(&mut self) -> Result<(), ApiError> {
        self.record("delete_all_data".to_string())
    }
}

/// Logs `upload(<dir name>)` for each upload.
pub struct FakeTransport {
    log: CallLog,
    failures_left: usize,
}

impl FakeTransport {
    pub fn new(log: CallLog) -> Self {
        FakeTransport { log, failures_left: 0 }
    }

    pub fn failing(log: CallLog) -> Self {
        FakeTransport {
            log,
            failures_left: usize::MAX,
        }
    }

    pub fn failing_once(log: CallLog) -> Self {
        FakeTransport { log, failures_left: 1 }
    }
}

impl DatasetTransport for FakeTransport {
    fn upload(&mut self, dir: &Path) -> Result<(), UploadError> {
        let name = dir.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        self.log.push(format!("upload({})", name));
        if self.failures_left > 0 {
            self.failures_left -= 1;
            Err(UploadError::Tool {
                status: "exit status: 1".to_string(),
                stderr: "scripted failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

pub struct FakePreparer {
    log: CallLog,
}

impl FakePreparer {
    pub fn new(log: CallLog) -> Self {
        FakePreparer { log }
    }
}

impl DatasetPreparer for FakePreparer {
    fn prepare(&mut self, seed: u64) -> Result<(), PrepareError> {
        self.log.push(format!("prepare({})", seed));
        Ok(())
    }
}

pub struct FakeDownloader {
    log: CallLog,
}

impl FakeDownloader {
    pub fn new(log: CallLog) -> Self {
        FakeDownloader { log }
    }
}

impl ArtifactDownloader for FakeDownloader {
    fn download(&mut self, model_file: &str) -> Result<(), DownloadError> {
        self.log.push(format!("download({})", model_file));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingSleep(Rc<RefCell<Vec<Duration>>>);

impl RecordingSleep {
    pub fn naps(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn total(&self) -> Duration {
        self.0.borrow().iter().sum()
    }
}

impl Sleep for RecordingSleep {
    fn sleep(&mut self, duration: Duration) {
        self.0.borrow_mut().push(duration);
    }
}
