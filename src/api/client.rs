use crate::api::{error::*, id::*, job::*, pipeline::*, results::*, training::*};
use std::path::Path;

/// Partition that evaluation jobs classify.
pub const EVALUATION_DATASET: &str = "testing";

/// One method per capability of the remote project.
///
/// Every method is a single blocking request. Remote-reported failures come back
/// as [`ApiError`] values; nothing is retried.
#[rustfmt::skip]
pub trait JobClient {
    fn new_block_id(&mut self) -> Result<BlockId, ApiError>;
    fn create_pipeline(&mut self, spec: &PipelineSpec) -> Result<PipelineDescriptor, ApiError>;
    fn get_pipeline(&mut self) -> Result<PipelineBlocks, ApiError>;
    fn delete_pipeline(&mut self) -> Result<(), ApiError>;

    fn generate_features(&mut self, dsp_block: BlockId) -> Result<JobHandle, ApiError>;
    fn start_training(&mut self, learn_block: BlockId, model: ModelVariant, parameters: &TrainingParameters) -> Result<JobHandle, ApiError>;
    fn start_evaluation(&mut self) -> Result<JobHandle, ApiError>;
    fn job_status(&mut self, job: JobId) -> Result<JobState, ApiError>;

    /// The raw body of the latest evaluation result.
    fn classify_results(&mut self) -> Result<String, ApiError>;
    fn delete_all_data(&mut self) -> Result<(), ApiError>;

    /// Saves the latest evaluation result to `output` and returns its accuracy.
    fn fetch_results(&mut self, output: &Path) -> Result<Accuracy, ApiError> {
        let body = self.classify_results()?;
        persist(&body, output)
    }
}
