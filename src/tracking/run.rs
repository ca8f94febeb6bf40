use std::path::Path;
use tracing::{info, warn};

use super::{ExperimentConfig, Poller, RunError, RunOptions, RunOutcome, Stage};
use crate::{
    api::{
        client::JobClient,
        error::ApiError,
        job::{JobHandle, JobState},
        pipeline::PipelineSpec,
        results::{persist, results_path, ResultRecord},
    },
    tools::{model_file_name, ArtifactDownloader, DatasetTransport},
};

/// Drives one configuration from a clean project to persisted results.
///
/// Stages only move forward. Any failure aborts the run; the next run starts
/// by deleting whatever pipeline was left behind.
pub struct PipelineRun<'a> {
    client: &'a mut dyn JobClient,
    transport: &'a mut dyn DatasetTransport,
    downloader: Option<&'a mut dyn ArtifactDownloader>,
    poller: &'a mut Poller,
    options: &'a RunOptions,
    results_dir: &'a Path,
    stage: Stage,
}

impl<'a> PipelineRun<'a> {
    pub fn new(
        client: &'a mut dyn JobClient,
        transport: &'a mut dyn DatasetTransport,
        poller: &'a mut Poller,
        options: &'a RunOptions,
        results_dir: &'a Path,
    ) -> Self {
        PipelineRun {
            client,
            transport,
            downloader: None,
            poller,
            options,
            results_dir,
            stage: Stage::Idle,
        }
    }

    /// Used only when [`RunOptions::download_model`] is set.
    pub fn with_downloader(mut self, downloader: &'a mut dyn ArtifactDownloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// The last stage reached.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn execute(&mut self, config: &ExperimentConfig) -> Result<RunOutcome, RunError> {
        self.stage = Stage::Idle;
        let results = results_path(self.results_dir, &config.save_name);
        if results.exists() {
            info!(save_name = %config.save_name, "results already exist, skipping");
            return Ok(RunOutcome::Skipped { results });
        }
        info!(
            save_name = %config.save_name,
            dataset = %config.dataset_path.display(),
            model = %config.model,
            size = %config.image_size,
            "starting run"
        );

        self.delete_pipeline()?;
        self.advance(Stage::PipelineDeleted);

        if config.upload_dataset {
            self.transport.upload(&config.dataset_path)?;
            self.advance(Stage::DatasetUploaded);
        }

        let spec = PipelineSpec {
            dsp_type: self.options.dsp_type,
            resize_policy: self.options.resize_policy,
            ..PipelineSpec::new(self.options.pipeline_name.clone(), config.image_size, config.model)
        };
        let created = self.client.create_pipeline(&spec);
        self.remote(created)?;
        self.advance(Stage::PipelineCreated);

        let blocks = self.client.get_pipeline();
        let dsp_block = self.remote(blocks)?.dsp_block().ok_or(RunError::BlockNotFound {
            stage: self.stage,
            block: "DSP",
        })?;
        let features = self.client.generate_features(dsp_block);
        let features = self.remote(features)?;
        self.advance(Stage::FeaturesRequested);
        self.await_job(features)?;
        self.advance(Stage::FeaturesReady);

        let blocks = self.client.get_pipeline();
        let learn_block = self.remote(blocks)?.learn_block().ok_or(RunError::BlockNotFound {
            stage: self.stage,
            block: "learn",
        })?;
        self.advance(Stage::TrainingBlockResolved);

        let training = self.client.start_training(learn_block, config.model, &self.options.training);
        let training = self.remote(training)?;
        self.advance(Stage::TrainingRequested);
        self.await_job(training)?;
        self.advance(Stage::TrainingComplete);

        let evaluation = self.client.start_evaluation();
        let evaluation = self.remote(evaluation)?;
        self.advance(Stage::EvaluationRequested);
        self.await_job(evaluation)?;
        self.advance(Stage::EvaluationComplete);

        let body = self.client.classify_results();
        let body = self.remote(body)?;
        let accuracy = self.remote(persist(&body, &results))?;
        self.advance(Stage::ResultsPersisted);
        info!(save_name = %config.save_name, accuracy = accuracy.value(), results = %results.display(), "run complete");

        if self.options.download_model {
            if let Some(downloader) = self.downloader.as_mut() {
                downloader.download(&model_file_name(&config.save_name, accuracy))?;
            } else {
                warn!("model download requested but no downloader is configured");
            }
        }

        Ok(RunOutcome::Completed(ResultRecord {
            save_name: config.save_name.clone(),
            accuracy,
            raw_response: body,
        }))
    }

    fn advance(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "stage reached");
        self.stage = stage;
    }

    fn remote<T>(&self, result: Result<T, ApiError>) -> Result<T, RunError> {
        result.map_err(|source| RunError::Remote {
            stage: self.stage,
            source,
        })
    }

    fn delete_pipeline(&mut self) -> Result<(), RunError> {
        match self.client.delete_pipeline() {
            Ok(()) => Ok(()),
            Err(error) if self.options.tolerate_delete_failure => {
                warn!(%error, "could not delete the previous pipeline, continuing");
                Ok(())
            }
            Err(source) => Err(RunError::Remote {
                stage: self.stage,
                source,
            }),
        }
    }

    fn await_job(&mut self, job: JobHandle) -> Result<(), RunError> {
        let state = self.poller.await_terminal(&mut *self.client, job);
        match self.remote(state)? {
            JobState::Succeeded => Ok(()),
            state => Err(RunError::Job {
                stage: self.stage,
                job,
                state,
            }),
        }
    }
}
