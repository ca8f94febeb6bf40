use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{error, info, warn};

use super::{base_save_name, ExperimentConfig, PipelineRun, Poller, RunError, RunOptions, RunOutcome, Stage};
use crate::{
    api::{
        client::JobClient,
        results::{results_path, ResultRecord},
        training::{ImageSize, ModelVariant},
    },
    tools::{sorted_chunks, ArtifactDownloader, DatasetPreparer, DatasetTransport},
};

/// Models trained at one input resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGroup {
    pub image_size: ImageSize,
    pub models: Vec<ModelVariant>,
}

/// Which datasets and models to sweep, and how often.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepPlan {
    pub datasets: Vec<PathBuf>,
    pub groups: Vec<ModelGroup>,
    pub repetitions: u32,
}

impl Default for SweepPlan {
    fn default() -> Self {
        SweepPlan {
            datasets: vec![
                PathBuf::from("BASE/EXP1_FRONT_CHUNKED"),
                PathBuf::from("BASE/EXP1_SPLIT_CHUNKED"),
                PathBuf::from("BASE/EXP1_COMBINED_CHUNKED"),
            ],
            groups: vec![ModelGroup {
                image_size: ImageSize::Px160,
                models: vec![ModelVariant::MobileNetV2_160A75],
            }],
            repetitions: 5,
        }
    }
}

impl SweepPlan {
    /// Reads a plan from a JSON file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading plan {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing plan {}", path.display()))
    }

    /// Every (size, model) pair, group by group.
    pub fn combinations(&self) -> impl Iterator<Item = (ImageSize, ModelVariant)> + '_ {
        self.groups
            .iter()
            .flat_map(|group| group.models.iter().map(move |model| (group.image_size, *model)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStrategy {
    /// Wipe, upload every chunk, then train each model on the whole dataset.
    FullReset,
    /// Wipe per model, then add one chunk at a time and train after each.
    Cumulative,
    /// Like `Cumulative`, but the first chunk is uploaded without training.
    Incremental,
}

impl Default for SweepStrategy {
    fn default() -> Self {
        SweepStrategy::FullReset
    }
}

impl Display for SweepStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SweepStrategy::FullReset => "full-reset",
            SweepStrategy::Cumulative => "cumulative",
            SweepStrategy::Incremental => "incremental",
        };
        f.write_str(name)
    }
}

impl FromStr for SweepStrategy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "full-reset" => Ok(SweepStrategy::FullReset),
            "cumulative" => Ok(SweepStrategy::Cumulative),
            "incremental" => Ok(SweepStrategy::Incremental),
            other => anyhow::bail!("unknown strategy `{}`, expected full-reset, cumulative or incremental", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Halt,
    /// Log the failure and move on to the next configuration.
    Continue,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Halt
    }
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub completed: Vec<ResultRecord>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, RunError)>,
}

/// What became of one configuration under the failure policy.
enum Attempt {
    Finished(RunOutcome),
    /// Recorded as failed; the sweep goes on.
    Failed { dataset_uploaded: bool },
}

/// Runs a [`SweepPlan`] against one remote project, one configuration at a time.
pub struct Sweep {
    client: Box<dyn JobClient>,
    transport: Box<dyn DatasetTransport>,
    preparer: Option<Box<dyn DatasetPreparer>>,
    downloader: Option<Box<dyn ArtifactDownloader>>,
    poller: Poller,
    options: RunOptions,
    results_dir: PathBuf,
    strategy: SweepStrategy,
    failure_policy: FailurePolicy,
}

impl Sweep {
    pub fn new(
        client: Box<dyn JobClient>,
        transport: Box<dyn DatasetTransport>,
        poller: Poller,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Sweep {
            client,
            transport,
            preparer: None,
            downloader: None,
            poller,
            options: RunOptions::default(),
            results_dir: results_dir.into(),
            strategy: SweepStrategy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn strategy(mut self, strategy: SweepStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn preparer(mut self, preparer: Box<dyn DatasetPreparer>) -> Self {
        self.preparer = Some(preparer);
        self
    }

    pub fn downloader(mut self, downloader: Box<dyn ArtifactDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn run(&mut self, plan: &SweepPlan) -> Result<SweepReport, RunError> {
        let mut report = SweepReport::default();
        info!(strategy = %self.strategy, repetitions = plan.repetitions, datasets = plan.datasets.len(), "starting sweep");
        for repetition in 0..plan.repetitions {
            if let Some(preparer) = self.preparer.as_mut() {
                preparer.prepare(u64::from(repetition))?;
            }
            for dataset in &plan.datasets {
                let chunks = sorted_chunks(dataset).map_err(|source| RunError::Listing {
                    path: dataset.clone(),
                    source,
                })?;
                if chunks.is_empty() {
                    return Err(RunError::EmptyDataset(dataset.clone()));
                }
                info!(dataset = %dataset.display(), repetition, chunks = chunks.len(), "processing dataset");
                match self.strategy {
                    SweepStrategy::FullReset => self.full_reset(plan, dataset, &chunks, repetition, &mut report)?,
                    SweepStrategy::Cumulative | SweepStrategy::Incremental => {
                        for (image_size, model) in plan.combinations() {
                            let base = base_save_name(dataset, image_size, model, repetition);
                            self.chunk_by_chunk(&base, &chunks, image_size, model, repetition, &mut report)?;
                        }
                    }
                }
            }
        }
        info!(
            completed = report.completed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "sweep finished"
        );
        Ok(report)
    }

    fn full_reset(
        &mut self,
        plan: &SweepPlan,
        dataset: &Path,
        chunks: &[PathBuf],
        repetition: u32,
        report: &mut SweepReport,
    ) -> Result<(), RunError> {
        let last_chunk = chunks.len() - 1;
        let configs: Vec<ExperimentConfig> = plan
            .combinations()
            .map(|(image_size, model)| {
                let save_name = format!(
                    "{}_chunk_{}",
                    base_save_name(dataset, image_size, model, repetition),
                    last_chunk
                );
                ExperimentConfig::new(save_name, dataset, model, image_size, repetition).without_upload()
            })
            .collect();
        if self.all_done(&configs) {
            info!(dataset = %dataset.display(), repetition, "every result exists, skipping dataset");
            report.skipped.extend(configs.into_iter().map(|config| config.save_name));
            return Ok(());
        }

        self.wipe()?;
        for chunk in chunks {
            self.transport.upload(chunk)?;
        }
        info!(dataset = %dataset.display(), chunks = chunks.len(), "dataset uploaded");

        for config in &configs {
            self.execute(config, report)?;
        }
        Ok(())
    }

    fn chunk_by_chunk(
        &mut self,
        base: &str,
        chunks: &[PathBuf],
        image_size: ImageSize,
        model: ModelVariant,
        repetition: u32,
        report: &mut SweepReport,
    ) -> Result<(), RunError> {
        let seed_first = self.strategy == SweepStrategy::Incremental;
        let configs: Vec<ExperimentConfig> = chunks
            .iter()
            .skip(usize::from(seed_first))
            .map(|chunk| {
                let save_name = format!("{}_chunk_{}", base, chunk_suffix(chunk));
                ExperimentConfig::new(save_name, chunk.as_path(), model, image_size, repetition)
            })
            .collect();
        if self.all_done(&configs) {
            info!(save_name = base, "every chunk result exists, skipping");
            report.skipped.extend(configs.into_iter().map(|config| config.save_name));
            return Ok(());
        }

        self.wipe()?;
        if seed_first {
            // Training needs at least two classes, so the first chunk only seeds the data.
            self.transport.upload(&chunks[0])?;
        }
        for config in &configs {
            // Later chunks train on the data of earlier ones, so a chunk that
            // was not sent by its own run is sent here.
            match self.execute(config, report)? {
                Attempt::Finished(RunOutcome::Skipped { .. }) | Attempt::Failed { dataset_uploaded: false } => {
                    self.transport.upload(&config.dataset_path)?
                }
                Attempt::Finished(RunOutcome::Completed(_)) | Attempt::Failed { dataset_uploaded: true } => {}
            }
        }
        Ok(())
    }

    fn all_done(&self, configs: &[ExperimentConfig]) -> bool {
        configs
            .iter()
            .all(|config| results_path(&self.results_dir, &config.save_name).exists())
    }

    fn wipe(&mut self) -> Result<(), RunError> {
        info!("deleting all remote data");
        match self.client.delete_all_data() {
            Ok(()) => Ok(()),
            Err(error) if self.options.tolerate_delete_failure => {
                warn!(%error, "could not delete remote data, continuing");
                Ok(())
            }
            Err(source) => Err(RunError::Remote {
                stage: Stage::Idle,
                source,
            }),
        }
    }

    /// Runs one configuration, applying the failure policy.
    fn execute(&mut self, config: &ExperimentConfig, report: &mut SweepReport) -> Result<Attempt, RunError> {
        let mut run = PipelineRun::new(
            &mut *self.client,
            &mut *self.transport,
            &mut self.poller,
            &self.options,
            &self.results_dir,
        );
        if let Some(downloader) = self.downloader.as_mut() {
            run = run.with_downloader(downloader.as_mut());
        }
        match run.execute(config) {
            Ok(outcome) => {
                match &outcome {
                    RunOutcome::Skipped { .. } => report.skipped.push(config.save_name.clone()),
                    RunOutcome::Completed(record) => report.completed.push(record.clone()),
                }
                Ok(Attempt::Finished(outcome))
            }
            Err(error) if self.failure_policy == FailurePolicy::Continue && !error.is_precondition() => {
                error!(save_name = %config.save_name, %error, "run failed, continuing with the next configuration");
                let dataset_uploaded = !config.upload_dataset || error.after_upload();
                report.failed.push((config.save_name.clone(), error));
                Ok(Attempt::Failed { dataset_uploaded })
            }
            Err(error) => {
                error!(save_name = %config.save_name, %error, "run failed");
                Err(error)
            }
        }
    }
}

/// Last character of the chunk directory name, as used in result file names.
fn chunk_suffix(chunk: &Path) -> String {
    chunk
        .file_name()
        .and_then(|name| name.to_string_lossy().chars().last())
        .map(String::from)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::job::JobState, tracking::fake::*};
    use std::time::Duration;

    struct Fixture {
        dir: tempfile::TempDir,
        results: PathBuf,
        dataset: PathBuf,
        log: CallLog,
    }

    impl Fixture {
        fn new(chunks: &[&str]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let results = dir.path().join("results");
            std::fs::create_dir(&results).unwrap();
            let dataset = dir.path().join("EXP1_FRONT_CHUNKED");
            for chunk in chunks {
                std::fs::create_dir_all(dataset.join(chunk).join("training")).unwrap();
            }
            Fixture {
                dir,
                results,
                dataset,
                log: CallLog::default(),
            }
        }

        fn sweep(&self, client: FakeClient, strategy: SweepStrategy) -> Sweep {
            Sweep::new(
                Box::new(client),
                Box::new(FakeTransport::new(self.log.clone())),
                Poller::with_sleep(Duration::from_secs(10), Box::new(RecordingSleep::default())),
                &self.results,
            )
            .strategy(strategy)
            .preparer(Box::new(FakePreparer::new(self.log.clone())))
        }

        fn plan(&self, models: &[ModelVariant], repetitions: u32) -> SweepPlan {
            SweepPlan {
                datasets: vec![self.dataset.clone()],
                groups: vec![ModelGroup {
                    image_size: ImageSize::Px160,
                    models: models.to_vec(),
                }],
                repetitions,
            }
        }

        fn client(&self) -> FakeClient {
            FakeClient::with_log(self.log.clone())
        }

        fn result_exists(&self, save_name: &str) -> bool {
            results_path(&self.results, save_name).exists()
        }
    }

    const A75: ModelVariant = ModelVariant::MobileNetV2_160A75;
    const A35: ModelVariant = ModelVariant::MobileNetV2_160A35;

    #[test]
    fn default_plan_matches_the_three_dataset_experiment() {
        let plan = SweepPlan::default();
        assert_eq!(plan.datasets.len(), 3);
        assert_eq!(plan.repetitions, 5);
        assert_eq!(plan.combinations().collect::<Vec<_>>(), [(ImageSize::Px160, A75)]);
    }

    #[test]
    fn plan_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(
            &path,
            r#"{ "groups": [ { "image_size": 96, "models": ["transfer_mobilenetv2_a35", "transfer_mobilenetv1_a25_d100"] } ], "repetitions": 2 }"#,
        )
        .unwrap();
        let plan = SweepPlan::from_file(&path).unwrap();
        assert_eq!(plan.repetitions, 2);
        assert_eq!(plan.datasets, SweepPlan::default().datasets);
        assert_eq!(
            plan.combinations().collect::<Vec<_>>(),
            [
                (ImageSize::Px96, ModelVariant::MobileNetV2A35),
                (ImageSize::Px96, ModelVariant::MobileNetV1A25D100)
            ]
        );
    }

    #[test]
    fn plans_with_unsupported_sizes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, r#"{ "groups": [ { "image_size": 128, "models": [] } ] }"#).unwrap();
        assert!(SweepPlan::from_file(&path).is_err());
    }

    #[test]
    fn strategies_parse_from_their_names() {
        for strategy in &[SweepStrategy::FullReset, SweepStrategy::Cumulative, SweepStrategy::Incremental] {
            assert_eq!(strategy.to_string().parse::<SweepStrategy>().unwrap(), *strategy);
        }
        assert!("random".parse::<SweepStrategy>().is_err());
    }

    #[test]
    fn full_reset_uploads_every_chunk_then_trains_each_model() {
        let fixture = Fixture::new(&["chunk_1", "chunk_0", "chunk_2"]);
        let mut sweep = fixture.sweep(fixture.client(), SweepStrategy::FullReset);

        let report = sweep.run(&fixture.plan(&[A75, A35], 1)).unwrap();

        assert_eq!(report.completed.len(), 2);
        let actions = fixture.log.actions();
        assert_eq!(
            &actions[..6],
            [
                "prepare(0)",
                "delete_all_data",
                "upload(chunk_0)",
                "upload(chunk_1)",
                "upload(chunk_2)",
                "delete_pipeline",
            ]
        );
        assert_eq!(fixture.log.count_prefix("upload"), 3);
        assert_eq!(fixture.log.count_prefix("create_pipeline"), 2);
        assert!(fixture.result_exists("EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run0_chunk_2"));
        assert!(fixture.result_exists("EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a35_run0_chunk_2"));
    }

    #[test]
    fn finished_datasets_are_not_touched_again() {
        let fixture = Fixture::new(&["chunk_0", "chunk_1"]);
        let mut sweep = fixture.sweep(fixture.client(), SweepStrategy::FullReset);
        let plan = fixture.plan(&[A75], 2);
        sweep.run(&plan).unwrap();
        fixture.log.clear();

        let mut resumed = fixture.sweep(fixture.client(), SweepStrategy::FullReset);
        let report = resumed.run(&plan).unwrap();

        assert!(report.completed.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(fixture.log.actions(), ["prepare(0)", "prepare(1)"]);
    }

    #[test]
    fn repetitions_prepare_with_their_index_as_seed() {
        let fixture = Fixture::new(&["chunk_0"]);
        let mut sweep = fixture.sweep(fixture.client(), SweepStrategy::FullReset);
        sweep.run(&fixture.plan(&[A75], 3)).unwrap();

        let seeds: Vec<_> = fixture
            .log
            .entries()
            .into_iter()
            .filter(|entry| entry.starts_with("prepare"))
            .collect();
        assert_eq!(seeds, ["prepare(0)", "prepare(1)", "prepare(2)"]);
        for run in 0..3 {
            assert!(fixture.result_exists(&format!(
                "EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run{}_chunk_0",
                run
            )));
        }
    }

    #[test]
    fn cumulative_trains_after_every_chunk() {
        let fixture = Fixture::new(&["chunk_0", "chunk_1", "chunk_2"]);
        let mut sweep = fixture.sweep(fixture.client(), SweepStrategy::Cumulative);

        let report = sweep.run(&fixture.plan(&[A75], 1)).unwrap();

        assert_eq!(report.completed.len(), 3);
        let uploads: Vec<_> = fixture
            .log
            .entries()
            .into_iter()
            .filter(|entry| entry.starts_with("upload") || entry == "delete_all_data")
            .collect();
        assert_eq!(uploads, ["delete_all_data", "upload(chunk_0)", "upload(chunk_1)", "upload(chunk_2)"]);
        for chunk in 0..3 {
            assert!(fixture.result_exists(&format!(
                "EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run0_chunk_{}",
                chunk
            )));
        }
    }

    #[test]
    fn incremental_seeds_with_the_first_chunk() {
        let fixture = Fixture::new(&["chunk_0", "chunk_1", "chunk_2"]);
        let mut sweep = fixture.sweep(fixture.client(), SweepStrategy::Incremental);

        let report = sweep.run(&fixture.plan(&[A75], 1)).unwrap();

        assert_eq!(report.completed.len(), 2);
        let actions = fixture.log.actions();
        assert_eq!(&actions[..4], ["prepare(0)", "delete_all_data", "upload(chunk_0)", "delete_pipeline"]);
        assert!(!fixture.result_exists("EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run0_chunk_0"));
        assert!(fixture.result_exists("EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run0_chunk_1"));
        assert!(fixture.result_exists("EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run0_chunk_2"));
    }

    #[test]
    fn skipped_chunks_are_still_uploaded() {
        let fixture = Fixture::new(&["chunk_0", "chunk_1"]);
        std::fs::write(
            results_path(&fixture.results, "EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run0_chunk_0"),
            "{}",
        )
        .unwrap();
        let mut sweep = fixture.sweep(fixture.client(), SweepStrategy::Cumulative);

        let report = sweep.run(&fixture.plan(&[A75], 1)).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.completed.len(), 1);
        let actions = fixture.log.actions();
        assert_eq!(
            &actions[..5],
            ["prepare(0)", "delete_all_data", "upload(chunk_0)", "delete_pipeline", "upload(chunk_1)"]
        );
    }

    #[test]
    fn halt_stops_at_the_first_failure() {
        let fixture = Fixture::new(&["chunk_0"]);
        let mut client = fixture.client();
        client.script_statuses(&[JobState::Succeeded, JobState::Failed]);
        let mut sweep = fixture.sweep(client, SweepStrategy::FullReset);

        let result = sweep.run(&fixture.plan(&[A75, A35], 1));

        assert!(matches!(result, Err(RunError::Job { .. })));
        assert_eq!(fixture.log.count_prefix("create_pipeline"), 1);
    }

    #[test]
    fn continue_moves_on_to_the_next_configuration() {
        let fixture = Fixture::new(&["chunk_0"]);
        let mut client = fixture.client();
        client.fail_on("start_training(13 transfer_mobilenetv2_160_a75)");
        let mut sweep = fixture
            .sweep(client, SweepStrategy::FullReset)
            .failure_policy(FailurePolicy::Continue);

        let report = sweep.run(&fixture.plan(&[A75, A35], 1)).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run0_chunk_0");
        assert_eq!(report.completed.len(), 1);
        assert!(fixture.result_exists("EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a35_run0_chunk_0"));
    }

    #[test]
    fn chunks_of_runs_failing_before_their_upload_are_sent_again() {
        let fixture = Fixture::new(&["chunk_0", "chunk_1"]);
        let mut sweep = Sweep::new(
            Box::new(fixture.client()),
            Box::new(FakeTransport::failing_once(fixture.log.clone())),
            Poller::with_sleep(Duration::from_secs(10), Box::new(RecordingSleep::default())),
            &fixture.results,
        )
        .strategy(SweepStrategy::Cumulative)
        .failure_policy(FailurePolicy::Continue);

        let report = sweep.run(&fixture.plan(&[A75], 1)).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "EXP1_FRONT_CHUNKED_160_transfer_mobilenetv2_160_a75_run0_chunk_0");
        assert_eq!(report.completed.len(), 1);
        let uploads: Vec<_> = fixture
            .log
            .entries()
            .into_iter()
            .filter(|entry| entry.starts_with("upload"))
            .collect();
        assert_eq!(uploads, ["upload(chunk_0)", "upload(chunk_0)", "upload(chunk_1)"]);
    }

    #[test]
    fn chunks_of_runs_failing_after_their_upload_are_not_sent_twice() {
        let fixture = Fixture::new(&["chunk_0", "chunk_1"]);
        let mut client = fixture.client();
        client.fail_on("start_training(13 transfer_mobilenetv2_160_a75)");
        let mut sweep = fixture
            .sweep(client, SweepStrategy::Cumulative)
            .failure_policy(FailurePolicy::Continue);

        let report = sweep.run(&fixture.plan(&[A75], 1)).unwrap();

        assert_eq!(report.failed.len(), 2);
        assert_eq!(fixture.log.count("upload(chunk_0)"), 1);
        assert_eq!(fixture.log.count("upload(chunk_1)"), 1);
    }

    #[test]
    fn missing_datasets_halt_even_when_continuing() {
        let fixture = Fixture::new(&[]);
        let mut sweep = fixture
            .sweep(fixture.client(), SweepStrategy::FullReset)
            .failure_policy(FailurePolicy::Continue);
        let mut plan = fixture.plan(&[A75], 1);
        plan.datasets = vec![fixture.dir.path().join("EXP9_MISSING")];

        assert!(matches!(sweep.run(&plan), Err(RunError::Listing { .. })));
        assert_eq!(fixture.log.count_prefix("delete"), 0);
    }

    #[test]
    fn chunk_suffix_is_the_last_character() {
        assert_eq!(chunk_suffix(Path::new("BASE/EXP1/chunk_7")), "7");
        assert_eq!(chunk_suffix(Path::new("BASE/EXP1/chunk_12")), "2");
    }
}
