use anyhow::{bail, Context, Result};
use impulse_sweep::{
    api::{
        results::{results_path, Accuracy},
        training::{ImageSize, ModelVariant},
    },
    backend::{ingestion::Ingestion, rest::Studio},
    tools::{
        ArtifactDownloader, CommandPreparer, DatasetPreparer, DatasetTransport, RunnerCli, SeededPartitioner,
        UploaderCli,
    },
    tracking::{
        base_save_name, ExperimentConfig, FailurePolicy, PipelineRun, Poller, RunOptions, RunOutcome, Sweep,
        SweepPlan, SweepStrategy,
    },
    JobClient, JobId, Settings,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
impulse-sweep [-v] <command> [options]

commands:
  sweep     [--strategy full-reset|cumulative|incremental] [--plan FILE] [--repetitions N]
            [--prepare-cmd CMD | --partition-source DIR --partition-output DIR --chunks N]
            [--native-upload] [--continue-on-failure] [--download] [--strict-delete]
  run       --dataset DIR --model VARIANT --size 96|160 [--save-name NAME] [--repetition N]
            [--no-upload] [--native-upload] [--download]
  status    JOB_ID
  results   [FILE]
  download  [--model-name NAME] [--clean]
  reset
";

struct SweepArgs {
    strategy: SweepStrategy,
    plan: Option<PathBuf>,
    repetitions: Option<u32>,
    prepare_cmd: Option<String>,
    partition_source: Option<PathBuf>,
    partition_output: Option<PathBuf>,
    chunks: usize,
    native_upload: bool,
    continue_on_failure: bool,
    download: bool,
    strict_delete: bool,
}

struct RunArgs {
    dataset: PathBuf,
    model: ModelVariant,
    size: ImageSize,
    save_name: Option<String>,
    repetition: u32,
    no_upload: bool,
    native_upload: bool,
    download: bool,
}

enum Command {
    Sweep(SweepArgs),
    Run(RunArgs),
    Status(u64),
    Results(Option<PathBuf>),
    Download { model_name: String, clean: bool },
    Reset,
}

struct Args {
    verbose: bool,
    command: Command,
}

impl Args {
    pub fn from_env() -> Result<Self> {
        Args::parse(pico_args::Arguments::from_env())
    }

    fn parse(mut args: pico_args::Arguments) -> Result<Self> {
        let verbose = args.contains(["-v", "--verbose"]);
        if args.contains(["-h", "--help"]) {
            print!("{}", USAGE);
            std::process::exit(0);
        }
        let command = match args.subcommand()?.as_deref() {
            Some("sweep") => Command::Sweep(SweepArgs {
                strategy: args.opt_value_from_str("--strategy")?.unwrap_or_default(),
                plan: args.opt_value_from_str("--plan")?,
                repetitions: args.opt_value_from_str("--repetitions")?,
                prepare_cmd: args.opt_value_from_str("--prepare-cmd")?,
                partition_source: args.opt_value_from_str("--partition-source")?,
                partition_output: args.opt_value_from_str("--partition-output")?,
                chunks: args.opt_value_from_str("--chunks")?.unwrap_or(7),
                native_upload: args.contains("--native-upload"),
                continue_on_failure: args.contains("--continue-on-failure"),
                download: args.contains("--download"),
                strict_delete: args.contains("--strict-delete"),
            }),
            Some("run") => Command::Run(RunArgs {
                dataset: args.value_from_str("--dataset")?,
                model: args.value_from_str("--model")?,
                size: args.value_from_str("--size")?,
                save_name: args.opt_value_from_str("--save-name")?,
                repetition: args.opt_value_from_str("--repetition")?.unwrap_or(0),
                no_upload: args.contains("--no-upload"),
                native_upload: args.contains("--native-upload"),
                download: args.contains("--download"),
            }),
            Some("status") => match args.free_from_str()? {
                Some(job) => Command::Status(job),
                None => bail!("status needs a job id\n\n{}", USAGE),
            },
            Some("results") => Command::Results(args.free_from_str()?),
            Some("download") => Command::Download {
                model_name: args
                    .opt_value_from_str("--model-name")?
                    .unwrap_or_else(|| "model.eim".to_string()),
                clean: args.contains("--clean"),
            },
            Some("reset") => Command::Reset,
            Some(other) => bail!("unknown command `{}`\n\n{}", other, USAGE),
            None => bail!("no command given\n\n{}", USAGE),
        };
        args.finish()?;
        Ok(Args { verbose, command })
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn transport(settings: &Settings, native: bool) -> Box<dyn DatasetTransport> {
    if native {
        Box::new(Ingestion::new(settings))
    } else {
        Box::new(UploaderCli::new(settings))
    }
}

fn sweep(settings: &Settings, args: SweepArgs) -> Result<()> {
    let mut plan = match &args.plan {
        Some(path) => SweepPlan::from_file(path)?,
        None => SweepPlan::default(),
    };
    if let Some(repetitions) = args.repetitions {
        plan.repetitions = repetitions;
    }
    let options = RunOptions {
        download_model: args.download,
        tolerate_delete_failure: !args.strict_delete,
        ..RunOptions::default()
    };
    let failure_policy = if args.continue_on_failure {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Halt
    };

    let mut sweep = Sweep::new(
        Box::new(Studio::new(settings)),
        transport(settings, args.native_upload),
        Poller::new(settings.poll_interval),
        &settings.results_dir,
    )
    .strategy(args.strategy)
    .failure_policy(failure_policy)
    .options(options);

    let preparer: Option<Box<dyn DatasetPreparer>> = match (args.prepare_cmd, args.partition_source) {
        (Some(_), Some(_)) => bail!("--prepare-cmd and --partition-source cannot be combined"),
        (Some(line), None) => Some(Box::new(
            CommandPreparer::from_command_line(&line).context("--prepare-cmd is empty")?,
        )),
        (None, Some(source)) => {
            let output = args
                .partition_output
                .context("--partition-source needs --partition-output")?;
            Some(Box::new(SeededPartitioner::new(source, output, args.chunks)))
        }
        (None, None) => None,
    };
    if let Some(preparer) = preparer {
        sweep = sweep.preparer(preparer);
    }
    if args.download {
        sweep = sweep.downloader(Box::new(RunnerCli::new(settings)));
    }

    let report = sweep.run(&plan)?;
    for record in &report.completed {
        println!("{}\t{:.4}", record.save_name, record.accuracy_score());
    }
    for (save_name, error) in &report.failed {
        println!("{}\tfailed: {}", save_name, error);
    }
    info!(
        completed = report.completed.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "done"
    );
    if !report.failed.is_empty() {
        bail!("{} configurations failed", report.failed.len());
    }
    Ok(())
}

impl RunArgs {
    fn config(&self) -> ExperimentConfig {
        let save_name = match &self.save_name {
            Some(save_name) => save_name.clone(),
            None => base_save_name(&self.dataset, self.size, self.model, self.repetition),
        };
        let config = ExperimentConfig::new(save_name, &self.dataset, self.model, self.size, self.repetition);
        if self.no_upload {
            config.without_upload()
        } else {
            config
        }
    }
}

fn run(settings: &Settings, args: RunArgs) -> Result<()> {
    let config = args.config();
    let options = RunOptions {
        download_model: args.download,
        ..RunOptions::default()
    };

    let mut client = Studio::new(settings);
    let mut uploader = transport(settings, args.native_upload);
    let mut poller = Poller::new(settings.poll_interval);
    let mut downloader = RunnerCli::new(settings);
    let mut pipeline = PipelineRun::new(
        &mut client,
        uploader.as_mut(),
        &mut poller,
        &options,
        &settings.results_dir,
    );
    if args.download {
        pipeline = pipeline.with_downloader(&mut downloader);
    }
    match pipeline.execute(&config)? {
        RunOutcome::Skipped { results } => println!("already done: {}", results.display()),
        RunOutcome::Completed(record) => println!("{}\t{:.4}", record.save_name, record.accuracy_score()),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::from_env()?;
    init_logging(args.verbose);
    let settings = Settings::from_env()?;
    let mut client = Studio::new(&settings);

    match args.command {
        Command::Sweep(sweep_args) => sweep(&settings, sweep_args)?,
        Command::Run(run_args) => run(&settings, run_args)?,
        Command::Status(job) => {
            let state = client.job_status(JobId::from(job))?;
            println!("job {}: {:?}", job, state);
        }
        Command::Results(file) => {
            let path = file.unwrap_or_else(|| results_path(&settings.results_dir, "latest"));
            match client.fetch_results(&path)? {
                Accuracy::Score(score) => println!("accuracy {:.4}, saved to {}", score, path.display()),
                Accuracy::Unavailable => println!("no accuracy in the response, saved to {}", path.display()),
            }
        }
        Command::Download { model_name, clean } => {
            RunnerCli::new(&settings).clean(clean).download(&model_name)?;
        }
        Command::Reset => {
            client.delete_pipeline()?;
            client.delete_all_data()?;
            println!("pipeline and data deleted");
        }
    }
    Ok(())
}
