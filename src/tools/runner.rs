use std::{
    io::{self, ErrorKind, Write},
    path::PathBuf,
    process::{Command, ExitStatus, Stdio},
    thread,
};
use tracing::{info, warn};

use super::{ArtifactDownloader, DownloadError};
use crate::{api::results::Accuracy, config::Settings};

/// Runner version whose download prompts are answered correctly.
pub const EXPECTED_RUNNER_VERSION: &str = "1.15.1";

/// Downloads `.eim` model files with `edge-impulse-linux-runner`.
pub struct RunnerCli {
    program: PathBuf,
    api_key: String,
    clean: bool,
}

impl RunnerCli {
    pub fn new(settings: &Settings) -> Self {
        RunnerCli {
            program: PathBuf::from("edge-impulse-linux-runner"),
            api_key: settings.api_key.clone(),
            clean: false,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Forget the cached login and project selection before downloading.
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn version(&self) -> Result<String, DownloadError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => DownloadError::NotInstalled,
                _ => DownloadError::Spawn(error),
            })?;
        if !output.status.success() {
            return Err(DownloadError::Tool(output.status.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn command(&self, model_file: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("--download").arg(model_file).arg("--api-key").arg(&self.api_key);
        if self.clean {
            command.arg("--clean");
        }
        command
    }
}

impl ArtifactDownloader for RunnerCli {
    fn download(&mut self, model_file: &str) -> Result<(), DownloadError> {
        if !model_file.ends_with(".eim") {
            return Err(DownloadError::InvalidName(model_file.to_string()));
        }
        let version = self.version()?;
        if version != EXPECTED_RUNNER_VERSION {
            warn!(%version, expected = EXPECTED_RUNNER_VERSION, "untested runner version, prompts may differ");
        }

        info!(model_file, "downloading model");
        let status = answer_prompts(self.command(model_file)).map_err(|error| match error.kind() {
            ErrorKind::NotFound => DownloadError::NotInstalled,
            _ => DownloadError::Spawn(error),
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(DownloadError::Tool(status.to_string()))
        }
    }
}

/// Runs `command`, answering every prompt with a blank line until it exits.
///
/// A blank answer selects the default choice.
fn answer_prompts(mut command: Command) -> io::Result<ExitStatus> {
    let mut child = command.stdin(Stdio::piped()).spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        // Ends with a broken pipe once the child is gone.
        thread::spawn(move || while stdin.write_all(&[b'\n'; 512]).is_ok() {});
    }
    child.wait()
}

/// `model_{save_name}_acc_{percent}.eim`, percent rounded to a whole number.
pub fn model_file_name(save_name: &str, accuracy: Accuracy) -> String {
    let percent = (accuracy.value() * 100.0).round() as i64;
    format!("model_{}_acc_{}.eim", save_name, percent)
}
