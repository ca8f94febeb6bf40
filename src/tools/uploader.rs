use std::{
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info, warn};

use super::{require_dir, DatasetTransport, UploadError};
use crate::config::Settings;

/// Uploads through the `edge-impulse-uploader` command line tool.
pub struct UploaderCli {
    program: PathBuf,
    api_key: String,
}

impl UploaderCli {
    pub fn new(settings: &Settings) -> Self {
        UploaderCli {
            program: PathBuf::from("edge-impulse-uploader"),
            api_key: settings.api_key.clone(),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, dir: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("--api-key").arg(&self.api_key).arg("--directory").arg(dir);
        command
    }
}

impl DatasetTransport for UploaderCli {
    fn upload(&mut self, dir: &Path) -> Result<(), UploadError> {
        require_dir(dir)?;
        info!(dir = %dir.display(), "uploading dataset directory");
        let output = self.command(dir).output().map_err(UploadError::Spawn)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(%stdout, %stderr, "uploader finished");
        if output.status.success() {
            Ok(())
        } else {
            warn!(status = %output.status, %stderr, "uploader failed");
            Err(UploadError::Tool {
                status: output.status.to_string(),
                stderr: stderr.into_owned(),
            })
        }
    }
}
