use anyhow::{anyhow, Context};
use reqwest::blocking::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    api::error::ApiError,
    config::Settings,
    tools::{require_dir, DatasetTransport, UploadError},
};

/// Uploads image files straight to the ingestion service.
///
/// No label header is sent, so labels come from the file names.
pub struct Ingestion {
    base_url: String,
    api_key: String,
    http: Client,
}

#[derive(Deserialize)]
struct IngestionResponse {
    #[serde(default)]
    success: bool,
}

/// `training` or `testing` when the file sits below such a directory,
/// `split` to let the service decide.
fn category_of(relative: &Path) -> &'static str {
    relative
        .parent()
        .into_iter()
        .flat_map(Path::ancestors)
        .filter_map(|dir| dir.file_name()?.to_str())
        .find_map(|name| match name {
            "training" => Some("training"),
            "testing" => Some("testing"),
            _ => None,
        })
        .unwrap_or("split")
}

impl Ingestion {
    pub fn new(settings: &Settings) -> Self {
        Ingestion {
            base_url: settings.ingestion_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            http: Client::new(),
        }
    }

    fn upload_file(&self, category: &str, file: &Path) -> Result<(), ApiError> {
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("{} has no usable file name", file.display()))?;
        let content = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
        let url = format!("{}/api/{}/files", self.base_url, category);
        debug!(%url, file_name, "uploading file");

        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .context("invalid part content type")?;
        let http_response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .multipart(Form::new().part("data", part))
            .send()
            .with_context(|| format!("upload of {} could not be sent", file_name))?;
        let status = http_response.status().as_u16();
        let body = http_response.text().context("failed to turn response into string")?;
        if status != 200 {
            warn!(status, %body, file_name, "upload failed");
            return Err(ApiError::Status { status, body });
        }
        match serde_json::from_str::<IngestionResponse>(&body) {
            Ok(response) if response.success => Ok(()),
            _ => {
                warn!(status, %body, file_name, "upload was rejected");
                Err(ApiError::Rejected { body })
            }
        }
    }
}

impl DatasetTransport for Ingestion {
    fn upload(&mut self, dir: &Path) -> Result<(), UploadError> {
        require_dir(dir)?;
        let mut uploaded = 0usize;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|error| UploadError::Io(error.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file: PathBuf = entry.path().to_path_buf();
            let relative = file.strip_prefix(dir).unwrap_or(file.as_path());
            self.upload_file(category_of(relative), &file)
                .map_err(|source| UploadError::Remote { file: file.clone(), source })?;
            uploaded += 1;
        }
        info!(dir = %dir.display(), uploaded, "dataset directory ingested");
        Ok(())
    }
}
