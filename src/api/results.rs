use std::path::{Path, PathBuf};

use crate::api::error::ApiError;

/// Accuracy reported by an evaluation job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Accuracy {
    /// Fraction of correctly classified test samples, in `[0, 1]`.
    Score(f64),
    Unavailable,
}

impl Accuracy {
    /// The score, or `-1` when the response did not carry one.
    pub fn value(self) -> f64 {
        match self {
            Accuracy::Score(score) => score,
            Accuracy::Unavailable => -1.0,
        }
    }

    /// Reads `accuracy.accuracyScore` from a raw result body.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| value.get("accuracy")?.get("accuracyScore")?.as_f64())
            .map_or(Accuracy::Unavailable, Accuracy::Score)
    }
}

/// Outcome of one experiment configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub save_name: String,
    pub accuracy: Accuracy,
    pub raw_response: String,
}

impl ResultRecord {
    pub fn accuracy_score(&self) -> f64 {
        self.accuracy.value()
    }
}

/// Where the raw evaluation response of `save_name` is kept.
///
/// The file doubles as the marker that the configuration is done.
pub fn results_path(dir: &Path, save_name: &str) -> PathBuf {
    dir.join(format!("results_{}.json", save_name))
}

/// Writes `body` to `path` unchanged, replacing any previous file.
pub fn persist(body: &str, path: &Path) -> Result<Accuracy, ApiError> {
    std::fs::write(path, body).map_err(|source| ApiError::Persist {
        path: path.to_owned(),
        source,
    })?;
    Ok(Accuracy::from_body(body))
}
