//! Process configuration, read once from the environment.

use std::{env, path::PathBuf, time::Duration};
use thiserror::Error;

use crate::ProjectId;

pub const DEFAULT_API_URL: &str = "https://studio.edgeimpulse.com/v1/api";
pub const DEFAULT_INGESTION_URL: &str = "https://ingestion.edgeimpulse.com";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("the environment variable {0} is not set")]
    Missing(&'static str),
    #[error("the environment variable {name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Credentials and endpoints shared by every component.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub project_id: ProjectId,
    pub api_url: String,
    pub ingestion_url: String,
    pub poll_interval: Duration,
    pub results_dir: PathBuf,
}

impl Settings {
    pub fn new(api_key: impl Into<String>, project_id: ProjectId) -> Self {
        Settings {
            api_key: api_key.into(),
            project_id,
            api_url: DEFAULT_API_URL.to_string(),
            ingestion_url: DEFAULT_INGESTION_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            results_dir: PathBuf::from("."),
        }
    }

    /// Loads a `.env` file if there is one, then reads the `EI_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(error) = dotenvy::dotenv() {
            if !error.not_found() {
                tracing::warn!(%error, "ignoring unreadable .env file");
            }
        }
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let api_key = lookup("EI_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::Missing("EI_API_KEY"))?;
        let project_id = lookup("EI_PROJECT_ID").ok_or(ConfigError::Missing("EI_PROJECT_ID"))?;
        let project_id = parse("EI_PROJECT_ID", project_id)?;

        let mut settings = Settings::new(api_key, ProjectId::from(project_id));
        if let Some(url) = lookup("EI_API_URL") {
            settings.api_url = url;
        }
        if let Some(url) = lookup("EI_INGESTION_URL") {
            settings.ingestion_url = url;
        }
        if let Some(seconds) = lookup("EI_POLL_INTERVAL_SECS") {
            settings.poll_interval = Duration::from_secs(parse("EI_POLL_INTERVAL_SECS", seconds)?);
        }
        if let Some(dir) = lookup("EI_RESULTS_DIR") {
            settings.results_dir = PathBuf::from(dir);
        }
        Ok(settings)
    }
}

fn parse(name: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let vars: HashMap<&'static str, String> = vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let settings = Settings::from_lookup(lookup(&[("EI_API_KEY", "ei_123"), ("EI_PROJECT_ID", "712900")])).unwrap();
        assert_eq!(settings.api_key, "ei_123");
        assert_eq!(settings.project_id, ProjectId::from(712900));
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.poll_interval, Duration::from_secs(10));
        assert_eq!(settings.results_dir, PathBuf::from("."));
    }

    #[test]
    fn overrides_are_read() {
        let settings = Settings::from_lookup(lookup(&[
            ("EI_API_KEY", "ei_123"),
            ("EI_PROJECT_ID", "1"),
            ("EI_API_URL", "http://localhost:4800/v1/api"),
            ("EI_POLL_INTERVAL_SECS", "2"),
            ("EI_RESULTS_DIR", "out"),
        ]))
        .unwrap();
        assert_eq!(settings.api_url, "http://localhost:4800/v1/api");
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.results_dir, PathBuf::from("out"));
    }

    #[test]
    fn missing_or_invalid_values_are_errors() {
        assert!(matches!(
            Settings::from_lookup(lookup(&[("EI_PROJECT_ID", "1")])),
            Err(ConfigError::Missing("EI_API_KEY"))
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[("EI_API_KEY", "k")])),
            Err(ConfigError::Missing("EI_PROJECT_ID"))
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[("EI_API_KEY", "k"), ("EI_PROJECT_ID", "abc")])),
            Err(ConfigError::Invalid { name: "EI_PROJECT_ID", .. })
        ));
    }
}
