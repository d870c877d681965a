use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const ANALYSIS_CONFIGURATION_FILE_NAME: &str = "typelens.settings.json";

const DEFAULT_DOCUMENT_URI: &str = "inmemory:///workspace/main.rb";
const DEFAULT_ROOT_URI: &str = "inmemory:///workspace/";
const DEFAULT_LANGUAGE_ID: &str = "ruby";

/// Tunables of the resolution retry loop.
///
/// The defaults were measured against TypeProf warm-up latency; other
/// servers may want different values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub initial_delay_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// The first retry waits `d`, every later one waits `2d`.
    pub fn delay_before_retry(&self, completed_attempts: u32) -> Duration {
        if completed_attempts <= 1 {
            Duration::from_millis(self.retry_delay_ms)
        } else {
            Duration::from_millis(self.retry_delay_ms.saturating_mul(2))
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_retries: 3,
            retry_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    pub document_uri: String,
    pub root_uri: String,
    pub language_id: String,
    pub debounce_ms: u64,
    pub request_timeout_ms: u64,
    pub retry: RetryConfig,
}

impl AnalysisConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            document_uri: DEFAULT_DOCUMENT_URI.to_string(),
            root_uri: DEFAULT_ROOT_URI.to_string(),
            language_id: DEFAULT_LANGUAGE_ID.to_string(),
            debounce_ms: 300,
            request_timeout_ms: 10_000,
            retry: RetryConfig::default(),
        }
    }
}

pub fn read_analysis_config(path: &Path) -> AnalysisConfig {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                "Could not read analysis configuration {}: {}. Returning default configuration.",
                path.display(),
                e
            );
            return AnalysisConfig::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(configuration) => configuration,
        Err(e) => {
            warn!(
                "Could not parse analysis configuration: {}. Returning default configuration.",
                e
            );
            AnalysisConfig::default()
        }
    }
}

/// Reads the configuration from `directory`, writing the defaults there first
/// if no file exists yet.
pub fn get_or_create_analysis_config(directory: &Path) -> AnalysisConfig {
    let configuration_path: PathBuf = directory.join(ANALYSIS_CONFIGURATION_FILE_NAME);

    if !configuration_path.exists() {
        let configuration = AnalysisConfig::default();
        if let Err(e) = configuration.save(&configuration_path) {
            warn!(
                "Could not save analysis configuration: {}. Returning default configuration.",
                e
            );
            return configuration;
        }

        info!(
            "Created new analysis configuration file at {}.",
            configuration_path.display()
        );
        return configuration;
    }

    read_analysis_config(&configuration_path)
}
