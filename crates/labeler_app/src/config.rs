use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use labeler_core::{FlushSchedule, RetryPolicy};
use labeler_engine::{ClientSettings, ProcessorSettings};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "api.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file {} not found", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} does not define an api_key", .0.display())]
    MissingApiKey(PathBuf),
    #[error("inter_row_delay_secs must be a non-negative number of seconds, got {0}")]
    InvalidDelay(f64),
}

/// Contents of the JSON configuration file. Only `api_key` is required.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub prompt: Option<String>,
    pub text_column: Option<String>,
    pub inter_row_delay_secs: Option<f64>,
    pub flush_every: Option<usize>,
    /// Stop the whole run, as if interrupted, after this many seconds.
    pub max_runtime_secs: Option<u64>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("prompt", &self.prompt.as_ref().map(|p| p.chars().count()))
            .field("text_column", &self.text_column)
            .field("inter_row_delay_secs", &self.inter_row_delay_secs)
            .field("flush_every", &self.flush_every)
            .field("max_runtime_secs", &self.max_runtime_secs)
            .finish()
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: AppConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(path.to_path_buf()));
        }
        self.inter_row_delay()?;
        Ok(())
    }

    fn inter_row_delay(&self) -> Result<Option<Duration>, ConfigError> {
        self.inter_row_delay_secs
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidDelay(secs)))
            .transpose()
    }

    pub fn client_settings(&self) -> ClientSettings {
        let mut settings = ClientSettings::new(self.api_key.trim());
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(prompt) = &self.prompt {
            settings.prompt = prompt.clone();
        }
        settings
    }

    pub fn processor_settings(&self) -> ProcessorSettings {
        let defaults = ProcessorSettings::default();
        ProcessorSettings {
            text_column: self.text_column.clone(),
            inter_row_delay: self
                .inter_row_delay()
                .ok()
                .flatten()
                .unwrap_or(defaults.inter_row_delay),
            flush: self
                .flush_every
                .map(FlushSchedule::new)
                .unwrap_or(defaults.flush),
            retry: RetryPolicy::default(),
        }
    }

    /// Wall-clock bound for the run; zero means unbounded.
    pub fn max_runtime(&self) -> Option<Duration> {
        self.max_runtime_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
