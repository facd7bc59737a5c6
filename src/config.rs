//! TOML configuration
//!
//! Every section and field has a default, so an empty or partial file is
//! valid. A missing file yields the defaults.
//!
//! ```toml
//! [limits]
//! max_file_size = 10485760
//! max_content_length = 1048576
//! allowed_extensions = [".md", ".markdown", ".txt"]
//!
//! [rate_limit]
//! max_requests = 10
//! window_ms = 60000
//!
//! [output]
//! prettify = false
//! include_metadata = false
//! timeout_ms = 0
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::converter::ConversionOptions;
use crate::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, RateLimiter};
use crate::security::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_CONTENT_LENGTH, DEFAULT_MAX_FILE_SIZE,
    ValidationOptions,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub limits: LimitsConfig,
    pub rate_limit: RateLimitConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_file_size: u64,
    pub max_content_length: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub prettify: bool,
    pub include_metadata: bool,
    /// Zero disables the conversion timeout
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            max_size: self.limits.max_file_size,
            allowed_extensions: self.limits.allowed_extensions.clone(),
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limit.max_requests,
            Duration::from_millis(self.rate_limit.window_ms),
        )
    }

    pub fn conversion_options(&self, original_filename: Option<String>) -> ConversionOptions {
        ConversionOptions {
            original_filename,
            prettify: self.output.prettify,
            include_metadata: self.output.include_metadata,
            timeout: Duration::from_millis(self.output.timeout_ms),
            converted_at: None,
        }
    }
}
