//! Configuration management for the schema approval system

use crate::constants::{ACTIVITY_MAX_ATTEMPTS, ACTIVITY_TIMEOUT_SECS};
use crate::error::{ApprovalError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment variables overriding file settings,
/// e.g. `SCHEMA_APPROVAL__RETRY__MAX_ATTEMPTS=5`
pub const ENV_PREFIX: &str = "SCHEMA_APPROVAL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Reviewer roster; required for live workflows only
    #[serde(default)]
    pub reviewers: Option<ReviewerConfig>,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Upper bound on live iterations; unbounded when absent
    #[serde(default)]
    pub max_live_iterations: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerConfig {
    #[serde(alias = "stage_one_reviewers")]
    pub stage_one: Vec<String>,

    #[serde(alias = "stage_two_reviewer")]
    pub stage_two: String,

    #[serde(alias = "stage_three_reviewer")]
    pub stage_three: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    #[serde(default = "default_backoff_coefficient")]
    pub backoff_coefficient: f64,

    #[serde(default = "default_maximum_interval_ms")]
    pub maximum_interval_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_interval_ms: default_initial_interval_ms(),
            backoff_coefficient: default_backoff_coefficient(),
            maximum_interval_ms: default_maximum_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(alias = "storage_root", default = "default_storage_root")]
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

// Default functions
fn default_max_attempts() -> u32 {
    ACTIVITY_MAX_ATTEMPTS
}

fn default_initial_interval_ms() -> u64 {
    1_000
}

fn default_backoff_coefficient() -> f64 {
    2.0
}

fn default_maximum_interval_ms() -> u64 {
    30_000
}

fn default_timeout_secs() -> u64 {
    ACTIVITY_TIMEOUT_SECS
}

fn default_storage_root() -> String {
    "s3://schemas".to_string()
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            reviewers: None,
            retry: RetryConfig::default(),
            storage: StorageConfig::default(),
            max_live_iterations: None,
        }
    }
}

impl ApprovalConfig {
    /// Load configuration from a JSON file, applying environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ApprovalError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(ApprovalError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.retry.backoff_coefficient < 1.0 {
            return Err(ApprovalError::Config(
                "retry.backoff_coefficient must be at least 1.0".to_string(),
            ));
        }

        if self.storage.root.is_empty() {
            return Err(ApprovalError::Config("storage.root is required".to_string()));
        }

        if let Some(reviewers) = &self.reviewers {
            if reviewers.stage_one.len() != 2 {
                return Err(ApprovalError::Config(format!(
                    "reviewers.stage_one must contain exactly two reviewers, got {}",
                    reviewers.stage_one.len()
                )));
            }

            let mut names = reviewers
                .stage_one
                .iter()
                .chain([&reviewers.stage_two, &reviewers.stage_three]);
            if names.any(|name| name.trim().is_empty()) {
                return Err(ApprovalError::Config(
                    "reviewer names are required".to_string(),
                ));
            }
        }

        if self.max_live_iterations == Some(0) {
            return Err(ApprovalError::Config(
                "max_live_iterations must be at least 1 when set".to_string(),
            ));
        }

        Ok(())
    }
}
