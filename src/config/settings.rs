//! Application configuration settings
//!
//! Environment-driven settings for the Vertex AI client and its logging

use crate::services::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deployment locations tried in order when no override is configured
pub const DEFAULT_REGIONS: [&str; 8] = [
    "us-east5",
    "northamerica-northeast1",
    "europe-west2",
    "europe-west3",
    "asia-northeast1",
    "asia-south1",
    "southamerica-east1",
    "australia-southeast1",
];

/// Model used when `VERTEX_MODEL` is not set
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-002";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vertex AI configuration
    pub vertex: VertexConfig,
    /// Retry configuration
    pub retry: RetrySettings,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Which Vertex values came from the environment
    #[serde(skip)]
    pub explicit: ExplicitVertexEnv,
}

/// Vertex values set in the environment; a client file never overrides these
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplicitVertexEnv {
    pub model: bool,
    pub base_url: bool,
    pub regions: bool,
}

/// Vertex AI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexConfig {
    /// Project identifier; may be absent here and supplied to the client directly
    pub project_id: Option<String>,
    /// OAuth access token (optional)
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Publisher model name
    pub model: String,
    /// Endpoint base; `{region}` is replaced with the bound region
    pub base_url: Option<String>,
    /// Regions in fallback order
    pub regions: Vec<String>,
    /// Request timeout in seconds
    pub timeout: u64,
}

/// Outer whole-sweep retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total sweeps, including the first
    pub max_attempts: u32,
    /// Base delay in milliseconds
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Settings {
    /// Create a new configuration instance
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let explicit = ExplicitVertexEnv {
            model: get_env_opt("VERTEX_MODEL").is_some(),
            base_url: get_env_opt("VERTEX_BASE_URL").is_some(),
            regions: get_env_opt("VERTEX_REGIONS").is_some(),
        };

        let settings = Self {
            vertex: VertexConfig {
                project_id: get_env_opt("GCP_PROJECT"),
                access_token: get_env_opt("GCP_ACCESS_TOKEN"),
                model: get_env_or_default("VERTEX_MODEL", DEFAULT_MODEL),
                base_url: get_env_opt("VERTEX_BASE_URL"),
                regions: match get_env_opt("VERTEX_REGIONS") {
                    Some(list) => parse_region_list(&list),
                    None => DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
                },
                timeout: get_env_or_default("REQUEST_TIMEOUT", "60")
                    .parse()
                    .context("Invalid request timeout")?,
            },
            retry: RetrySettings {
                max_attempts: get_env_or_default("RETRY_MAX_ATTEMPTS", "3")
                    .parse()
                    .context("Invalid retry attempt count")?,
                base_delay_ms: get_env_or_default("RETRY_BASE_DELAY_MS", "2000")
                    .parse()
                    .context("Invalid retry base delay")?,
                max_delay_ms: get_env_or_default("RETRY_MAX_DELAY_MS", "10000")
                    .parse()
                    .context("Invalid retry max delay")?,
            },
            logging: LoggingConfig {
                level: get_env_or_default("RUST_LOG", "info"),
                format: get_env_or_default("LOG_FORMAT", "text"),
            },
            explicit,
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        if self.vertex.model.trim().is_empty() {
            anyhow::bail!("Vertex model name cannot be empty");
        }

        if self.vertex.regions.is_empty() {
            anyhow::bail!("At least one region must be configured");
        }

        if let Some(base_url) = &self.vertex.base_url {
            if !base_url.starts_with("http") {
                anyhow::bail!("Invalid Vertex base URL format, should start with 'http'");
            }
        }

        if self.vertex.timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("Retry attempts cannot be 0");
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            anyhow::bail!("Retry base delay cannot exceed the maximum delay");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Retry policy described by these settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vertex: VertexConfig {
                project_id: None,
                access_token: None,
                model: DEFAULT_MODEL.to_string(),
                base_url: None,
                regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
                timeout: 60,
            },
            retry: RetrySettings {
                max_attempts: 3,
                base_delay_ms: 2000,
                max_delay_ms: 10000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
            explicit: ExplicitVertexEnv::default(),
        }
    }
}

/// Split a comma separated region list, dropping blanks
pub fn parse_region_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Get environment variable or default value
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a non-blank environment variable
fn get_env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
