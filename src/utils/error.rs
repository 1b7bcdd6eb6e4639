//! Error handling module
//!
//! Defines the caller-facing error type, the per-region backend errors and their classification

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Errors raised by a backend for a single region
#[derive(Error, Debug)]
pub enum BackendError {
    /// Backend signaled quota or rate exhaustion
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// HTTP transport error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response could not be interpreted
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    /// Classify this error for the region sweep
    pub fn classify(&self) -> ErrorClass {
        match self {
            BackendError::ResourceExhausted(_) => ErrorClass::Throttled,
            _ => ErrorClass::Transient,
        }
    }
}

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Resource exhaustion in one region; advance to the next region
    Throttled,
    /// Any other per-region failure; advance to the next region
    Transient,
    /// Raised before the sweep starts; never retried
    Fatal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Throttled => "throttled",
            ErrorClass::Transient => "transient",
            ErrorClass::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed region attempt. Lives only until the call returns.
#[derive(Debug)]
pub struct FailureRecord {
    pub region: String,
    pub class: ErrorClass,
    pub at: DateTime<Utc>,
    pub error: BackendError,
}

impl FailureRecord {
    pub fn new(region: impl Into<String>, error: BackendError) -> Self {
        Self {
            region: region.into(),
            class: error.classify(),
            at: Utc::now(),
            error,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request validation failed
    #[error("Request validation failed: {0}")]
    Validation(String),

    /// Every region failed in one sweep
    #[error("All regions failed. Last error: {last}")]
    AllRegionsExhausted {
        regions: usize,
        #[source]
        last: Box<FailureRecord>,
    },
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl StdError for FailureRecord {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

impl AppError {
    /// Only a fully exhausted sweep is worth another sweep
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::AllRegionsExhausted { .. })
    }

    /// Classification used when logging this error
    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::AllRegionsExhausted { last, .. } => last.class,
            AppError::Configuration(_) | AppError::Validation(_) => ErrorClass::Fatal,
        }
    }

    /// The last per-region failure, if any
    pub fn last_failure(&self) -> Option<&FailureRecord> {
        match self {
            AppError::AllRegionsExhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }

    pub fn all_regions_exhausted(regions: usize, last: FailureRecord) -> Self {
        AppError::AllRegionsExhausted {
            regions,
            last: Box::new(last),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Error handling helper functions
pub mod helpers {
    use super::*;

    /// Create configuration error
    pub fn config_error(message: impl Into<String>) -> AppError {
        AppError::Configuration(message.into())
    }

    /// Create validation error
    pub fn validation_error(message: impl Into<String>) -> AppError {
        AppError::Validation(message.into())
    }

    /// Create malformed response error
    pub fn malformed_response(message: impl Into<String>) -> BackendError {
        BackendError::MalformedResponse(message.into())
    }
}
