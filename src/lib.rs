//! Vertex Failover Library
//!
//! Generation client for Vertex AI Gemini with ordered region failover,
//! bounded whole-sweep retry and normalized results

pub mod config;
pub mod models;
pub mod providers;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::{ClientFile, Settings};
pub use models::{
    Attachment, FinishReason, GenerationOptions, GenerationOutput, GenerationRequest,
    GenerationResult, Prompt,
};
pub use providers::{GenerativeBackend, RegionBinding, VertexBackend};
pub use services::{RegionFailoverClient, RetryPolicy};
pub use utils::error::{AppError, AppResult, BackendError, ErrorClass};
pub use utils::logging::{ActivitySink, TracingSink};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
