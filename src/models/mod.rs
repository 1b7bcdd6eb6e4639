//! Data models module
//!
//! Defines the generation request/result types and the Vertex AI wire format

use serde::{Deserialize, Serialize};

pub mod generation;
pub mod vertex;

pub use generation::{
    normalize_finish_reason, is_truncated_description, Attachment, FinishReason, GenerationOptions,
    GenerationOutput, GenerationRequest, GenerationResult, Prompt, SafetyAnnotation,
    COMPLETED_NORMALLY,
};

/// Usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt token count
    pub prompt_tokens: u32,
    /// Completion token count
    pub completion_tokens: u32,
    /// Total token count
    pub total_tokens: u32,
}
