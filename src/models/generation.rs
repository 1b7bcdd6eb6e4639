//! Generation request and result types
//!
//! Provider-independent values passed into and returned from the failover client

use super::vertex::{Candidate, GenerateContentResponse, GenerationConfig, SafetyRating};
use super::TokenUsage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Finish description that marks a complete answer
pub const COMPLETED_NORMALLY: &str = "completed normally";

/// Binary attachment sent inline alongside the prompt text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Raw bytes are treated as a JPEG image
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self::new("image/jpeg", data)
    }
}

/// Prompt content: plain text, or exactly one attachment followed by text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Text(String),
    WithAttachment { attachment: Attachment, text: String },
}

impl Prompt {
    pub fn text(&self) -> &str {
        match self {
            Prompt::Text(text) => text,
            Prompt::WithAttachment { text, .. } => text,
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        match self {
            Prompt::Text(_) => None,
            Prompt::WithAttachment { attachment, .. } => Some(attachment),
        }
    }
}

/// Generation options; unset fields fall back to the client defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(rename = "maxOutputTokens", default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(rename = "topP", default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(rename = "responseMimeType", default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Passed through to the provider untouched
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl GenerationOptions {
    /// Bounded output, moderate temperature, high nucleus threshold
    pub fn defaults() -> Self {
        Self {
            max_output_tokens: Some(8192),
            temperature: Some(0.3),
            top_p: Some(0.95),
            response_mime_type: None,
            extra: Map::new(),
        }
    }

    /// Layer `self` over `base`, returning a new bundle
    pub fn merge_over(&self, base: &GenerationOptions) -> GenerationOptions {
        let top = self.lift_typed_keys();
        let base = base.lift_typed_keys();

        let mut extra = base.extra.clone();
        for (key, value) in &top.extra {
            extra.insert(key.clone(), value.clone());
        }

        GenerationOptions {
            max_output_tokens: top.max_output_tokens.or(base.max_output_tokens),
            temperature: top.temperature.or(base.temperature),
            top_p: top.top_p.or(base.top_p),
            response_mime_type: top.response_mime_type.or(base.response_mime_type),
            extra,
        }
    }

    /// Move passthrough keys that name a typed field into that field.
    ///
    /// A typed value set on the same bundle wins; the passthrough copy is dropped
    /// either way so the wire config never carries a key twice.
    pub fn lift_typed_keys(&self) -> GenerationOptions {
        let mut lifted = self.clone();

        if let Some(value) = lifted.extra.remove("maxOutputTokens") {
            if lifted.max_output_tokens.is_none() {
                lifted.max_output_tokens = serde_json::from_value(value).ok();
            }
        }
        if let Some(value) = lifted.extra.remove("temperature") {
            if lifted.temperature.is_none() {
                lifted.temperature = serde_json::from_value(value).ok();
            }
        }
        if let Some(value) = lifted.extra.remove("topP") {
            if lifted.top_p.is_none() {
                lifted.top_p = serde_json::from_value(value).ok();
            }
        }
        if let Some(value) = lifted.extra.remove("responseMimeType") {
            if lifted.response_mime_type.is_none() {
                lifted.response_mime_type = serde_json::from_value(value).ok();
            }
        }

        lifted
    }

    pub fn to_generation_config(&self) -> GenerationConfig {
        let options = self.lift_typed_keys();
        GenerationConfig {
            temperature: options.temperature,
            top_p: options.top_p,
            max_output_tokens: options.max_output_tokens,
            response_mime_type: options.response_mime_type,
            extra: options.extra,
        }
    }
}

/// A single logical generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: Prompt,
    pub options: Option<GenerationOptions>,
    pub response_mime_type: Option<String>,
    pub return_full_response: bool,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Prompt::Text(prompt.into()),
            options: None,
            response_mime_type: None,
            return_full_response: false,
        }
    }

    pub fn with_attachment(attachment: Attachment, prompt: impl Into<String>) -> Self {
        Self {
            prompt: Prompt::WithAttachment {
                attachment,
                text: prompt.into(),
            },
            options: None,
            response_mime_type: None,
            return_full_response: false,
        }
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn response_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.response_mime_type = Some(mime_type.into());
        self
    }

    pub fn full_response(mut self) -> Self {
        self.return_full_response = true;
        self
    }

    /// Caller options merged over `defaults`, with the forced MIME type applied last
    pub fn effective_options(&self, defaults: &GenerationOptions) -> GenerationOptions {
        let mut merged = match &self.options {
            Some(options) => options.merge_over(defaults),
            None => defaults.clone(),
        };
        if let Some(mime_type) = &self.response_mime_type {
            merged.response_mime_type = Some(mime_type.clone());
        }
        merged
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FinishReason {
    Unspecified,
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
    Blocklist,
    ProhibitedContent,
    Spii,
    MalformedFunctionCall,
    /// A code this client does not know yet; kept verbatim
    Unknown(String),
}

impl FinishReason {
    /// Every code in the static table
    pub const KNOWN: [FinishReason; 10] = [
        FinishReason::Unspecified,
        FinishReason::Stop,
        FinishReason::MaxTokens,
        FinishReason::Safety,
        FinishReason::Recitation,
        FinishReason::Other,
        FinishReason::Blocklist,
        FinishReason::ProhibitedContent,
        FinishReason::Spii,
        FinishReason::MalformedFunctionCall,
    ];

    pub fn from_code(code: &str) -> Self {
        match code {
            "FINISH_REASON_UNSPECIFIED" => FinishReason::Unspecified,
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            "OTHER" => FinishReason::Other,
            "BLOCKLIST" => FinishReason::Blocklist,
            "PROHIBITED_CONTENT" => FinishReason::ProhibitedContent,
            "SPII" => FinishReason::Spii,
            "MALFORMED_FUNCTION_CALL" => FinishReason::MalformedFunctionCall,
            other => FinishReason::Unknown(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            FinishReason::Unspecified => "FINISH_REASON_UNSPECIFIED",
            FinishReason::Stop => "STOP",
            FinishReason::MaxTokens => "MAX_TOKENS",
            FinishReason::Safety => "SAFETY",
            FinishReason::Recitation => "RECITATION",
            FinishReason::Other => "OTHER",
            FinishReason::Blocklist => "BLOCKLIST",
            FinishReason::ProhibitedContent => "PROHIBITED_CONTENT",
            FinishReason::Spii => "SPII",
            FinishReason::MalformedFunctionCall => "MALFORMED_FUNCTION_CALL",
            FinishReason::Unknown(raw) => raw,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            FinishReason::Unspecified => "unspecified",
            FinishReason::Stop => COMPLETED_NORMALLY,
            FinishReason::MaxTokens => "token limit reached",
            FinishReason::Safety => "blocked by safety filters",
            FinishReason::Recitation => "recitation detected",
            FinishReason::Other => "other reason",
            FinishReason::Blocklist => "blocklist term matched",
            FinishReason::ProhibitedContent => "prohibited content",
            FinishReason::Spii => "sensitive personal information detected",
            FinishReason::MalformedFunctionCall => "malformed structured output",
            FinishReason::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Map a raw provider code to its description; a missing or blank code is "unspecified"
pub fn normalize_finish_reason(code: Option<&str>) -> String {
    match code.map(str::trim) {
        Some(code) if !code.is_empty() => FinishReason::from_code(code).description().to_string(),
        _ => FinishReason::Unspecified.description().to_string(),
    }
}

/// True unless the description says the model completed normally
pub fn is_truncated_description(description: &str) -> bool {
    !description.to_lowercase().contains(COMPLETED_NORMALLY)
}

/// Safety classifier verdict for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyAnnotation {
    pub category: String,
    pub probability: Option<String>,
    pub blocked: bool,
}

impl From<&SafetyRating> for SafetyAnnotation {
    fn from(rating: &SafetyRating) -> Self {
        Self {
            category: rating.category.clone(),
            probability: rating.probability.clone(),
            blocked: rating.blocked,
        }
    }
}

/// Normalized output of a successful call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    /// Human-readable finish description, never empty
    pub finish_reason: String,
    pub finish_code: Option<String>,
    pub finish_message: Option<String>,
    pub usage: TokenUsage,
    pub safety: Vec<SafetyAnnotation>,
    /// Region that served the call
    pub region: String,
    pub model_version: Option<String>,
}

impl GenerationResult {
    /// Build a result from the first candidate of a provider response.
    ///
    /// Returns `None` when there is no candidate or the candidate carries no text.
    pub fn from_response(response: &GenerateContentResponse, region: &str) -> Option<Self> {
        let candidate: &Candidate = response.candidates.first()?;
        let text = candidate.text()?;

        let usage = response
            .usage_metadata
            .as_ref()
            .map(|u| {
                let prompt_tokens = u.prompt_token_count.unwrap_or(0);
                let completion_tokens = u.candidates_token_count.unwrap_or(0);
                TokenUsage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: u
                        .total_token_count
                        .unwrap_or_else(|| prompt_tokens.saturating_add(completion_tokens)),
                }
            })
            .unwrap_or_default();

        Some(Self {
            text,
            finish_reason: normalize_finish_reason(candidate.finish_reason.as_deref()),
            finish_code: candidate.finish_reason.clone(),
            finish_message: candidate.finish_message.clone(),
            usage,
            safety: candidate.safety_ratings.iter().map(SafetyAnnotation::from).collect(),
            region: region.to_string(),
            model_version: response.model_version.clone(),
        })
    }

    pub fn is_truncated(&self) -> bool {
        is_truncated_description(&self.finish_reason)
    }
}

/// Text-only or full structured output, selected by `return_full_response`
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutput {
    Text(String),
    Full(GenerationResult),
}

impl GenerationOutput {
    pub fn text(&self) -> &str {
        match self {
            GenerationOutput::Text(text) => text,
            GenerationOutput::Full(result) => &result.text,
        }
    }

    pub fn into_result(self) -> Option<GenerationResult> {
        match self {
            GenerationOutput::Text(_) => None,
            GenerationOutput::Full(result) => Some(result),
        }
    }
}
