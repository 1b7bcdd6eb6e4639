//! Logging utilities
//!
//! Activity sink interface used by the client, plus helpers that keep log output short and free of secrets

use crate::models::vertex::{GenerateContentRequest, Part};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use tracing::{error, info};

/// Set to true to include full request payloads in debug logs
/// Default is false to reduce log verbosity
pub const VERBOSE_REQUEST_LOGGING: bool = false;

/// Parameter names containing any of these are dropped before logging
const SENSITIVE_MARKERS: [&str; 4] = ["key", "token", "secret", "password"];

/// Structured observability sink.
///
/// The client calls these once per attempted region and once per terminal
/// outcome. Implementations own their storage; the client never reads back.
pub trait ActivitySink: Send + Sync {
    /// Record an outbound API call
    fn log_api_call(&self, api_name: &str, params: &Value, status: Option<&str>, duration_ms: Option<f64>);

    /// Record an error with optional cause and context
    fn log_error(&self, message: &str, error: Option<&(dyn StdError + 'static)>, context: Option<&Value>);
}

/// Sink that forwards activity to `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl ActivitySink for TracingSink {
    fn log_api_call(&self, api_name: &str, params: &Value, status: Option<&str>, duration_ms: Option<f64>) {
        let params = filter_sensitive_params(params);
        info!(
            api_name = %api_name,
            status = %status.unwrap_or("unknown"),
            duration_ms = duration_ms.unwrap_or(0.0),
            params = %params,
            "API CALL: {}", api_name
        );
    }

    fn log_error(&self, message: &str, error: Option<&(dyn StdError + 'static)>, context: Option<&Value>) {
        let context = context.map(filter_sensitive_params).unwrap_or(Value::Null);
        match error {
            Some(e) => error!(error = %e, context = %context, "ERROR: {}", message),
            None => error!(context = %context, "ERROR: {}", message),
        }
    }
}

/// Drop object keys that look like credentials, recursively
pub fn filter_sensitive_params(params: &Value) -> Value {
    match params {
        Value::Object(map) => {
            let filtered: Map<String, Value> = map
                .iter()
                .filter(|(k, _)| {
                    let lower = k.to_lowercase();
                    !SENSITIVE_MARKERS.iter().any(|marker| lower.contains(marker))
                })
                .map(|(k, v)| (k.clone(), filter_sensitive_params(v)))
                .collect();
            Value::Object(filtered)
        }
        Value::Array(items) => Value::Array(items.iter().map(filter_sensitive_params).collect()),
        other => other.clone(),
    }
}

/// Truncate a string with a note about original length
pub fn truncate_content(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let head: String = s.chars().take(max_len).collect();
        format!("{}... ({} chars truncated)", head, s.chars().count() - max_len)
    } else {
        s.to_string()
    }
}

/// Create a filtered summary of a `generateContent` request for logging
pub fn create_request_log_summary(request: &GenerateContentRequest) -> Value {
    if VERBOSE_REQUEST_LOGGING {
        return serde_json::to_value(request).unwrap_or(serde_json::json!({"error": "serialize failed"}));
    }

    let parts: Vec<Value> = request
        .contents
        .iter()
        .flat_map(|content| content.parts.iter())
        .map(|part| match part {
            Part::Text { text } => Value::String(truncate_content(text, 200)),
            Part::InlineData { inline_data } => serde_json::json!({
                "inline_data": inline_data.mime_type,
                "bytes_b64": inline_data.data.len(),
            }),
        })
        .collect();

    serde_json::json!({
        "parts": parts,
        "generation_config": request.generation_config,
        "safety_settings": request.safety_settings.len(),
    })
}
