//! Vertex AI provider implementation
//!
//! Calls the regional `generateContent` REST endpoint

use super::{GenerativeBackend, RegionBinding};
use crate::config::settings::VertexConfig;
use crate::models::vertex::{GenerateContentRequest, GenerateContentResponse, GoogleErrorResponse};
use crate::utils::error::{BackendError, BackendResult};
use crate::utils::logging::{create_request_log_summary, truncate_content};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error};

/// Status string Google uses for quota exhaustion
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Longest slice of a response body carried inside an error
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Vertex AI backend
#[derive(Debug, Clone)]
pub struct VertexBackend {
    client: Client,
    model: String,
    base_url: Option<String>,
    access_token: Option<String>,
}

impl VertexBackend {
    /// Create a new Vertex backend with the default timeout
    pub fn new(model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(model, 60)
    }

    /// Create a new Vertex backend with a custom timeout
    pub fn with_timeout(model: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("vertex-failover/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            model: model.into(),
            base_url: None,
            access_token: None,
        })
    }

    /// Create a backend from settings
    pub fn from_config(config: &VertexConfig) -> Result<Self> {
        Ok(Self::with_timeout(config.model.clone(), config.timeout)?
            .base_url(config.base_url.clone())
            .access_token(config.access_token.clone()))
    }

    /// Override the endpoint base; `{region}` is substituted at bind time
    pub fn base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Build the regional endpoint URL
    fn build_url(&self, project: &str, region: &str) -> String {
        let base = match &self.base_url {
            Some(base) => base.replace("{region}", region),
            None => format!("https://{}-aiplatform.googleapis.com", region),
        };
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            base.trim_end_matches('/'),
            project,
            region,
            self.model
        )
    }

    /// A success status whose body is not a `generateContent` response
    fn malformed_body(error: &serde_json::Error, body: &str) -> BackendError {
        BackendError::MalformedResponse(format!("{}: {}", error, truncate_content(body, MAX_ERROR_BODY_CHARS)))
    }

    /// Turn a non-success response into a backend error
    fn error_from_body(status: StatusCode, body: &str) -> BackendError {
        let parsed = serde_json::from_str::<GoogleErrorResponse>(body).ok();
        let message = parsed
            .as_ref()
            .map(|e| e.error.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| truncate_content(body, MAX_ERROR_BODY_CHARS));
        let exhausted = status == StatusCode::TOO_MANY_REQUESTS
            || parsed
                .as_ref()
                .and_then(|e| e.error.status.as_deref())
                .map(|s| s == RESOURCE_EXHAUSTED)
                .unwrap_or(false);

        if exhausted {
            BackendError::ResourceExhausted(message)
        } else {
            BackendError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl GenerativeBackend for VertexBackend {
    fn name(&self) -> &str {
        "vertex"
    }

    fn bind(&self, project: &str, region: &str) -> BackendResult<RegionBinding> {
        Ok(RegionBinding {
            project: project.to_string(),
            region: region.to_string(),
            endpoint: self.build_url(project, region),
        })
    }

    async fn invoke(
        &self,
        binding: &RegionBinding,
        request: &GenerateContentRequest,
    ) -> BackendResult<GenerateContentResponse> {
        debug!(
            region = %binding.region,
            request = %create_request_log_summary(request),
            "Sending Vertex generateContent request"
        );

        let mut builder = self
            .client
            .post(&binding.endpoint)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let parsed: GenerateContentResponse = serde_json::from_str(&body)
                .map_err(|e| Self::malformed_body(&e, &body))?;
            debug!(region = %binding.region, "Vertex request completed successfully");
            Ok(parsed)
        } else {
            error!("Vertex API request failed in {}: {} - {}", binding.region, status, body);
            Err(Self::error_from_body(status, &body))
        }
    }
}
