//! Region failover client
//!
//! Sends a prompt to the generative backend, walking an ordered region list
//! until one region answers, and re-sweeping with backoff when all of them fail

use super::retry::RetryPolicy;
use crate::config::{ClientFile, Settings};
use crate::models::vertex::{Content, GenerateContentRequest, InlineData, Part, SafetySetting};
use crate::models::{GenerationOptions, GenerationOutput, GenerationRequest, GenerationResult};
use crate::providers::{GenerativeBackend, VertexBackend};
use crate::utils::error::{helpers, AppError, AppResult, BackendResult, FailureRecord};
use crate::utils::logging::{ActivitySink, TracingSink};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Environment variable consulted when no project id is passed explicitly
pub const PROJECT_ENV_VAR: &str = "GCP_PROJECT";

/// Harm categories covered by the safety configuration
pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
];

/// Safety configuration that disables blocking in every category.
///
/// Reviews containing profanity or toxicity still have to be analyzed.
pub fn permissive_safety_settings() -> Vec<SafetySetting> {
    HARM_CATEGORIES
        .iter()
        .map(|category| SafetySetting {
            category: category.to_string(),
            threshold: "BLOCK_NONE".to_string(),
        })
        .collect()
}

/// Resolve the project id from the argument, then the environment
pub fn resolve_project_id(explicit: Option<String>) -> AppResult<String> {
    explicit
        .filter(|p| !p.trim().is_empty())
        .or_else(|| std::env::var(PROJECT_ENV_VAR).ok().filter(|p| !p.trim().is_empty()))
        .ok_or_else(|| {
            helpers::config_error(format!(
                "Project ID must be provided or set in {} environment variable",
                PROJECT_ENV_VAR
            ))
        })
}

/// A backend location and its position in the fallback order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEndpoint {
    pub name: String,
    pub rank: usize,
}

/// Builder for [`RegionFailoverClient`]
pub struct ClientBuilder {
    backend: Arc<dyn GenerativeBackend>,
    project_id: Option<String>,
    regions: Vec<String>,
    defaults: GenerationOptions,
    sink: Arc<dyn ActivitySink>,
    retry: RetryPolicy,
}

impl ClientBuilder {
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_options(mut self, defaults: GenerationOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Finish construction. Fails before any network activity when the
    /// project id is missing or no region is configured.
    pub fn build(self) -> AppResult<RegionFailoverClient> {
        let project_id = resolve_project_id(self.project_id)?;

        let regions: Vec<RegionEndpoint> = self
            .regions
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .enumerate()
            .map(|(rank, name)| RegionEndpoint { name, rank })
            .collect();
        if regions.is_empty() {
            return Err(helpers::config_error("At least one region must be configured"));
        }

        info!(
            "Region failover client ready: project={}, backend={}, {} regions",
            project_id,
            self.backend.name(),
            regions.len()
        );

        Ok(RegionFailoverClient {
            project_id,
            regions: regions.into(),
            defaults: self.defaults,
            safety_settings: permissive_safety_settings().into(),
            backend: self.backend,
            sink: self.sink,
            retry: self.retry,
        })
    }
}

/// Generation client with ordered region failover and whole-sweep retry.
///
/// Cheap to clone; clones share the backend and sink. Nothing is mutated per call.
#[derive(Clone)]
pub struct RegionFailoverClient {
    project_id: String,
    regions: Arc<[RegionEndpoint]>,
    defaults: GenerationOptions,
    safety_settings: Arc<[SafetySetting]>,
    backend: Arc<dyn GenerativeBackend>,
    sink: Arc<dyn ActivitySink>,
    retry: RetryPolicy,
}

impl fmt::Debug for RegionFailoverClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionFailoverClient")
            .field("project_id", &self.project_id)
            .field("backend", &self.backend.name())
            .field("regions", &self.regions)
            .field("defaults", &self.defaults)
            .field("retry", &self.retry)
            .finish()
    }
}

impl RegionFailoverClient {
    /// Start building a client around a backend. Regions default to
    /// [`crate::config::DEFAULT_REGIONS`].
    pub fn builder(backend: Arc<dyn GenerativeBackend>) -> ClientBuilder {
        ClientBuilder {
            backend,
            project_id: None,
            regions: crate::config::DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            defaults: GenerationOptions::defaults(),
            sink: Arc::new(TracingSink),
            retry: RetryPolicy::default(),
        }
    }

    /// Create a client with default regions, options and retry policy
    pub fn new(
        project_id: Option<String>,
        backend: Arc<dyn GenerativeBackend>,
        sink: Option<Arc<dyn ActivitySink>>,
    ) -> AppResult<Self> {
        let mut builder = Self::builder(backend);
        builder.project_id = project_id;
        if let Some(sink) = sink {
            builder = builder.sink(sink);
        }
        builder.build()
    }

    /// Create a Vertex-backed client from settings and an optional client file
    pub fn from_settings(settings: &Settings, file: Option<&ClientFile>) -> AppResult<Self> {
        let mut settings = settings.clone();
        if let Some(file) = file {
            file.apply_to(&mut settings);
        }

        let backend = VertexBackend::from_config(&settings.vertex)
            .map_err(|e| helpers::config_error(format!("{:#}", e)))?;
        let defaults = file
            .map(ClientFile::generation_defaults)
            .unwrap_or_else(GenerationOptions::defaults);

        let mut builder = Self::builder(Arc::new(backend))
            .regions(settings.vertex.regions.clone())
            .default_options(defaults)
            .retry_policy(settings.retry_policy());
        builder.project_id = settings.vertex.project_id.clone();
        builder.build()
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn regions(&self) -> &[RegionEndpoint] {
        &self.regions
    }

    pub fn default_options(&self) -> &GenerationOptions {
        &self.defaults
    }

    pub fn safety_settings(&self) -> &[SafetySetting] {
        &self.safety_settings
    }

    /// Generate a response for `request`.
    ///
    /// Regions are tried strictly in order; the first success wins. When every
    /// region fails the sweep is retried per the retry policy, and the final
    /// error names the last region's failure as its cause.
    pub async fn generate(&self, request: &GenerationRequest) -> AppResult<GenerationOutput> {
        let started = Instant::now();

        if let Err(e) = validate_request(request) {
            self.sink.log_error(
                "Rejected generation request",
                Some(&e),
                Some(&serde_json::json!({ "class": e.class().as_str() })),
            );
            return Err(e);
        }

        let payload = self.build_payload(request);
        let outcome = self.retry.run(|attempt| self.sweep(&payload, attempt)).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(result) => {
                self.sink.log_api_call(
                    "generate",
                    &serde_json::json!({
                        "project": self.project_id,
                        "region": result.region,
                        "finish_reason": result.finish_reason,
                        "total_tokens": result.usage.total_tokens,
                    }),
                    Some("success"),
                    Some(duration_ms),
                );
                if result.is_truncated() {
                    warn!("Response from {} may be incomplete: {}", result.region, result.finish_reason);
                }

                if request.return_full_response {
                    Ok(GenerationOutput::Full(result))
                } else {
                    Ok(GenerationOutput::Text(result.text))
                }
            }
            Err(e) => {
                self.sink.log_error(
                    "Generation failed",
                    Some(&e),
                    Some(&serde_json::json!({
                        "project": self.project_id,
                        "class": e.class().as_str(),
                        "last_region": e.last_failure().map(|f| f.region.clone()),
                        "duration_ms": duration_ms,
                    })),
                );
                Err(e)
            }
        }
    }

    /// Plain-text generation with default options
    pub async fn generate_text(&self, prompt: impl Into<String>) -> AppResult<String> {
        let output = self.generate(&GenerationRequest::text(prompt)).await?;
        Ok(output.text().to_string())
    }

    /// Build the provider payload: merged options, attachment first, fixed safety settings
    pub fn build_payload(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let options = request.effective_options(&self.defaults);

        let mut parts = Vec::with_capacity(2);
        if let Some(attachment) = request.prompt.attachment() {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: attachment.mime_type.clone(),
                    data: BASE64_STANDARD.encode(&attachment.data),
                },
            });
        }
        parts.push(Part::Text {
            text: request.prompt.text().to_string(),
        });

        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: Some(options.to_generation_config()),
            safety_settings: self.safety_settings.to_vec(),
        }
    }

    /// One pass over every region in order
    async fn sweep(&self, payload: &GenerateContentRequest, attempt: u32) -> AppResult<GenerationResult> {
        let mut last_failure: Option<FailureRecord> = None;

        for region in self.regions.iter() {
            let started = Instant::now();
            let outcome = self.try_region(region, payload).await;
            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            let params = serde_json::json!({
                "project": self.project_id,
                "region": region.name,
                "rank": region.rank,
                "attempt": attempt,
            });

            match outcome {
                Ok(result) => {
                    debug!("Region {} answered on attempt {}", region.name, attempt);
                    self.sink
                        .log_api_call("generate_content", &params, Some("success"), Some(duration_ms));
                    return Ok(result);
                }
                Err(error) => {
                    let record = FailureRecord::new(region.name.clone(), error);
                    warn!(
                        region = %record.region,
                        class = %record.class,
                        "Region {} failed ({}): {}. Trying next region...",
                        record.region,
                        record.class,
                        record.error
                    );
                    self.sink
                        .log_api_call("generate_content", &params, Some(record.class.as_str()), Some(duration_ms));
                    last_failure = Some(record);
                }
            }
        }

        match last_failure {
            Some(last) => Err(AppError::all_regions_exhausted(self.regions.len(), last)),
            None => Err(helpers::config_error("At least one region must be configured")),
        }
    }

    async fn try_region(
        &self,
        region: &RegionEndpoint,
        payload: &GenerateContentRequest,
    ) -> BackendResult<GenerationResult> {
        let binding = self.backend.bind(&self.project_id, &region.name)?;
        let response = self.backend.invoke(&binding, payload).await?;
        GenerationResult::from_response(&response, &region.name)
            .ok_or_else(|| helpers::malformed_response("response contained no candidate text"))
    }
}

/// Reject requests the backend could never answer
fn validate_request(request: &GenerationRequest) -> AppResult<()> {
    if request.prompt.text().trim().is_empty() {
        return Err(helpers::validation_error("Prompt cannot be empty"));
    }

    if let Some(attachment) = request.prompt.attachment() {
        if attachment.data.is_empty() {
            return Err(helpers::validation_error("Attachment cannot be empty"));
        }
        if attachment.mime_type.trim().is_empty() {
            return Err(helpers::validation_error("Attachment MIME type cannot be empty"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::vertex::GenerateContentResponse;
    use crate::models::Attachment;
    use crate::providers::RegionBinding;
    use async_trait::async_trait;

    struct NeverCalled;

    #[async_trait]
    impl GenerativeBackend for NeverCalled {
        fn name(&self) -> &str {
            "never"
        }

        fn bind(&self, _project: &str, _region: &str) -> BackendResult<RegionBinding> {
            panic!("bind must not be called");
        }

        async fn invoke(
            &self,
            _binding: &RegionBinding,
            _request: &GenerateContentRequest,
        ) -> BackendResult<GenerateContentResponse> {
            panic!("invoke must not be called");
        }
    }

    fn test_client() -> RegionFailoverClient {
        RegionFailoverClient::builder(Arc::new(NeverCalled))
            .project_id("test-proj")
            .build()
            .unwrap()
    }

    #[test]
    fn test_permissive_safety_settings() {
        let settings = permissive_safety_settings();
        assert_eq!(settings.len(), 4);
        assert!(settings.iter().all(|s| s.threshold == "BLOCK_NONE"));
    }

    #[test]
    fn test_default_region_order() {
        let client = test_client();
        assert!(client.regions().len() >= 5);
        assert_eq!(client.regions()[0].name, "us-east5");
        assert!(client.regions().iter().enumerate().all(|(i, r)| r.rank == i));
    }

    #[test]
    fn test_blank_regions_are_rejected() {
        let result = RegionFailoverClient::builder(Arc::new(NeverCalled))
            .project_id("test-proj")
            .regions(vec![" ", ""])
            .build();
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_payload_places_attachment_first() {
        let client = test_client();
        let request = GenerationRequest::with_attachment(Attachment::jpeg(vec![1, 2, 3]), "describe this");
        let payload = client.build_payload(&request);

        let parts = &payload.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], Part::InlineData { inline_data } if inline_data.mime_type == "image/jpeg" && inline_data.data == "AQID"));
        assert!(matches!(&parts[1], Part::Text { text } if text == "describe this"));
        assert_eq!(payload.safety_settings.len(), 4);
    }

    #[test]
    fn test_payload_merges_options() {
        let client = test_client();
        let request = GenerationRequest::text("hello")
            .options(GenerationOptions {
                max_output_tokens: Some(256),
                ..Default::default()
            })
            .response_mime_type("application/json");

        let config = client.build_payload(&request).generation_config.unwrap();
        assert_eq!(config.max_output_tokens, Some(256));
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.top_p, Some(0.95));
        assert_eq!(config.response_mime_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected_before_any_region() {
        let client = test_client();
        let result = client.generate(&GenerationRequest::text("   ")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let request = GenerationRequest::with_attachment(Attachment::jpeg(Vec::new()), "describe");
        let result = client.generate(&request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
