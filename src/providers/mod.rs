//! Provider module
//!
//! Defines the backend trait the failover client drives, and the Vertex AI implementation

pub mod vertex;

use crate::models::vertex::{GenerateContentRequest, GenerateContentResponse};
use crate::utils::error::BackendResult;
use async_trait::async_trait;

/// A backend bound to one project and region.
///
/// Binding is a plain value: nothing global is rebound, so concurrent calls
/// can hold bindings for different regions at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionBinding {
    pub project: String,
    pub region: String,
    /// Fully resolved endpoint for this region
    pub endpoint: String,
}

/// Generative backend driven by the failover client
///
/// Implementations must report throttling as `BackendError::ResourceExhausted`
/// so the client can tell it apart from other failures.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Bind to a region. Cheap and idempotent.
    fn bind(&self, project: &str, region: &str) -> BackendResult<RegionBinding>;

    /// Invoke the model through a binding
    async fn invoke(
        &self,
        binding: &RegionBinding,
        request: &GenerateContentRequest,
    ) -> BackendResult<GenerateContentResponse>;
}

pub use vertex::VertexBackend;
