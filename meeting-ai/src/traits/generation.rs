//! Text-generation provider trait.

use crate::types::generation::CompletionRequest;
use crate::Error;
use async_trait::async_trait;

/// Abstraction for LLM text-generation services.
///
/// Implementations run one prompt completion per call. Supports OpenAI,
/// Anthropic, Gemini. The pipeline uses this trait for map-stage chunk
/// summaries, the reduce-stage consolidation, and structured action-item
/// extraction (via the request's JSON response mode).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a completion for the request and return the raw response text.
    ///
    /// When `request.json_response` is set, implementations ask the provider
    /// for a strict JSON object; callers still parse and validate the result.
    /// Rate-limit conditions surface as [`Error::RateLimited`] so callers can
    /// apply their own backoff policy per call.
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<String, Error>;

    /// Return unique identifier for this provider (e.g., "openai").
    ///
    /// Used for log attribution and provider selection.
    /// Must be lowercase, alphanumeric with underscores only.
    fn provider_id(&self) -> &str;

    /// Validate API credentials by making a lightweight test request.
    ///
    /// Returns false if credentials are invalid, expired, or lack generation
    /// permissions.
    async fn verify_credentials(&self) -> std::result::Result<bool, Error>;
}
