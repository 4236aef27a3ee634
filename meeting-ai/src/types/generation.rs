//! Types for text-generation operations.

/// A single prompt completion request.
///
/// One request maps to one provider call and one resolution point; the
/// pipeline never shares a request across calls.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier understood by the provider (e.g. "gpt-4o-mini").
    pub model: String,
    /// System instructions framing the task.
    pub system_prompt: String,
    /// The user content to operate on (transcript chunk, combined summaries).
    pub user_prompt: String,
    /// Sampling temperature. Summarization uses low values for stable output.
    pub temperature: f32,
    /// Maximum tokens the provider may generate for this call.
    pub max_tokens: u32,
    /// Request a strict JSON object response where the provider supports a
    /// structured response mode.
    pub json_response: bool,
}

impl CompletionRequest {
    /// Builds a plain-text completion request with pipeline defaults.
    pub fn text(model: &str, system_prompt: String, user_prompt: String) -> Self {
        Self {
            model: model.to_string(),
            system_prompt,
            user_prompt,
            temperature: 0.3,
            max_tokens: 1500,
            json_response: false,
        }
    }

    /// Builds a JSON-mode completion request with pipeline defaults.
    pub fn json(model: &str, system_prompt: String, user_prompt: String) -> Self {
        Self {
            json_response: true,
            temperature: 0.2,
            max_tokens: 1000,
            ..Self::text(model, system_prompt, user_prompt)
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
