//! Transcription provider trait.

use crate::types::transcription::Transcription;
use crate::Error;
use async_trait::async_trait;
use std::path::Path;

/// Abstraction for speech-to-text transcription services.
///
/// Implementations upload a local audio file and return the normalized
/// transcription, including word-level speaker diarization when the provider
/// supports it. Supports ElevenLabs, AssemblyAI, Whisper. This trait enables
/// provider swapping for cost optimization and feature comparison.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Transcribe the audio file at `audio_path` in a single blocking call.
    ///
    /// The call may take minutes for large files; implementations set a
    /// generous request timeout rather than polling. Callers are responsible
    /// for splitting files that exceed the provider's upload limit.
    async fn transcribe_file(
        &self,
        audio_path: &Path,
    ) -> std::result::Result<Transcription, Error>;

    /// Return unique identifier for this provider (e.g., "elevenlabs").
    ///
    /// Used for log attribution and provider selection.
    /// Must be lowercase, alphanumeric with underscores only.
    fn provider_id(&self) -> &str;

    /// Validate API credentials by making a lightweight test request.
    ///
    /// Returns false if credentials are invalid, expired, or lack
    /// transcription permissions. A missing credential never reaches this
    /// point; clients are only constructed once a key is configured.
    async fn verify_credentials(&self) -> std::result::Result<bool, Error>;
}
