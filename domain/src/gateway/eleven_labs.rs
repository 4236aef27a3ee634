//! ElevenLabs API client for speech-to-text transcription.
//!
//! This module provides an HTTP client for the ElevenLabs speech-to-text API
//! ("Scribe"), uploading a local audio file and normalizing the response into
//! the provider-agnostic transcription types.

use async_trait::async_trait;
use log::*;
use meeting_ai::traits::transcription::Provider;
use meeting_ai::types::transcription::{Transcription, Word};
use meeting_ai::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Raw speech-to-text response as sent over the wire.
///
/// Field names have drifted across API revisions (`language` vs
/// `language_code`); aliases absorb the drift so the rest of the pipeline
/// only ever sees the normalized [`Transcription`].
#[derive(Debug, Deserialize)]
pub struct SpeechToTextResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "language")]
    pub language_code: Option<String>,
    #[serde(default)]
    pub words: Option<Vec<WireWord>>,
}

/// One word entry from the wire response. Times are fractional seconds.
#[derive(Debug, Deserialize)]
pub struct WireWord {
    pub text: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub speaker_id: Option<String>,
    /// "word", "spacing", or "audio_event"; only words carry transcript text.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Error body returned by the API on 4xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// ElevenLabs API client
pub struct ElevenLabsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model_id: String,
}

impl ElevenLabsClient {
    /// Create a new ElevenLabs client.
    ///
    /// `timeout_secs` bounds the whole transcription request; large audio
    /// uploads legitimately take minutes.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model_id: &str,
        timeout_secs: u64,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                warn!("Failed to build ElevenLabs HTTP client: {:?}", e);
                Error::Configuration("Failed to build HTTP client".to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: SecretString::new(api_key.to_string()),
            model_id: model_id.to_string(),
        })
    }

    /// Upload an audio file and return the raw speech-to-text response.
    pub async fn speech_to_text(&self, audio_path: &Path) -> Result<SpeechToTextResponse, Error> {
        let url = format!("{}/speech-to-text", self.base_url);

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let bytes = tokio::fs::read(audio_path).await.map_err(|e| {
            warn!("Failed to read audio file {:?}: {:?}", audio_path, e);
            Error::EmptyInput(format!("cannot read audio file: {}", e))
        })?;

        debug!(
            "Uploading {} bytes to ElevenLabs speech-to-text (model: {})",
            bytes.len(),
            self.model_id
        );

        // The API expects the parameter name "file", not "audio".
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("model_id", self.model_id.clone());

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("ElevenLabs transcription request failed: {:?}", e);
                Error::Network(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            let body: SpeechToTextResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse ElevenLabs response: {:?}", e);
                Error::Deserialization("Invalid response from ElevenLabs".to_string())
            })?;
            info!("ElevenLabs transcription completed");
            Ok(body)
        } else {
            let retry_after = retry_after_seconds(&response);
            let error_text = response.text().await.unwrap_or_default();
            error!("ElevenLabs API: {}", error_text);

            match status.as_u16() {
                401 | 403 => Err(Error::Authentication(detail_message(&error_text))),
                429 => Err(Error::RateLimited {
                    retry_after_seconds: retry_after.unwrap_or(30),
                }),
                _ => Err(Error::Provider(detail_message(&error_text))),
            }
        }
    }

    /// Verify the API key is valid by making a lightweight request.
    pub async fn verify_api_key(&self) -> Result<bool, Error> {
        let url = format!("{}/user", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to verify ElevenLabs API key: {:?}", e);
                Error::Network(e.to_string())
            })?;

        // 200 means a valid key; 401 means invalid.
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Provider for ElevenLabsClient {
    async fn transcribe_file(&self, audio_path: &Path) -> Result<Transcription, Error> {
        let response = self.speech_to_text(audio_path).await?;
        Ok(normalize_response(response))
    }

    fn provider_id(&self) -> &str {
        "elevenlabs"
    }

    async fn verify_credentials(&self) -> Result<bool, Error> {
        self.verify_api_key().await
    }
}

/// Extracts the Retry-After header as whole seconds, if present.
fn retry_after_seconds(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Pulls the human-readable "detail" field out of an API error body, falling
/// back to the raw body text.
fn detail_message(error_text: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(error_text)
        .ok()
        .and_then(|body| body.detail)
        .map(|detail| match detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| error_text.to_string())
}

/// Normalizes the wire response into the provider-agnostic transcription.
///
/// Word times convert from fractional seconds to integer milliseconds;
/// non-word entries ("spacing", "audio_event") are dropped. Missing speaker
/// labels stay `None` here - defaulting is the transcription client's rule.
fn normalize_response(response: SpeechToTextResponse) -> Transcription {
    let text = response.text.unwrap_or_default();

    let words = response
        .words
        .unwrap_or_default()
        .into_iter()
        .filter(|w| match &w.kind {
            Some(kind) => kind == "word",
            None => true,
        })
        .map(|w| Word {
            text: w.text,
            start_ms: (w.start.unwrap_or(0.0) * 1000.0).round() as i64,
            end_ms: (w.end.unwrap_or(0.0) * 1000.0).round() as i64,
            speaker_id: w.speaker_id,
        })
        .collect();

    let word_count = text.split_whitespace().count();

    Transcription {
        text,
        language_code: response.language_code,
        words,
        word_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_audio(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    fn client_for(server: &mockito::ServerGuard) -> ElevenLabsClient {
        ElevenLabsClient::new("xi_test_key", &server.url(), "scribe_v2", 30).unwrap()
    }

    #[tokio::test]
    async fn test_speech_to_text_normalizes_words_to_milliseconds() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/speech-to-text")
            .match_header("xi-api-key", "xi_test_key")
            .with_status(200)
            .with_body(
                r#"{
                    "text": "hello world",
                    "language_code": "en",
                    "words": [
                        {"text": "hello", "start": 0.0, "end": 0.5, "speaker_id": "0", "type": "word"},
                        {"text": " ", "start": 0.5, "end": 0.6, "type": "spacing"},
                        {"text": "world", "start": 0.6, "end": 1.1, "speaker_id": "0", "type": "word"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let audio = write_temp_audio(b"fake-webm-bytes");
        let client = client_for(&server);
        let result = client.transcribe_file(audio.path()).await.unwrap();

        assert_eq!(result.text, "hello world");
        assert_eq!(result.language_code.as_deref(), Some("en"));
        assert_eq!(result.word_count, 2);
        // Spacing entries are dropped, times are in milliseconds
        assert_eq!(result.words.len(), 2);
        assert_eq!(result.words[0].start_ms, 0);
        assert_eq!(result.words[0].end_ms, 500);
        assert_eq!(result.words[1].start_ms, 600);
        assert_eq!(result.words[1].speaker_id.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_legacy_language_field_is_accepted() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/speech-to-text")
            .with_status(200)
            .with_body(r#"{"text": "hola", "language": "es"}"#)
            .create_async()
            .await;

        let audio = write_temp_audio(b"fake");
        let client = client_for(&server);
        let result = client.transcribe_file(audio.path()).await.unwrap();

        assert_eq!(result.language_code.as_deref(), Some("es"));
        assert!(result.words.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/speech-to-text")
            .with_status(401)
            .with_body(r#"{"detail": "Invalid API key"}"#)
            .create_async()
            .await;

        let audio = write_temp_audio(b"fake");
        let client = client_for(&server);
        let err = client.transcribe_file(audio.path()).await.unwrap_err();

        match err {
            Error::Authentication(msg) => assert_eq!(msg, "Invalid API key"),
            other => panic!("expected Authentication, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_rate_limited_with_retry_after() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/speech-to-text")
            .with_status(429)
            .with_header("retry-after", "12")
            .with_body(r#"{"detail": "Too many requests"}"#)
            .create_async()
            .await;

        let audio = write_temp_audio(b"fake");
        let client = client_for(&server);
        let err = client.transcribe_file(audio.path()).await.unwrap_err();

        match err {
            Error::RateLimited {
                retry_after_seconds,
            } => assert_eq!(retry_after_seconds, 12),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_api_key() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/user")
            .match_header("xi-api-key", "xi_test_key")
            .with_status(200)
            .with_body(r#"{"subscription": {}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.verify_api_key().await.unwrap());
    }
}
