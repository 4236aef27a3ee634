//! Retrying transcription client.
//!
//! Wraps a speech-to-text provider with the pipeline's retry policy, splits
//! oversized files through the [`AudioSegmenter`], merges per-chunk results
//! into one monotonic word stream, and groups diarized words into speaker
//! segments.

use crate::audio::{AudioChunk, AudioSegmenter};
use crate::error::Error;
use log::*;
use meeting_ai::traits::transcription::Provider;
use meeting_ai::types::transcription::Transcription;
use meeting_ai::Error as ProviderError;
use meeting_ai::{SpeakerSegment, Word};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Explicit backoff schedule for transcription attempts.
///
/// The schedule is a plain list of delays so the retry policy is testable
/// independent of any mutable attempt counter. A schedule of N delays allows
/// N+1 total attempts; the last delay is only slept when a further attempt
/// remains.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl RetrySchedule {
    /// Builds a doubling schedule: `base, base*2, base*4, ...` with
    /// `attempts - 1` entries, allowing `attempts` total attempts.
    pub fn exponential(attempts: usize, base: Duration) -> Self {
        let delays = (0..attempts.saturating_sub(1))
            .map(|i| base * 2u32.pow(i as u32))
            .collect();
        Self { delays }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Total attempts this schedule allows.
    pub fn attempts(&self) -> usize {
        self.delays.len() + 1
    }
}

impl Default for RetrySchedule {
    /// Three attempts with 5s then 10s between them.
    fn default() -> Self {
        Self::exponential(3, Duration::from_secs(5))
    }
}

/// Final transcription result handed to the attribution merger.
#[derive(Debug, Clone)]
pub struct TranscriptionOutcome {
    pub full_text: String,
    pub language: Option<String>,
    pub segments: Vec<SpeakerSegment>,
    pub word_count: usize,
}

/// Transcribes one meeting recording through the configured provider.
pub struct TranscriptionClient {
    provider: Arc<dyn Provider>,
    segmenter: AudioSegmenter,
    schedule: RetrySchedule,
}

impl TranscriptionClient {
    pub fn new(
        provider: Arc<dyn Provider>,
        segmenter: AudioSegmenter,
        schedule: RetrySchedule,
    ) -> Self {
        Self {
            provider,
            segmenter,
            schedule,
        }
    }

    /// Transcribes the audio file, segmenting it first when it exceeds the
    /// provider upload limit.
    ///
    /// Chunk files created along the way are deleted on every exit path. A
    /// single irrecoverable chunk failure fails the whole operation; there is
    /// no partial-transcript success.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptionOutcome, Error> {
        let metadata = tokio::fs::metadata(audio_path)
            .await
            .map_err(|_| Error::empty_input(&format!("audio file not found: {:?}", audio_path)))?;

        if metadata.len() == 0 {
            return Err(Error::empty_input(&format!(
                "audio file is empty: {:?}",
                audio_path
            )));
        }

        let transcription = if self.segmenter.needs_segmentation(metadata.len()) {
            info!(
                "Audio file is {} bytes, splitting before transcription",
                metadata.len()
            );
            self.transcribe_segmented(audio_path).await?
        } else {
            self.transcribe_with_retries(audio_path).await?
        };

        let segments = group_words_into_segments(&transcription.words);

        Ok(TranscriptionOutcome {
            full_text: transcription.text,
            language: transcription.language_code,
            segments,
            word_count: transcription.word_count,
        })
    }

    /// Splits the file, transcribes each chunk independently, and merges the
    /// results. Chunks are removed whether or not transcription succeeded.
    async fn transcribe_segmented(&self, audio_path: &Path) -> Result<Transcription, Error> {
        let chunks = self.segmenter.split(audio_path).await?;

        let result = self.transcribe_chunks(&chunks).await;
        AudioSegmenter::cleanup(&chunks).await;

        result
    }

    async fn transcribe_chunks(&self, chunks: &[AudioChunk]) -> Result<Transcription, Error> {
        let mut results = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            debug!(
                "Transcribing chunk {}/{}",
                chunk.sequence_index + 1,
                chunks.len()
            );
            let transcription = self.transcribe_with_retries(&chunk.path).await?;
            results.push(transcription);
        }

        Ok(merge_chunk_transcriptions(
            results,
            self.segmenter.chunk_duration_secs(),
        ))
    }

    /// Runs provider attempts against the backoff schedule.
    ///
    /// Configuration, authentication, and empty-input failures return
    /// immediately; a rate-limit signal short-circuits the remaining retries
    /// rather than backing off further.
    async fn transcribe_with_retries(&self, audio_path: &Path) -> Result<Transcription, Error> {
        let attempts = self.schedule.attempts();

        for attempt in 1..=attempts {
            info!(
                "Transcribing with {} (attempt {}/{})",
                self.provider.provider_id(),
                attempt,
                attempts
            );

            match self.provider.transcribe_file(audio_path).await {
                Ok(transcription) => return Ok(transcription),
                Err(e) if !e.is_retryable() => {
                    warn!("Transcription failed without retry: {}", e);
                    return Err(e.into());
                }
                Err(e) if attempt < attempts => {
                    let delay = self.schedule.delays()[attempt - 1];
                    warn!(
                        "Transcription attempt {} failed: {}. Retrying in {}s...",
                        attempt,
                        e,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("Transcription failed after {} attempts: {}", attempts, e);
                    return Err(e.into());
                }
            }
        }

        // The loop always returns; an empty schedule still makes one attempt.
        Err(Error::from(ProviderError::Provider(
            "no transcription attempts were made".to_string(),
        )))
    }
}

/// Merges per-chunk transcriptions into one stream.
///
/// Texts join with a single space; word timestamps shift by
/// `chunk_index * chunk_duration_secs * 1000` so merged times stay monotonic
/// across chunk boundaries.
pub fn merge_chunk_transcriptions(
    results: Vec<Transcription>,
    chunk_duration_secs: u64,
) -> Transcription {
    let mut text_parts = Vec::with_capacity(results.len());
    let mut words = Vec::new();
    let mut language_code = None;
    let mut word_count = 0;

    for (index, result) in results.into_iter().enumerate() {
        let offset_ms = index as i64 * chunk_duration_secs as i64 * 1000;

        if !result.text.is_empty() {
            text_parts.push(result.text);
        }
        word_count += result.word_count;
        if language_code.is_none() {
            language_code = result.language_code;
        }

        words.extend(result.words.into_iter().map(|w| Word {
            start_ms: w.start_ms + offset_ms,
            end_ms: w.end_ms + offset_ms,
            ..w
        }));
    }

    Transcription {
        text: text_parts.join(" "),
        language_code,
        words,
        word_count,
    }
}

/// Groups consecutive words sharing a speaker id into speaker segments.
///
/// A word with no speaker label belongs to speaker "0" - an unknown speaker
/// never blocks segment formation. Segment text joins words with single
/// spaces; the span runs from the first word's start to the last word's end.
pub fn group_words_into_segments(words: &[Word]) -> Vec<SpeakerSegment> {
    let mut segments: Vec<SpeakerSegment> = Vec::new();

    for word in words {
        let speaker = word.speaker_id.clone().unwrap_or_else(|| "0".to_string());

        match segments.last_mut() {
            Some(current) if current.speaker == speaker => {
                current.text.push(' ');
                current.text.push_str(&word.text);
                current.end_ms = word.end_ms;
            }
            _ => segments.push(SpeakerSegment {
                speaker,
                text: word.text.clone(),
                start_ms: word.start_ms,
                end_ms: word.end_ms,
                confidence: None,
            }),
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider stub that fails a fixed number of times before succeeding.
    struct FlakyProvider {
        calls: AtomicUsize,
        failures_before_success: usize,
        error_factory: fn() -> ProviderError,
    }

    impl FlakyProvider {
        fn new(failures_before_success: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures_before_success,
                error_factory: || ProviderError::Network("connection reset".to_string()),
            }
        }

        fn failing_with(error_factory: fn() -> ProviderError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures_before_success: usize::MAX,
                error_factory,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        async fn transcribe_file(&self, _audio_path: &Path) -> Result<Transcription, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err((self.error_factory)())
            } else {
                Ok(Transcription {
                    text: "hello world".to_string(),
                    language_code: Some("en".to_string()),
                    words: vec![],
                    word_count: 2,
                })
            }
        }

        fn provider_id(&self) -> &str {
            "stub"
        }

        async fn verify_credentials(&self) -> Result<bool, ProviderError> {
            Ok(true)
        }
    }

    fn write_temp_audio(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    fn client_with(provider: Arc<dyn Provider>) -> TranscriptionClient {
        TranscriptionClient::new(
            provider,
            AudioSegmenter::new(20 * 1024 * 1024, 600),
            RetrySchedule::default(),
        )
    }

    #[test]
    fn test_default_schedule_is_5s_then_10s() {
        let schedule = RetrySchedule::default();
        assert_eq!(schedule.attempts(), 3);
        assert_eq!(
            schedule.delays(),
            &[Duration::from_secs(5), Duration::from_secs(10)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success_makes_three_attempts_with_backoff() {
        let provider = Arc::new(FlakyProvider::new(2));
        let client = client_with(provider.clone());
        let audio = write_temp_audio(b"audio-bytes");

        let started = tokio::time::Instant::now();
        let outcome = client.transcribe(audio.path()).await.unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(outcome.full_text, "hello world");
        // 5s after the first failure, 10s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_configuration_error_is_not_retried() {
        let provider = Arc::new(FlakyProvider::failing_with(|| {
            ProviderError::Configuration("API key not configured".to_string())
        }));
        let client = client_with(provider.clone());
        let audio = write_temp_audio(b"audio-bytes");

        let err = client.transcribe(audio.path()).await.unwrap_err();
        assert_eq!(provider.calls(), 1);
        assert_eq!(
            err.error_kind,
            crate::error::DomainErrorKind::Internal(crate::error::InternalErrorKind::Config)
        );
    }

    #[tokio::test]
    async fn test_rate_limit_short_circuits_remaining_retries() {
        let provider = Arc::new(FlakyProvider::failing_with(|| ProviderError::RateLimited {
            retry_after_seconds: 60,
        }));
        let client = client_with(provider.clone());
        let audio = write_temp_audio(b"audio-bytes");

        let err = client.transcribe(audio.path()).await.unwrap_err();
        assert_eq!(provider.calls(), 1);
        assert_eq!(
            err.error_kind,
            crate::error::DomainErrorKind::External(crate::error::ExternalErrorKind::RateLimited)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_escalate() {
        let provider = Arc::new(FlakyProvider::failing_with(|| {
            ProviderError::Network("timeout".to_string())
        }));
        let client = client_with(provider.clone());
        let audio = write_temp_audio(b"audio-bytes");

        let err = client.transcribe(audio.path()).await.unwrap_err();
        assert_eq!(provider.calls(), 3);
        assert_eq!(
            err.error_kind,
            crate::error::DomainErrorKind::External(crate::error::ExternalErrorKind::Network)
        );
    }

    #[tokio::test]
    async fn test_empty_file_fails_immediately() {
        let provider = Arc::new(FlakyProvider::new(0));
        let client = client_with(provider.clone());
        let audio = write_temp_audio(b"");

        let err = client.transcribe(audio.path()).await.unwrap_err();
        assert_eq!(provider.calls(), 0);
        assert_eq!(
            err.error_kind,
            crate::error::DomainErrorKind::Internal(crate::error::InternalErrorKind::EmptyInput)
        );
    }

    #[test]
    fn test_merge_offsets_word_times_across_chunks() {
        let chunk = |start: i64, text: &str| Transcription {
            text: text.to_string(),
            language_code: Some("en".to_string()),
            words: vec![Word {
                text: text.to_string(),
                start_ms: start,
                end_ms: start + 400,
                speaker_id: Some("0".to_string()),
            }],
            word_count: 1,
        };

        let merged = merge_chunk_transcriptions(vec![chunk(100, "first"), chunk(100, "second")], 600);

        assert_eq!(merged.text, "first second");
        assert_eq!(merged.word_count, 2);
        assert_eq!(merged.words[0].start_ms, 100);
        // Second chunk's words shift by 600s
        assert_eq!(merged.words[1].start_ms, 600_000 + 100);
        assert!(merged.words[1].start_ms > merged.words[0].end_ms);
    }

    #[test]
    fn test_group_words_by_contiguous_speaker_runs() {
        let word = |text: &str, start: i64, speaker: Option<&str>| Word {
            text: text.to_string(),
            start_ms: start,
            end_ms: start + 300,
            speaker_id: speaker.map(String::from),
        };

        let words = vec![
            word("hello", 0, Some("0")),
            word("there", 400, Some("0")),
            word("hi", 800, Some("1")),
            word("back", 1200, Some("0")),
        ];

        let segments = group_words_into_segments(&words);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].speaker, "0");
        assert_eq!(segments[0].text, "hello there");
        assert_eq!(segments[0].start_ms, 0);
        assert_eq!(segments[0].end_ms, 700);
        assert_eq!(segments[1].speaker, "1");
        assert_eq!(segments[2].speaker, "0");
    }

    #[test]
    fn test_missing_speaker_defaults_to_zero() {
        let words = vec![
            Word {
                text: "unlabeled".to_string(),
                start_ms: 0,
                end_ms: 300,
                speaker_id: None,
            },
            Word {
                text: "words".to_string(),
                start_ms: 400,
                end_ms: 700,
                speaker_id: Some("0".to_string()),
            },
        ];

        let segments = group_words_into_segments(&words);
        // The unlabeled word joins speaker "0" rather than blocking grouping
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker, "0");
        assert_eq!(segments[0].text, "unlabeled words");
    }
}
