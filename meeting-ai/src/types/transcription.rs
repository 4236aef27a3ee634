//! Types for transcription operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Individual word with timing and optional speaker attribution.
///
/// The raw unit returned by diarizing speech-to-text providers. The speaker id
/// is an opaque machine label (e.g. "0", "1"), never a real name; resolving
/// labels to names is the attribution layer's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub speaker_id: Option<String>,
}

/// Continuous speech span attributed to a single speaker.
///
/// Produced either by grouping consecutive same-speaker words or by converting
/// caption entries. This is the unit both transcript assembly and persistence
/// operate on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    pub speaker: String,
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub confidence: Option<f64>,
}

/// One caption line scraped from a video-call UI.
///
/// Best-effort input: speaker names are real display names, timestamps are
/// client-side milliseconds. Immutable and ordered by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEntry {
    pub speaker: String,
    pub text: String,
    #[serde(alias = "timestamp")]
    pub timestamp_ms: i64,
}

/// Provenance tag recording which signal produced the authoritative transcript.
///
/// Exactly one source is chosen per pipeline run and persisted with the
/// meeting record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptSource {
    #[serde(rename = "elevenlabs_only")]
    ElevenLabsOnly,
    #[serde(rename = "elevenlabs_diarization")]
    ElevenLabsDiarization,
    #[serde(rename = "elevenlabs_with_captions")]
    ElevenLabsWithCaptions,
    #[serde(rename = "client_captions")]
    ClientCaptions,
    #[serde(rename = "none")]
    None,
}

impl fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            TranscriptSource::ElevenLabsOnly => "elevenlabs_only",
            TranscriptSource::ElevenLabsDiarization => "elevenlabs_diarization",
            TranscriptSource::ElevenLabsWithCaptions => "elevenlabs_with_captions",
            TranscriptSource::ClientCaptions => "client_captions",
            TranscriptSource::None => "none",
        };
        write!(f, "{}", tag)
    }
}

/// Complete normalized transcription result from a speech-to-text provider.
///
/// `words` is empty when the provider did not return word-level diarization.
/// `word_count` is derived from the text, not the word list, so it is
/// populated even for non-diarizing providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub language_code: Option<String>,
    pub words: Vec<Word>,
    pub word_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_source_serializes_to_original_tags() {
        let tags = [
            (TranscriptSource::ElevenLabsOnly, "\"elevenlabs_only\""),
            (
                TranscriptSource::ElevenLabsDiarization,
                "\"elevenlabs_diarization\"",
            ),
            (
                TranscriptSource::ElevenLabsWithCaptions,
                "\"elevenlabs_with_captions\"",
            ),
            (TranscriptSource::ClientCaptions, "\"client_captions\""),
            (TranscriptSource::None, "\"none\""),
        ];
        for (source, expected) in tags {
            assert_eq!(serde_json::to_string(&source).unwrap(), expected);
            assert_eq!(source.to_string(), expected.trim_matches('"'));
        }
    }
}
