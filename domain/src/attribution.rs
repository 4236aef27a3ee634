//! Speaker attribution: reconciling machine diarization with scraped captions.
//!
//! Machine diarization yields opaque numeric labels; captions carry real
//! display names but coarse client-side timestamps. The merger picks the
//! authoritative transcript source and, where both signals exist, resolves
//! labels to names by time proximity.

use crate::transcription::TranscriptionOutcome;
use log::*;
use meeting_ai::{CaptionEntry, SpeakerSegment, TranscriptSource};
use std::collections::HashMap;

/// Estimated duration of one caption line when converting to a segment.
const CAPTION_DURATION_MS: i64 = 2000;

/// Maximum distance between a caption timestamp and a segment start for the
/// caption's speaker name to claim that segment.
const NAME_MATCH_WINDOW_MS: i64 = 3000;

/// Result of the attribution merge. Exactly one source tag per run.
#[derive(Debug, Clone)]
pub struct MergedTranscript {
    pub full_text: String,
    pub segments: Vec<SpeakerSegment>,
    pub source: TranscriptSource,
}

impl MergedTranscript {
    fn empty() -> Self {
        Self {
            full_text: String::new(),
            segments: Vec::new(),
            source: TranscriptSource::None,
        }
    }
}

/// Reconciles machine output with caption-derived speaker labels.
pub struct SpeakerAttributionMerger {
    prefer_machine_speakers: bool,
}

impl SpeakerAttributionMerger {
    /// `prefer_machine_speakers` keeps machine diarization labels even when
    /// caption names are available. The default policy is caption priority.
    pub fn new(prefer_machine_speakers: bool) -> Self {
        Self {
            prefer_machine_speakers,
        }
    }

    /// Selects the authoritative transcript and attributes speakers.
    ///
    /// The full text is always reconstructible as the newline join of
    /// `"speaker: text"` per segment in chronological order (or the plain
    /// machine text when no attribution signal exists at all), so re-merging
    /// the output is a no-op on content.
    pub fn merge(
        &self,
        machine: Option<&TranscriptionOutcome>,
        captions: &[CaptionEntry],
    ) -> MergedTranscript {
        // A machine result with no text and no diarization contributes
        // nothing to identification; treat it as absent
        let machine = machine
            .filter(|outcome| !outcome.segments.is_empty() || !outcome.full_text.trim().is_empty());

        match (machine, captions.is_empty()) {
            // Machine transcript and captions: captions identify speakers
            (Some(outcome), false) => {
                let segments = if !outcome.segments.is_empty() && self.prefer_machine_speakers {
                    friendly_speaker_names(outcome.segments.clone())
                } else if !outcome.segments.is_empty() {
                    let named = resolve_speaker_names(outcome.segments.clone(), captions);
                    friendly_speaker_names(named)
                } else {
                    debug!(
                        "Machine transcript has no diarization, using {} caption entries for speakers",
                        captions.len()
                    );
                    captions_to_segments(captions)
                };

                MergedTranscript {
                    full_text: render_transcript(&segments),
                    segments,
                    source: TranscriptSource::ElevenLabsWithCaptions,
                }
            }
            // Machine transcript only
            (Some(outcome), true) => {
                if !outcome.segments.is_empty() {
                    let segments = friendly_speaker_names(outcome.segments.clone());
                    MergedTranscript {
                        full_text: render_transcript(&segments),
                        segments,
                        source: TranscriptSource::ElevenLabsDiarization,
                    }
                } else {
                    // No diarization and no captions: plain undiarized text
                    MergedTranscript {
                        full_text: outcome.full_text.clone(),
                        segments: Vec::new(),
                        source: TranscriptSource::ElevenLabsOnly,
                    }
                }
            }
            // Captions only
            (None, false) => {
                info!("No machine transcript, using client captions as primary source");
                let segments = captions_to_segments(captions);
                MergedTranscript {
                    full_text: render_transcript(&segments),
                    segments,
                    source: TranscriptSource::ClientCaptions,
                }
            }
            // Nothing at all
            (None, true) => MergedTranscript::empty(),
        }
    }
}

/// Renders segments as one `"speaker: text"` line each, in order.
pub fn render_transcript(segments: &[SpeakerSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("{}: {}", s.speaker, s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converts caption entries to speaker segments.
///
/// Captions carry no end time; each gets an estimated duration. Confidence is
/// 1.0 - the names came straight from the call UI.
fn captions_to_segments(captions: &[CaptionEntry]) -> Vec<SpeakerSegment> {
    captions
        .iter()
        .map(|caption| SpeakerSegment {
            speaker: caption.speaker.clone(),
            text: caption.text.clone(),
            start_ms: caption.timestamp_ms,
            end_ms: caption.timestamp_ms + CAPTION_DURATION_MS,
            confidence: Some(1.0),
        })
        .collect()
}

/// Overrides machine speaker labels with caption names matched by time
/// proximity. First caption within the window wins; segments with no match
/// keep their machine label.
fn resolve_speaker_names(
    mut segments: Vec<SpeakerSegment>,
    captions: &[CaptionEntry],
) -> Vec<SpeakerSegment> {
    let mut label_names: HashMap<String, String> = HashMap::new();

    for segment in &segments {
        if label_names.contains_key(&segment.speaker) {
            continue;
        }
        let matched = captions
            .iter()
            .find(|caption| (caption.timestamp_ms - segment.start_ms).abs() < NAME_MATCH_WINDOW_MS);
        if let Some(caption) = matched {
            label_names.insert(segment.speaker.clone(), caption.speaker.clone());
        }
    }

    if !label_names.is_empty() {
        debug!("Speaker mapping: {:?}", label_names);
    }

    for segment in &mut segments {
        if let Some(name) = label_names.get(&segment.speaker) {
            segment.speaker = name.clone();
        }
    }

    segments
}

/// Replaces leftover machine labels with "Speaker N" display names, numbered
/// in order of first appearance. Labels already resolved to real names pass
/// through untouched.
fn friendly_speaker_names(mut segments: Vec<SpeakerSegment>) -> Vec<SpeakerSegment> {
    let mut display_names: HashMap<String, String> = HashMap::new();
    let mut counter = 0usize;

    for segment in &mut segments {
        if !is_machine_label(&segment.speaker) {
            continue;
        }
        let name = display_names
            .entry(segment.speaker.clone())
            .or_insert_with(|| {
                counter += 1;
                format!("Speaker {}", counter)
            });
        segment.speaker = name.clone();
    }

    segments
}

/// Machine diarization labels are bare indexes ("0", "1") or prefixed forms
/// like "speaker_0"; anything else is treated as a real name.
fn is_machine_label(speaker: &str) -> bool {
    let label = speaker.strip_prefix("speaker_").unwrap_or(speaker);
    !label.is_empty() && label.chars().all(|c| c.is_ascii_digit())
}
