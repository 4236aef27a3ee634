//! Meeting record model and lifecycle enums.

use crate::Id;
use chrono::{DateTime, Utc};
use meeting_ai::types::summary::ActionItem;
use meeting_ai::TranscriptSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level lifecycle status of a meeting record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    /// Pipeline work is in flight.
    Processing,
    /// A transcript exists; summarization has not finished.
    Transcribed,
    /// The run reached its successful terminal state.
    Completed,
    /// Transcription produced nothing; absorbing failure state.
    Failed,
    /// Misconfiguration (missing credentials) stopped the run outright.
    Error,
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tag = match self {
            MeetingStatus::Processing => "processing",
            MeetingStatus::Transcribed => "transcribed",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Failed => "failed",
            MeetingStatus::Error => "error",
        };
        write!(f, "{}", tag)
    }
}

/// Fine-grained pipeline stage, persisted with each checkpoint.
///
/// Transitions are monotonic forward; once a stage has advanced the meeting,
/// it is never replayed. Transcription retries happen *within* `Transcribing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Uploaded,
    Transcribing,
    Transcribed,
    Summarizing,
    Summarized,
    Completed,
    TranscriptionError,
    Failed,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tag = match self {
            ProcessingStage::Uploaded => "uploaded",
            ProcessingStage::Transcribing => "transcribing",
            ProcessingStage::Transcribed => "transcribed",
            ProcessingStage::Summarizing => "summarizing",
            ProcessingStage::Summarized => "summarized",
            ProcessingStage::Completed => "completed",
            ProcessingStage::TranscriptionError => "transcription_error",
            ProcessingStage::Failed => "failed",
        };
        write!(f, "{}", tag)
    }
}

/// Snapshot of a meeting record as persisted by the record store.
///
/// Owned exclusively by the pipeline orchestrator during a run; the store
/// merely persists snapshots on request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Id,
    pub name: String,
    pub status: MeetingStatus,
    pub processing_stage: ProcessingStage,
    /// The merged, speaker-attributed transcript.
    pub raw_transcript: Option<String>,
    /// Caption lines as uploaded by the client, joined "speaker: text".
    pub client_transcript: Option<String>,
    /// Machine transcription text only, kept separately from the merged form.
    pub elevenlabs_transcript: Option<String>,
    pub transcription_words: Option<i64>,
    pub transcript_source: Option<TranscriptSource>,
    pub summary: Option<String>,
    pub action_items: Vec<ActionItem>,
    pub key_points: Vec<String>,
    pub sentiment: Option<String>,
    pub error_log: Vec<String>,
    pub audio_file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a meeting record.
#[derive(Debug, Clone, Default)]
pub struct NewMeeting {
    pub name: String,
    pub client_transcript: Option<String>,
    pub audio_file_size: Option<i64>,
}

/// Partial update of a meeting record.
///
/// Only fields carrying `Some` are mutated; everything else is left untouched
/// by the store. This is the only write shape the pipeline uses after
/// creation, so each checkpoint persists exactly the fields its stage
/// produced.
#[derive(Debug, Clone, Default)]
pub struct MeetingUpdate {
    pub status: Option<MeetingStatus>,
    pub processing_stage: Option<ProcessingStage>,
    pub raw_transcript: Option<String>,
    pub elevenlabs_transcript: Option<String>,
    pub transcription_words: Option<i64>,
    pub transcript_source: Option<TranscriptSource>,
    pub summary: Option<String>,
    pub action_items: Option<Vec<ActionItem>>,
    pub key_points: Option<Vec<String>>,
    pub sentiment: Option<String>,
    pub error_log_append: Option<String>,
}

impl MeetingUpdate {
    /// Applies the present fields to `meeting`, bumping `updated_at`.
    pub fn apply(self, meeting: &mut Meeting) {
        if let Some(status) = self.status {
            meeting.status = status;
        }
        if let Some(stage) = self.processing_stage {
            meeting.processing_stage = stage;
        }
        if let Some(raw_transcript) = self.raw_transcript {
            meeting.raw_transcript = Some(raw_transcript);
        }
        if let Some(elevenlabs_transcript) = self.elevenlabs_transcript {
            meeting.elevenlabs_transcript = Some(elevenlabs_transcript);
        }
        if let Some(words) = self.transcription_words {
            meeting.transcription_words = Some(words);
        }
        if let Some(source) = self.transcript_source {
            meeting.transcript_source = Some(source);
        }
        if let Some(summary) = self.summary {
            meeting.summary = Some(summary);
        }
        if let Some(action_items) = self.action_items {
            meeting.action_items = action_items;
        }
        if let Some(key_points) = self.key_points {
            meeting.key_points = key_points;
        }
        if let Some(sentiment) = self.sentiment {
            meeting.sentiment = Some(sentiment);
        }
        if let Some(entry) = self.error_log_append {
            meeting.error_log.push(entry);
        }
        meeting.updated_at = Utc::now();
    }
}
