//! Pipeline orchestrator: sequences transcription, attribution, and
//! summarization for one meeting, checkpointing the record store after each
//! stage.
//!
//! One orchestrator instance serves many meetings; each `process` call is an
//! independent run with no shared mutable state beyond the record store.
//! Invocations are fire-and-forget - the caller only observes the resolved
//! future for logging.

use crate::attribution::{MergedTranscript, SpeakerAttributionMerger};
use crate::audio::AudioSegmenter;
use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use crate::gateway::eleven_labs::ElevenLabsClient;
use crate::gateway::open_ai::OpenAiClient;
use crate::summarization::{MapReduceSummarizer, SummarizerSettings, SummaryChunker};
use crate::tokenizer::TokenCounter;
use crate::transcription::{RetrySchedule, TranscriptionClient, TranscriptionOutcome};
use log::*;
use meeting_ai::{CaptionEntry, TranscriptSource};
use record_store::{
    Id, MeetingStatus, MeetingStore, MeetingUpdate, ProcessingStage, SegmentStore, StoredSegment,
};
use service::config::Config;
use std::path::Path;
use std::sync::Arc;

/// Summary text persisted when no generation credential is configured.
const SUMMARY_SKIPPED: &str = "Summarization skipped (no API key)";

/// Synthetic transcript persisted when no transcript could be produced.
const TRANSCRIPT_FAILED: &str = "Transcription failed";

pub struct PipelineOrchestrator {
    meeting_store: Arc<dyn MeetingStore>,
    segment_store: Arc<dyn SegmentStore>,
    transcription: Option<TranscriptionClient>,
    summarizer: Option<MapReduceSummarizer>,
    merger: SpeakerAttributionMerger,
}

impl PipelineOrchestrator {
    pub fn new(
        meeting_store: Arc<dyn MeetingStore>,
        segment_store: Arc<dyn SegmentStore>,
        transcription: Option<TranscriptionClient>,
        summarizer: Option<MapReduceSummarizer>,
        merger: SpeakerAttributionMerger,
    ) -> Self {
        Self {
            meeting_store,
            segment_store,
            transcription,
            summarizer,
            merger,
        }
    }

    /// Wires the orchestrator from runtime configuration.
    ///
    /// A missing credential leaves the corresponding stage unconfigured
    /// rather than failing construction; the pipeline degrades per stage.
    pub fn from_config(
        config: &Config,
        meeting_store: Arc<dyn MeetingStore>,
        segment_store: Arc<dyn SegmentStore>,
    ) -> Result<Self, Error> {
        let transcription = match config.elevenlabs_api_key() {
            Some(api_key) => {
                let client = ElevenLabsClient::new(
                    &api_key,
                    config.elevenlabs_base_url(),
                    &config.elevenlabs_model_id,
                    config.transcription_timeout_secs,
                )?;
                Some(TranscriptionClient::new(
                    Arc::new(client),
                    AudioSegmenter::new(
                        config.segmentation_threshold_bytes,
                        config.audio_chunk_duration_secs,
                    ),
                    RetrySchedule::default(),
                ))
            }
            None => {
                warn!("ElevenLabs API key not configured; machine transcription disabled");
                None
            }
        };

        let summarizer = match config.openai_api_key() {
            Some(api_key) => {
                let client = OpenAiClient::new(&api_key, config.openai_base_url())?;
                let chunker =
                    SummaryChunker::new(TokenCounter::new()?, config.max_chunk_tokens);
                Some(MapReduceSummarizer::new(
                    Arc::new(client),
                    chunker,
                    SummarizerSettings {
                        map_model: config.map_model.clone(),
                        reduce_model: config.reduce_model.clone(),
                        max_chunk_tokens: config.max_chunk_tokens,
                    },
                ))
            }
            None => {
                warn!("OpenAI API key not configured; summarization disabled");
                None
            }
        };

        Ok(Self::new(
            meeting_store,
            segment_store,
            transcription,
            summarizer,
            SpeakerAttributionMerger::new(config.prefer_machine_speakers),
        ))
    }

    /// Runs the whole pipeline for one meeting.
    ///
    /// Never returns an error: any failure that escapes the stages is caught
    /// here, logged, and converted into a best-effort meeting update. The
    /// temporary audio file is deleted exactly once, on every terminal path.
    pub async fn process(&self, meeting_id: Id, audio_path: &Path, captions: &[CaptionEntry]) {
        info!(
            "Starting pipeline for meeting {} ({} caption entries)",
            meeting_id,
            captions.len()
        );

        if let Err(e) = self.run(meeting_id, audio_path, captions).await {
            error!("Pipeline failed for meeting {}: {}", meeting_id, e);

            let status = match &e.error_kind {
                DomainErrorKind::Internal(InternalErrorKind::Config) => MeetingStatus::Error,
                _ => MeetingStatus::Failed,
            };
            let update = MeetingUpdate {
                status: Some(status),
                processing_stage: Some(ProcessingStage::Failed),
                summary: Some(format!("Processing failed: {}", e)),
                error_log_append: Some(e.to_string()),
                ..Default::default()
            };
            // A failure to record the failure is swallowed; nothing may
            // propagate past this boundary.
            if let Err(update_err) = self.meeting_store.update(meeting_id, update).await {
                error!(
                    "Failed to record pipeline failure for meeting {}: {}",
                    meeting_id, update_err
                );
            }
        }

        self.remove_audio_file(audio_path).await;
        info!("Pipeline finished for meeting {}", meeting_id);
    }

    async fn run(
        &self,
        meeting_id: Id,
        audio_path: &Path,
        captions: &[CaptionEntry],
    ) -> Result<(), Error> {
        self.checkpoint(
            meeting_id,
            MeetingUpdate {
                status: Some(MeetingStatus::Processing),
                processing_stage: Some(ProcessingStage::Transcribing),
                ..Default::default()
            },
        )
        .await;

        // Stage 1: machine transcription (best effort - captions may still
        // carry the run)
        let machine = self.transcribe_stage(meeting_id, audio_path).await;

        // Stage 2: speaker attribution and source selection
        let merged = self.merger.merge(machine.as_ref(), captions);

        if merged.source == TranscriptSource::None {
            warn!(
                "No transcript available for meeting {}; terminating run",
                meeting_id
            );
            self.checkpoint(
                meeting_id,
                MeetingUpdate {
                    raw_transcript: Some(TRANSCRIPT_FAILED.to_string()),
                    summary: Some(
                        "Processing failed: no transcript could be generated".to_string(),
                    ),
                    processing_stage: Some(ProcessingStage::TranscriptionError),
                    ..Default::default()
                },
            )
            .await;
            self.checkpoint(
                meeting_id,
                MeetingUpdate {
                    status: Some(MeetingStatus::Failed),
                    processing_stage: Some(ProcessingStage::Failed),
                    ..Default::default()
                },
            )
            .await;
            return Ok(());
        }

        info!(
            "Transcript ready for meeting {} (source: {}, {} segments)",
            meeting_id,
            merged.source,
            merged.segments.len()
        );

        // Immediate save: the transcript survives even if summarization
        // crashes later
        let word_count = machine
            .as_ref()
            .map(|m| m.word_count as i64)
            .unwrap_or_else(|| merged.full_text.split_whitespace().count() as i64);
        self.checkpoint(
            meeting_id,
            MeetingUpdate {
                status: Some(MeetingStatus::Transcribed),
                processing_stage: Some(ProcessingStage::Transcribed),
                raw_transcript: Some(merged.full_text.clone()),
                elevenlabs_transcript: machine.as_ref().map(|m| m.full_text.clone()),
                transcription_words: Some(word_count),
                transcript_source: Some(merged.source),
                ..Default::default()
            },
        )
        .await;

        self.persist_segments(meeting_id, &merged).await;

        // Stage 3: summarization, gated on a configured credential
        match &self.summarizer {
            Some(summarizer) => {
                self.checkpoint(
                    meeting_id,
                    MeetingUpdate {
                        processing_stage: Some(ProcessingStage::Summarizing),
                        ..Default::default()
                    },
                )
                .await;

                match summarizer.summarize(&merged.full_text).await {
                    Ok(result) => {
                        // Immediate save: the summary is durable before the
                        // run is marked complete
                        self.checkpoint(
                            meeting_id,
                            MeetingUpdate {
                                processing_stage: Some(ProcessingStage::Summarized),
                                summary: Some(result.summary),
                                action_items: Some(result.action_items),
                                key_points: Some(result.key_points),
                                sentiment: Some("Neutral".to_string()),
                                ..Default::default()
                            },
                        )
                        .await;
                        self.checkpoint(
                            meeting_id,
                            MeetingUpdate {
                                status: Some(MeetingStatus::Completed),
                                processing_stage: Some(ProcessingStage::Completed),
                                ..Default::default()
                            },
                        )
                        .await;
                    }
                    Err(e) => {
                        // Summarization errors degrade the summary, never the run
                        warn!("Summarization failed for meeting {}: {}", meeting_id, e);
                        self.checkpoint(
                            meeting_id,
                            MeetingUpdate {
                                status: Some(MeetingStatus::Completed),
                                processing_stage: Some(ProcessingStage::Completed),
                                summary: Some(format!("Summarization error: {}", e)),
                                error_log_append: Some(e.to_string()),
                                ..Default::default()
                            },
                        )
                        .await;
                    }
                }
            }
            None => {
                info!(
                    "Generation credential not configured; skipping summarization for meeting {}",
                    meeting_id
                );
                self.checkpoint(
                    meeting_id,
                    MeetingUpdate {
                        status: Some(MeetingStatus::Completed),
                        processing_stage: Some(ProcessingStage::Completed),
                        summary: Some(SUMMARY_SKIPPED.to_string()),
                        action_items: Some(Vec::new()),
                        key_points: Some(Vec::new()),
                        ..Default::default()
                    },
                )
                .await;
            }
        }

        Ok(())
    }

    /// Runs machine transcription when a client is configured. Failures are
    /// recorded on the meeting and reported as an absent transcript so the
    /// caption fallback can take over.
    async fn transcribe_stage(
        &self,
        meeting_id: Id,
        audio_path: &Path,
    ) -> Option<TranscriptionOutcome> {
        let client = match &self.transcription {
            Some(client) => client,
            None => {
                info!("Transcription credential not configured; skipping machine transcription");
                return None;
            }
        };

        match client.transcribe(audio_path).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(
                    "Machine transcription failed for meeting {}: {}",
                    meeting_id, e
                );
                self.checkpoint(
                    meeting_id,
                    MeetingUpdate {
                        error_log_append: Some(format!("transcription: {}", e)),
                        ..Default::default()
                    },
                )
                .await;
                None
            }
        }
    }

    /// Appends each merged segment to the segment store.
    async fn persist_segments(&self, meeting_id: Id, merged: &MergedTranscript) {
        for segment in &merged.segments {
            let stored = StoredSegment {
                speaker_label: segment.speaker.clone(),
                text: segment.text.clone(),
                start_time_ms: segment.start_ms,
                end_time_ms: segment.end_ms,
                confidence: segment.confidence,
            };
            if let Err(e) = self.segment_store.append(meeting_id, stored).await {
                warn!(
                    "Failed to persist segment for meeting {}: {}",
                    meeting_id, e
                );
            }
        }
        if !merged.segments.is_empty() {
            info!(
                "Saved {} speaker segments for meeting {}",
                merged.segments.len(),
                meeting_id
            );
        }
    }

    /// Persists a partial meeting update. Store failures are logged, never
    /// propagated - a checkpoint miss must not abort the run.
    async fn checkpoint(&self, meeting_id: Id, update: MeetingUpdate) {
        if let Err(e) = self.meeting_store.update(meeting_id, update).await {
            warn!("Failed to checkpoint meeting {}: {}", meeting_id, e);
        }
    }

    /// Deletes the temporary audio file. Called once per run at the terminal
    /// state, success or failure.
    async fn remove_audio_file(&self, audio_path: &Path) {
        match tokio::fs::remove_file(audio_path).await {
            Ok(()) => debug!("Cleaned up temp audio file {:?}", audio_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temp audio file {:?}: {}", audio_path, e),
        }
    }
}
