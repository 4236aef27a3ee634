//! Business logic for the meeting processing pipeline.
//!
//! The pipeline turns a recorded meeting (audio file plus optional scraped
//! captions) into a speaker-attributed transcript, an executive summary, and
//! action items. Stages run strictly sequentially per meeting:
//! segmentation (oversized audio) -> transcription -> speaker attribution ->
//! chunked map-reduce summarization, with a checkpoint written to the meeting
//! record store after each stage.

// Re-exports so binary consumers do not need to depend on the lower crates
// directly.
pub use meeting_ai::types::summary::{ActionItem, MeetingSummary};
pub use meeting_ai::{CaptionEntry, SpeakerSegment, TranscriptSource, Word};
pub use record_store::Id;

pub mod attribution;
pub mod audio;
pub mod error;
pub mod pipeline;
pub mod summarization;
pub mod tokenizer;
pub mod transcription;

pub mod gateway;
