//! Meeting AI abstraction layer for transcription and summarization providers.
//!
//! This crate provides trait-based abstractions for meeting AI workflows:
//! - Speech-to-text transcription of recorded meeting audio, with optional
//!   word-level speaker diarization
//! - LLM text generation for map-reduce summarization and action-item
//!   extraction
//!
//! The design is provider-agnostic, enabling applications to swap between
//! different service providers (ElevenLabs, AssemblyAI, OpenAI, Gemini, etc.)
//! without changing pipeline code. Provider wire shapes are normalized into
//! the types in [`types`] at the gateway boundary.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::Error;
pub use types::transcription::{CaptionEntry, SpeakerSegment, TranscriptSource, Word};
