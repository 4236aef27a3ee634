//! Persisted speaker-segment shape.

use serde::{Deserialize, Serialize};

/// Input for appending one speaker segment to a meeting's transcript record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSegment {
    pub speaker_label: String,
    pub text: String,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub confidence: Option<f64>,
}
