//! Types for summarization output.

use serde::{Deserialize, Serialize};

/// A single extracted action item.
///
/// The structured form supplied by JSON-mode extraction. Bullet-list
/// extraction maps to this shape with `owner = "Unassigned"` and
/// `deadline = "TBD"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    /// Name or role responsible for the task.
    pub owner: String,
    /// Specific task description.
    pub task: String,
    /// Date/time if mentioned in the meeting, else "TBD".
    pub deadline: String,
}

impl ActionItem {
    /// Wraps a bare task string in the structured form.
    pub fn unassigned(task: String) -> Self {
        Self {
            owner: "Unassigned".to_string(),
            task,
            deadline: "TBD".to_string(),
        }
    }
}

/// Intermediate map-stage output for one transcript chunk.
///
/// Ordered by index; never persisted individually. A failed chunk carries a
/// placeholder text rather than being dropped, so indexes stay dense.
#[derive(Debug, Clone)]
pub struct ChunkSummary {
    pub index: usize,
    pub text: String,
}

/// Final consolidated summarization result for a meeting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub summary: String,
    pub action_items: Vec<ActionItem>,
    pub key_points: Vec<String>,
}
