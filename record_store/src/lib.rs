//! Interfaces to the meeting record store and speaker-segment store.
//!
//! Persistence itself lives in an excluded subsystem; the pipeline only
//! depends on the traits defined here. The [`memory`] module provides the
//! in-memory implementation used by the worker binary and by tests.

pub mod error;
pub mod meeting;
pub mod memory;
pub mod segment;
pub mod store;

pub type Id = uuid::Uuid;

pub use error::Error;
pub use meeting::{Meeting, MeetingStatus, MeetingUpdate, NewMeeting, ProcessingStage};
pub use segment::StoredSegment;
pub use store::{MeetingStore, SegmentStore};
