//! Store traits implemented by the persistence subsystem.

use crate::error::Error;
use crate::meeting::{Meeting, MeetingUpdate, NewMeeting};
use crate::segment::StoredSegment;
use crate::Id;
use async_trait::async_trait;

/// Meeting record store.
///
/// `update` is a partial write: only fields present in the [`MeetingUpdate`]
/// are mutated. The pipeline checkpoints through this trait after every stage
/// that produces durable output.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// Creates a new meeting record and returns the stored snapshot.
    async fn create(&self, fields: NewMeeting) -> Result<Meeting, Error>;

    /// Applies a partial update and returns the updated snapshot.
    async fn update(&self, id: Id, update: MeetingUpdate) -> Result<Meeting, Error>;

    /// Finds a meeting by id.
    async fn find_by_id(&self, id: Id) -> Result<Meeting, Error>;
}

/// Speaker-segment store.
///
/// Called once per [`StoredSegment`] after the attribution merge.
#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// Appends one segment to the meeting's transcript record.
    async fn append(&self, meeting_id: Id, segment: StoredSegment) -> Result<(), Error>;
}
