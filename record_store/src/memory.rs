//! In-memory record store used by the worker binary and tests.

use crate::error::Error;
use crate::meeting::{Meeting, MeetingStatus, MeetingUpdate, NewMeeting, ProcessingStage};
use crate::segment::StoredSegment;
use crate::store::{MeetingStore, SegmentStore};
use crate::Id;
use async_trait::async_trait;
use chrono::Utc;
use log::*;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// HashMap-backed implementation of both store traits.
///
/// Each pipeline run owns its meeting entry; the only sharing is the maps
/// themselves, guarded by async mutexes so concurrent pipeline instances can
/// checkpoint independently.
#[derive(Default)]
pub struct InMemoryStore {
    meetings: Mutex<HashMap<Id, Meeting>>,
    segments: Mutex<HashMap<Id, Vec<StoredSegment>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the segments appended for a meeting, in insertion order.
    pub async fn segments_for(&self, meeting_id: Id) -> Vec<StoredSegment> {
        self.segments
            .lock()
            .await
            .get(&meeting_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MeetingStore for InMemoryStore {
    async fn create(&self, fields: NewMeeting) -> Result<Meeting, Error> {
        let now = Utc::now();
        let meeting = Meeting {
            id: Id::new_v4(),
            name: fields.name,
            status: MeetingStatus::Processing,
            processing_stage: ProcessingStage::Uploaded,
            raw_transcript: None,
            client_transcript: fields.client_transcript,
            elevenlabs_transcript: None,
            transcription_words: None,
            transcript_source: None,
            summary: None,
            action_items: vec![],
            key_points: vec![],
            sentiment: None,
            error_log: vec![],
            audio_file_size: fields.audio_file_size,
            created_at: now,
            updated_at: now,
        };

        debug!("Creating meeting record: {}", meeting.id);
        self.meetings
            .lock()
            .await
            .insert(meeting.id, meeting.clone());
        Ok(meeting)
    }

    async fn update(&self, id: Id, update: MeetingUpdate) -> Result<Meeting, Error> {
        let mut meetings = self.meetings.lock().await;
        let meeting = meetings.get_mut(&id).ok_or_else(Error::not_found)?;
        update.apply(meeting);
        Ok(meeting.clone())
    }

    async fn find_by_id(&self, id: Id) -> Result<Meeting, Error> {
        self.meetings
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(Error::not_found)
    }
}

#[async_trait]
impl SegmentStore for InMemoryStore {
    async fn append(&self, meeting_id: Id, segment: StoredSegment) -> Result<(), Error> {
        self.segments
            .lock()
            .await
            .entry(meeting_id)
            .or_default()
            .push(segment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordStoreErrorKind;

    #[tokio::test]
    async fn test_create_then_find_round_trips() {
        let store = InMemoryStore::new();
        let created = store
            .create(NewMeeting {
                name: "Standup".to_string(),
                client_transcript: Some("Alice: hi".to_string()),
                audio_file_size: Some(2048),
            })
            .await
            .unwrap();

        let found = store.find_by_id(created.id).await.unwrap();
        assert_eq!(found.name, "Standup");
        assert_eq!(found.client_transcript.as_deref(), Some("Alice: hi"));
        assert_eq!(found.status, MeetingStatus::Processing);
        assert_eq!(found.processing_stage, ProcessingStage::Uploaded);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update(Id::new_v4(), MeetingUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_kind, RecordStoreErrorKind::RecordNotFound);
    }

    #[tokio::test]
    async fn test_segments_append_in_order() {
        let store = InMemoryStore::new();
        let meeting = store.create(NewMeeting::default()).await.unwrap();

        for (i, speaker) in ["Alice", "Bob"].iter().enumerate() {
            store
                .append(
                    meeting.id,
                    StoredSegment {
                        speaker_label: speaker.to_string(),
                        text: format!("line {}", i),
                        start_time_ms: i as i64 * 1000,
                        end_time_ms: i as i64 * 1000 + 2000,
                        confidence: Some(1.0),
                    },
                )
                .await
                .unwrap();
        }

        let segments = store.segments_for(meeting.id).await;
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speaker_label, "Alice");
        assert_eq!(segments[1].speaker_label, "Bob");
    }
}
