use crate::store::{CalendarStore, MeetingStore};
use crate::types::{
    CalendarEvent, FinalizedMeeting, MeetingRecord, Result, SchedulerError,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;

/// Commits a resolved time into durable state: one meeting record plus one
/// calendar event per participant. Called by the initiator after they
/// dereference the winning token; this is the only writer of calendar
/// commitments.
pub struct FinalizationStep {
    meetings: Arc<dyn MeetingStore>,
    calendar: Arc<dyn CalendarStore>,
}

impl FinalizationStep {
    pub fn new(meetings: Arc<dyn MeetingStore>, calendar: Arc<dyn CalendarStore>) -> Self {
        Self { meetings, calendar }
    }

    /// Finalize a meeting at the chosen time. Repeated finalization of the
    /// same meeting id is rejected; store failures surface verbatim.
    pub async fn finalize_meeting(
        &self,
        meeting_id: &str,
        winning_time: DateTime<Utc>,
        title: &str,
        organizer_id: &str,
        participant_ids: &[String],
        duration_minutes: i64,
    ) -> Result<FinalizedMeeting> {
        if self.meetings.meeting_exists(meeting_id).await? {
            return Err(SchedulerError::AlreadyFinalized {
                id: meeting_id.to_string(),
            });
        }

        let end_time = winning_time + Duration::minutes(duration_minutes);

        self.meetings
            .add_meeting(MeetingRecord {
                id: meeting_id.to_string(),
                title: title.to_string(),
                organizer_id: organizer_id.to_string(),
                start_time: winning_time,
                end_time,
                status: "scheduled".to_string(),
            })
            .await?;

        let mut all_participants = vec![organizer_id.to_string()];
        all_participants.extend(participant_ids.iter().cloned());

        for participant_id in &all_participants {
            self.calendar
                .add_event(CalendarEvent {
                    id: format!("{}_{}", meeting_id, participant_id),
                    user_id: participant_id.clone(),
                    title: title.to_string(),
                    start_time: winning_time,
                    end_time,
                    category: "scheduled_meeting".to_string(),
                    external: false,
                    importance: 5,
                    recurring: false,
                })
                .await?;
        }

        info!(
            "Finalized meeting {} for {} participants",
            meeting_id,
            all_participants.len()
        );

        Ok(FinalizedMeeting {
            meeting_id: meeting_id.to_string(),
            title: title.to_string(),
            time: winning_time,
            participants: all_participants,
            status: "finalized".to_string(),
        })
    }
}
