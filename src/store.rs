use crate::types::{
    CalendarEvent, DecisionRecord, MeetingRecord, Participant, PreferenceProfile, Result,
    SchedulerError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Resolves participant ids to their owners. A round must fail, not silently
/// shrink, when an id has no owner.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn get_participant(&self, user_id: &str) -> Result<Participant>;
}

/// Per-participant calendar access. Only that participant's proxy may read;
/// finalization is the only writer.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn events_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>>;

    async fn add_event(&self, event: CalendarEvent) -> Result<()>;
}

/// Append-only decision history per participant.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Most recent decisions first.
    async fn recent_decisions(&self, user_id: &str, limit: usize) -> Result<Vec<DecisionRecord>>;

    async fn record_decision(&self, record: DecisionRecord) -> Result<()>;
}

/// Durable meeting records, written by finalization only.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn meeting_exists(&self, meeting_id: &str) -> Result<bool>;

    async fn add_meeting(&self, record: MeetingRecord) -> Result<()>;
}

/// Static default preference profiles. Injected so the core never hardcodes
/// a participant set.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn default_preferences(&self, user_id: &str) -> Result<PreferenceProfile>;
}

/// Reference in-memory implementation of every store boundary. Backs the
/// demo binary and the tests; a production deployment supplies its own.
pub struct InMemoryStore {
    participants: RwLock<HashMap<String, Participant>>,
    events: RwLock<Vec<CalendarEvent>>,
    decisions: RwLock<Vec<DecisionRecord>>,
    meetings: RwLock<HashMap<String, MeetingRecord>>,
    profiles: RwLock<HashMap<String, PreferenceProfile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            participants: RwLock::new(HashMap::new()),
            events: RwLock::new(Vec::new()),
            decisions: RwLock::new(Vec::new()),
            meetings: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_participant(&self, participant: Participant) {
        let mut participants = self.participants.write().await;
        participants.insert(participant.id.clone(), participant);
    }

    pub async fn set_profile(&self, user_id: &str, profile: PreferenceProfile) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(user_id.to_string(), profile);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryStore {
    async fn get_participant(&self, user_id: &str) -> Result<Participant> {
        let participants = self.participants.read().await;
        participants
            .get(user_id)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownParticipant {
                id: user_id.to_string(),
            })
    }
}

#[async_trait]
impl CalendarStore for InMemoryStore {
    async fn events_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.user_id == user_id && e.start_time < end && e.end_time > start)
            .cloned()
            .collect())
    }

    async fn add_event(&self, event: CalendarEvent) -> Result<()> {
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }
}

#[async_trait]
impl DecisionStore for InMemoryStore {
    async fn recent_decisions(&self, user_id: &str, limit: usize) -> Result<Vec<DecisionRecord>> {
        let decisions = self.decisions.read().await;
        let mut matching: Vec<DecisionRecord> = decisions
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn record_decision(&self, record: DecisionRecord) -> Result<()> {
        info!(
            "Recording decision for user {}: {:?} on {}",
            record.user_id, record.user_action, record.meeting_category
        );
        let mut decisions = self.decisions.write().await;
        decisions.push(record);
        Ok(())
    }
}

#[async_trait]
impl MeetingStore for InMemoryStore {
    async fn meeting_exists(&self, meeting_id: &str) -> Result<bool> {
        let meetings = self.meetings.read().await;
        Ok(meetings.contains_key(meeting_id))
    }

    async fn add_meeting(&self, record: MeetingRecord) -> Result<()> {
        let mut meetings = self.meetings.write().await;
        meetings.insert(record.id.clone(), record);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn default_preferences(&self, user_id: &str) -> Result<PreferenceProfile> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user_id).cloned().unwrap_or_default())
    }
}
