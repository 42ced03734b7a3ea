#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use meeting_safe::{
    CalendarEvent, CalendarStore, Coordinator, InMemoryStore, MeetingRequest, MockScoringBackend,
    Participant, SchedulerConfig, ScoringBackend,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid test timestamp")
}

/// In-memory store populated with the given participant ids.
pub async fn store_with_participants(ids: &[&str]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for id in ids {
        store
            .add_participant(Participant {
                id: id.to_string(),
                name: id.to_string(),
                email: format!("{}@example.com", id),
            })
            .await;
    }
    store
}

pub async fn add_event(
    store: &Arc<InMemoryStore>,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    category: &str,
    external: bool,
    importance: u8,
) {
    store
        .add_event(CalendarEvent {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: format!("{} event", category),
            start_time: start,
            end_time: end,
            category: category.to_string(),
            external,
            importance,
            recurring: false,
        })
        .await
        .expect("in-memory add_event cannot fail");
}

pub fn coordinator_with_backend(
    store: Arc<InMemoryStore>,
    backend: Arc<dyn ScoringBackend>,
    config: SchedulerConfig,
) -> Coordinator {
    Coordinator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        backend,
        config,
    )
}

pub fn mock_coordinator(store: Arc<InMemoryStore>) -> Coordinator {
    coordinator_with_backend(
        store,
        Arc::new(MockScoringBackend::new()),
        SchedulerConfig::default(),
    )
}

pub fn meeting_request(
    organizer: &str,
    participants: &[&str],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> MeetingRequest {
    MeetingRequest {
        id: "meeting-1".to_string(),
        title: "Quarterly planning".to_string(),
        organizer_id: organizer.to_string(),
        participant_ids: participants.iter().map(|p| p.to_string()).collect(),
        duration_minutes: 30,
        window_start,
        window_end,
        category: "internal".to_string(),
        external: false,
    }
}
