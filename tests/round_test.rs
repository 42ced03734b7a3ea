mod common;

use async_trait::async_trait;
use common::{
    add_event, coordinator_with_backend, meeting_request, mock_coordinator,
    store_with_participants, ts,
};
use meeting_safe::slot_id::{canonical_time, identify};
use meeting_safe::{
    DecisionRecord, DecisionStore, MockScoringBackend, ParticipantProxy, PreferenceProfile,
    Result, RoundStatus, SchedulerConfig, SchedulerError, ScoringBackend, ScoringRequest,
    ScoringResponse, UserAction,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

async fn proxy_for(
    store: Arc<meeting_safe::InMemoryStore>,
    user_id: &str,
    backend: Arc<dyn ScoringBackend>,
) -> ParticipantProxy {
    ParticipantProxy::new(
        user_id,
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        backend,
        SchedulerConfig::default(),
    )
    .await
    .expect("participant must resolve")
}

#[tokio::test]
async fn scenario_a_all_free_picks_first_morning_slot() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice", "bob"]).await;
    let coordinator = mock_coordinator(store);

    let request = meeting_request(
        "alice",
        &["bob"],
        ts(2026, 1, 16, 9, 0),
        ts(2026, 1, 16, 17, 0),
    );
    let result = coordinator.coordinate(&request).await?;

    // Everyone is free, so the 9-11 AM bonus decides and the earliest
    // morning slot wins the tie.
    let first_morning = identify(&request.id, ts(2026, 1, 16, 9, 0));
    assert_eq!(result.coordinator_view.winning_token, first_morning);
    assert_eq!(result.initiator_view.winning_time, ts(2026, 1, 16, 9, 0));
    assert_eq!(result.status, RoundStatus::Scheduled);
    assert!(result.escalations.is_empty(), "no participant should escalate");

    info!(
        "Scenario A winner {} score {:.1}",
        result.coordinator_view.winning_token, result.coordinator_view.winning_score
    );
    Ok(())
}

#[tokio::test]
async fn scenario_b_external_conflicts_score_zero_and_escalate() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice", "bob"]).await;
    // Bob is booked solid with an external customer engagement.
    add_event(
        &store,
        "bob",
        ts(2026, 1, 16, 9, 0),
        ts(2026, 1, 16, 12, 0),
        "customer_call",
        true,
        9,
    )
    .await;
    let coordinator = mock_coordinator(store);

    let request = meeting_request(
        "alice",
        &["bob"],
        ts(2026, 1, 16, 9, 0),
        ts(2026, 1, 16, 12, 0),
    );
    let result = coordinator.coordinate(&request).await?;

    let bob = result
        .coordinator_view
        .participant_utilities
        .iter()
        .find(|u| u.user_id == "bob")
        .expect("bob scored");
    assert!(
        bob.utilities.values().all(|&score| score == 0),
        "external conflicts are never displaced"
    );

    assert_eq!(result.status, RoundStatus::EscalationNeeded);
    let escalation = result
        .escalations
        .iter()
        .find(|e| e.user_id == "bob")
        .expect("bob escalates");
    assert!(
        escalation.reason.starts_with("scores too low"),
        "unexpected reason: {}",
        escalation.reason
    );

    // The round still resolves to the organizer-favored best slot.
    assert_eq!(result.initiator_view.winning_time, ts(2026, 1, 16, 9, 0));
    Ok(())
}

#[tokio::test]
async fn scenario_c_learned_protection_scores_five() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["carol"]).await;
    store
        .record_decision(DecisionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: "carol".to_string(),
            timestamp: ts(2026, 1, 10, 12, 0),
            meeting_category: "internal".to_string(),
            conflicting_category: Some("board_meeting".to_string()),
            recommended_action: "reschedule_existing".to_string(),
            user_action: UserAction::Rejected,
            notes: None,
        })
        .await?;
    // Internal, medium importance: would score 30 without the learned
    // protection.
    add_event(
        &store,
        "carol",
        ts(2026, 1, 16, 9, 0),
        ts(2026, 1, 16, 10, 0),
        "board_meeting",
        false,
        6,
    )
    .await;

    let proxy = proxy_for(store, "carol", Arc::new(MockScoringBackend::new())).await;
    let request = meeting_request("carol", &[], ts(2026, 1, 16, 9, 0), ts(2026, 1, 16, 17, 0));
    let (_, map) = meeting_safe::slot_id::identify_all(
        &request.id,
        &[ts(2026, 1, 16, 9, 0), ts(2026, 1, 16, 14, 0)],
    );
    let meeting = meeting_safe::MeetingMetadata {
        title: request.title.clone(),
        organizer_id: request.organizer_id.clone(),
        category: request.category.clone(),
        external: request.external,
        duration_minutes: request.duration_minutes,
    };

    let response = proxy.score_slots(&meeting, &map, 30).await?;

    let conflicted = identify(&request.id, ts(2026, 1, 16, 9, 0));
    assert_eq!(response.utilities[&conflicted], 5);

    let applied = response
        .preferences_applied
        .iter()
        .find(|p| p.preference == "protect_board_meeting")
        .expect("rationale must cite the learned protection");
    assert!(applied.source.contains("rejected"));

    let breakdown = response
        .slot_breakdown
        .iter()
        .find(|b| b.slot_id == conflicted)
        .expect("breakdown entry for conflicted slot");
    assert_eq!(breakdown.decision, "PROTECT");
    Ok(())
}

#[tokio::test]
async fn aggregation_is_commutative_in_participant_order() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice", "bob", "carol"]).await;
    add_event(
        &store,
        "bob",
        ts(2026, 1, 16, 10, 0),
        ts(2026, 1, 16, 11, 0),
        "team_sync",
        false,
        3,
    )
    .await;
    let coordinator = mock_coordinator(store);

    let mut forward = meeting_request(
        "carol",
        &["alice", "bob"],
        ts(2026, 1, 16, 9, 0),
        ts(2026, 1, 16, 17, 0),
    );
    let mut reversed = forward.clone();
    reversed.participant_ids.reverse();
    // Same meeting id: identical tokens either way.
    forward.id = "order-test".to_string();
    reversed.id = "order-test".to_string();

    let a = coordinator.coordinate(&forward).await?;
    let b = coordinator.coordinate(&reversed).await?;

    assert_eq!(
        a.coordinator_view.winning_token,
        b.coordinator_view.winning_token
    );
    assert_eq!(
        a.coordinator_view.aggregated_scores,
        b.coordinator_view.aggregated_scores
    );
    Ok(())
}

#[tokio::test]
async fn organizer_counts_exactly_twice_a_participant() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice", "bob"]).await;
    let coordinator = mock_coordinator(store);

    let request = meeting_request(
        "alice",
        &["bob"],
        ts(2026, 1, 16, 9, 0),
        ts(2026, 1, 16, 17, 0),
    );
    let result = coordinator.coordinate(&request).await?;

    // Both score the winning morning slot 90; organizer at 3.0 and
    // participant at 1.5 puts the weighted sum at 90 * 4.5.
    assert_eq!(result.coordinator_view.winning_score, 405.0);

    let alice_share = 90.0 * 3.0;
    let bob_share = 90.0 * 1.5;
    assert_eq!(alice_share, 2.0 * bob_share);
    Ok(())
}

#[tokio::test]
async fn tie_break_resolves_to_earliest_enumerated_slot() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice", "bob"]).await;
    let coordinator = mock_coordinator(store);

    // Afternoon-only window: every slot scores a flat 80 for everyone.
    let request = meeting_request(
        "alice",
        &["bob"],
        ts(2026, 1, 16, 14, 0),
        ts(2026, 1, 16, 15, 30),
    );

    let expected = identify(&request.id, ts(2026, 1, 16, 14, 0));
    for _ in 0..3 {
        let result = coordinator.coordinate(&request).await?;
        assert_eq!(
            result.coordinator_view.winning_token, expected,
            "equal scores must resolve to the earliest slot, reproducibly"
        );
    }
    Ok(())
}

/// Backend that never returns any utilities.
struct EmptyBackend;

#[async_trait]
impl ScoringBackend for EmptyBackend {
    fn backend_name(&self) -> String {
        "empty".to_string()
    }

    async fn score(&self, _request: &ScoringRequest) -> Result<ScoringResponse> {
        Ok(ScoringResponse {
            utilities: HashMap::new(),
            reasoning: None,
            slot_breakdown: Vec::new(),
            preferences_applied: Vec::new(),
        })
    }
}

#[tokio::test]
async fn empty_utility_map_escalates_with_no_candidate_slots() -> Result<()> {
    init_tracing();

    // An empty map also has max < floor; the empty-map reason must win the
    // priority order.
    let store = store_with_participants(&["alice"]).await;
    let proxy = proxy_for(store.clone(), "alice", Arc::new(EmptyBackend)).await;

    let (_, map) =
        meeting_safe::slot_id::identify_all("meeting-1", &[ts(2026, 1, 16, 9, 0)]);
    let meeting = meeting_safe::MeetingMetadata {
        title: "Sync".to_string(),
        organizer_id: "alice".to_string(),
        category: "internal".to_string(),
        external: false,
        duration_minutes: 30,
    };
    let response = proxy.score_slots(&meeting, &map, 30).await?;

    assert!(response.escalate);
    assert_eq!(
        response.escalation_reason.as_deref(),
        Some("no candidate slots")
    );

    // The round still returns a structured result: all tokens aggregate to
    // zero and the earliest slot stands as the winner candidate.
    let coordinator = coordinator_with_backend(
        store,
        Arc::new(EmptyBackend),
        SchedulerConfig::default(),
    );
    let request = meeting_request("alice", &[], ts(2026, 1, 16, 9, 0), ts(2026, 1, 16, 11, 0));
    let result = coordinator.coordinate(&request).await?;
    assert_eq!(result.status, RoundStatus::EscalationNeeded);
    assert_eq!(result.coordinator_view.winning_score, 0.0);
    Ok(())
}

/// Backend that keys utilities by time string instead of token, plus one
/// key that resolves to nothing.
struct TimeKeyedBackend;

#[async_trait]
impl ScoringBackend for TimeKeyedBackend {
    fn backend_name(&self) -> String {
        "time-keyed".to_string()
    }

    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResponse> {
        let mut utilities = HashMap::new();
        for slot in &request.slots {
            utilities.insert(canonical_time(slot.time), 75);
        }
        utilities.insert("not-a-token-or-time".to_string(), 99);
        Ok(ScoringResponse {
            utilities,
            reasoning: None,
            slot_breakdown: Vec::new(),
            preferences_applied: Vec::new(),
        })
    }
}

#[tokio::test]
async fn time_keyed_utilities_are_rewritten_to_tokens() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice"]).await;
    let proxy = proxy_for(store.clone(), "alice", Arc::new(TimeKeyedBackend)).await;

    let times = [ts(2026, 1, 16, 9, 0), ts(2026, 1, 16, 10, 0)];
    let (tokens, map) = meeting_safe::slot_id::identify_all("meeting-1", &times);
    let meeting = meeting_safe::MeetingMetadata {
        title: "Sync".to_string(),
        organizer_id: "alice".to_string(),
        category: "internal".to_string(),
        external: false,
        duration_minutes: 30,
    };
    let response = proxy.score_slots(&meeting, &map, 30).await?;

    for token in &tokens {
        assert_eq!(
            response.utilities.get(token),
            Some(&75),
            "time-string keys must be rewritten to tokens"
        );
    }
    assert_eq!(
        response.unresolved_keys,
        vec!["not-a-token-or-time".to_string()],
        "unresolvable keys are flagged, not dropped"
    );
    assert_eq!(response.utilities.get("not-a-token-or-time"), Some(&99));

    // And the coordinator surfaces the flag in round diagnostics.
    let coordinator = coordinator_with_backend(
        store,
        Arc::new(TimeKeyedBackend),
        SchedulerConfig::default(),
    );
    let request = meeting_request("alice", &[], ts(2026, 1, 16, 9, 0), ts(2026, 1, 16, 11, 0));
    let result = coordinator.coordinate(&request).await?;
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.contains("unresolved utility key")));
    Ok(())
}

/// Backend whose response violates the output contract.
struct BrokenBackend;

#[async_trait]
impl ScoringBackend for BrokenBackend {
    fn backend_name(&self) -> String {
        "broken".to_string()
    }

    async fn score(&self, _request: &ScoringRequest) -> Result<ScoringResponse> {
        Err(SchedulerError::BackendContract(
            "unparseable scoring response".to_string(),
        ))
    }
}

#[tokio::test]
async fn contract_violation_is_recovered_and_reported() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice", "bob"]).await;
    let coordinator =
        coordinator_with_backend(store, Arc::new(BrokenBackend), SchedulerConfig::default());

    let request = meeting_request(
        "alice",
        &["bob"],
        ts(2026, 1, 16, 9, 0),
        ts(2026, 1, 16, 11, 0),
    );
    let result = coordinator.coordinate(&request).await?;

    assert_eq!(result.status, RoundStatus::EscalationNeeded);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.contains("backend contract violation")));
    Ok(())
}

/// Backend that stalls longer than the configured deadline.
struct SlowBackend;

#[async_trait]
impl ScoringBackend for SlowBackend {
    fn backend_name(&self) -> String {
        "slow".to_string()
    }

    async fn score(&self, _request: &ScoringRequest) -> Result<ScoringResponse> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(ScoringResponse {
            utilities: HashMap::new(),
            reasoning: None,
            slot_breakdown: Vec::new(),
            preferences_applied: Vec::new(),
        })
    }
}

#[tokio::test]
async fn participant_timeout_forces_escalation() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice"]).await;
    let mut config = SchedulerConfig::default();
    config.participant_timeout = Some(Duration::from_millis(50));
    let coordinator = coordinator_with_backend(store, Arc::new(SlowBackend), config);

    let request = meeting_request("alice", &[], ts(2026, 1, 16, 9, 0), ts(2026, 1, 16, 11, 0));
    let result = coordinator.coordinate(&request).await?;

    assert_eq!(result.status, RoundStatus::EscalationNeeded);
    assert!(result
        .escalations
        .iter()
        .any(|e| e.reason == "scoring timed out"));
    Ok(())
}

#[tokio::test]
async fn unknown_participant_fails_the_round() {
    init_tracing();

    let store = store_with_participants(&["alice"]).await;
    let coordinator = mock_coordinator(store);

    let request = meeting_request(
        "alice",
        &["nobody"],
        ts(2026, 1, 16, 9, 0),
        ts(2026, 1, 16, 17, 0),
    );
    let err = coordinator
        .coordinate(&request)
        .await
        .expect_err("unresolvable participant must fail the round");
    assert!(matches!(err, SchedulerError::UnknownParticipant { .. }));
}

#[tokio::test]
async fn window_outside_business_hours_yields_no_slots() {
    init_tracing();

    let store = store_with_participants(&["alice"]).await;
    let coordinator = mock_coordinator(store);

    let request = meeting_request("alice", &[], ts(2026, 1, 16, 18, 0), ts(2026, 1, 16, 20, 0));
    let err = coordinator
        .coordinate(&request)
        .await
        .expect_err("evening-only window has no candidate slots");
    assert!(matches!(err, SchedulerError::NoAvailableSlots));
}

#[tokio::test]
async fn top_options_are_ranked_and_truncated() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice", "bob"]).await;
    let coordinator = mock_coordinator(store);

    let request = meeting_request(
        "alice",
        &["bob"],
        ts(2026, 1, 16, 9, 0),
        ts(2026, 1, 16, 17, 0),
    );
    let result = coordinator.coordinate(&request).await?;

    let options = &result.initiator_view.top_options;
    assert_eq!(options.len(), 3);
    assert_eq!(options[0].token, result.coordinator_view.winning_token);
    for pair in options.windows(2) {
        assert!(pair[0].score >= pair[1].score, "options must rank descending");
    }
    Ok(())
}

#[tokio::test]
async fn derived_preferences_learn_and_fall_back() -> Result<()> {
    init_tracing();

    let store = store_with_participants(&["alice", "bob"]).await;
    store
        .set_profile(
            "bob",
            PreferenceProfile {
                protected_categories: vec!["focus_time".to_string()],
                tolerant_categories: vec!["standup".to_string()],
                preferred_times_of_day: vec!["morning".to_string()],
            },
        )
        .await;
    store
        .record_decision(DecisionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: "alice".to_string(),
            timestamp: ts(2026, 1, 10, 12, 0),
            meeting_category: "internal".to_string(),
            conflicting_category: Some("team_sync".to_string()),
            recommended_action: "reschedule_existing".to_string(),
            user_action: UserAction::Accepted,
            notes: Some("fine to move".to_string()),
        })
        .await?;

    let alice = proxy_for(store.clone(), "alice", Arc::new(MockScoringBackend::new())).await;
    let learned = alice.derive_preferences().await?;
    assert!(learned.tolerant_categories.contains(&"team_sync".to_string()));

    // No history for bob: the static profile answers instead.
    let bob = proxy_for(store, "bob", Arc::new(MockScoringBackend::new())).await;
    let learned = bob.derive_preferences().await?;
    assert_eq!(learned.protected_categories, vec!["focus_time".to_string()]);
    assert_eq!(learned.preferred_times_of_day, vec!["morning".to_string()]);
    Ok(())
}
