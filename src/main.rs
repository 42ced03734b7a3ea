use chrono::{Duration, Utc};
use clap::Parser;
use meeting_safe::{
    backend_from_config, CalendarEvent, CalendarStore, Coordinator, FinalizationStep,
    InMemoryStore, MeetingRequest, Participant, PreferenceProfile, RoundStatus, SchedulerConfig,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Demo driver: wires an in-memory store with a couple of participants and
/// runs one privacy-preserving scheduling round end to end.
#[derive(Parser, Debug)]
#[command(name = "meeting-safe")]
struct Args {
    /// Meeting duration in minutes
    #[arg(long, default_value_t = 30)]
    duration: i64,

    /// Scheduling window length in hours, starting tomorrow 9 AM UTC
    #[arg(long, default_value_t = 8)]
    window_hours: i64,

    /// Finalize automatically when no participant escalates
    #[arg(long, default_value_t = false)]
    finalize: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = SchedulerConfig::from_env();
    let backend = backend_from_config(&config);

    let store = Arc::new(InMemoryStore::new());
    seed_demo_participants(&store).await;

    let coordinator = Coordinator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        backend,
        config,
    );

    let tomorrow_nine = (Utc::now() + Duration::days(1))
        .date_naive()
        .and_hms_opt(9, 0, 0)
        .expect("valid time")
        .and_utc();

    let request = MeetingRequest {
        id: Uuid::new_v4().to_string(),
        title: "Product sync".to_string(),
        organizer_id: "alice".to_string(),
        participant_ids: vec!["bob".to_string()],
        duration_minutes: args.duration,
        window_start: tomorrow_nine,
        window_end: tomorrow_nine + Duration::hours(args.window_hours),
        category: "internal".to_string(),
        external: false,
    };

    let result = coordinator.coordinate(&request).await?;

    info!("Coordinator saw {} opaque tokens", result.coordinator_view.slot_tokens.len());
    info!(
        "Winning token: {} (score {:.1})",
        result.coordinator_view.winning_token, result.coordinator_view.winning_score
    );
    info!("Initiator resolves winner to: {}", result.initiator_view.winning_time);
    for option in &result.initiator_view.top_options {
        info!("  option {} at {} (score {:.1})", option.token, option.time, option.score);
    }
    for escalation in &result.escalations {
        warn!("Escalation from {}: {}", escalation.user_id, escalation.reason);
    }
    for diagnostic in &result.diagnostics {
        warn!("Diagnostic: {}", diagnostic);
    }

    if args.finalize {
        if result.status == RoundStatus::Scheduled {
            let finalizer = FinalizationStep::new(store.clone(), store.clone());
            let finalized = finalizer
                .finalize_meeting(
                    &request.id,
                    result.initiator_view.winning_time,
                    &request.title,
                    &request.organizer_id,
                    &request.participant_ids,
                    request.duration_minutes,
                )
                .await?;
            info!(
                "Finalized meeting {} at {} for {:?}",
                finalized.meeting_id, finalized.time, finalized.participants
            );
        } else {
            warn!("Round needs human confirmation; skipping finalization");
        }
    }

    Ok(())
}

async fn seed_demo_participants(store: &Arc<InMemoryStore>) {
    store
        .add_participant(Participant {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        })
        .await;
    store
        .add_participant(Participant {
            id: "bob".to_string(),
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
        })
        .await;

    store
        .set_profile(
            "alice",
            PreferenceProfile {
                protected_categories: vec!["customer_call".to_string()],
                tolerant_categories: vec!["team_sync".to_string()],
                preferred_times_of_day: vec!["morning".to_string()],
            },
        )
        .await;

    // Bob has one immovable external call tomorrow morning.
    let tomorrow_ten = (Utc::now() + Duration::days(1))
        .date_naive()
        .and_hms_opt(10, 0, 0)
        .expect("valid time")
        .and_utc();
    if let Err(e) = store
        .add_event(CalendarEvent {
            id: Uuid::new_v4().to_string(),
            user_id: "bob".to_string(),
            title: "Customer onboarding".to_string(),
            start_time: tomorrow_ten,
            end_time: tomorrow_ten + Duration::hours(1),
            category: "customer_call".to_string(),
            external: true,
            importance: 9,
            recurring: false,
        })
        .await
    {
        warn!("Failed to seed demo event: {}", e);
    }
}
