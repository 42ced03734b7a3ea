use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A participant known to the directory. Proxies are only constructed for
/// resolvable participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A calendar event owned by exactly one participant. The coordinator never
/// sees these; only the participant's own proxy reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category: String, // e.g. "customer_call", "focus_time", "team_sync"
    pub external: bool,
    pub importance: u8, // 1-10
    pub recurring: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub id: String,
    pub title: String,
    pub organizer_id: String,
    pub participant_ids: Vec<String>,
    pub duration_minutes: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub category: String,
    pub external: bool,
}

/// What the user actually did with a scheduling recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAction {
    Accepted,
    Rejected,
    Modified,
}

/// One append-only entry of a participant's decision history. This is the
/// raw material preference learning works from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub meeting_category: String,
    pub conflicting_category: Option<String>,
    pub recommended_action: String, // "schedule", "reschedule_existing"
    pub user_action: UserAction,
    pub notes: Option<String>,
}

/// Static per-participant defaults, consulted when decision history is empty.
/// Injected through the profile store so the core stays participant-set-agnostic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub protected_categories: Vec<String>,
    pub tolerant_categories: Vec<String>,
    pub preferred_times_of_day: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlotStatus {
    Free,
    Conflict,
}

/// The conflicting event as the scoring backend is allowed to see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub title: String,
    pub category: String,
    pub importance: u8,
    pub external: bool,
}

/// One candidate slot as presented to a scoring backend: opaque token plus
/// the participant-private availability verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub token: String,
    pub time: DateTime<Utc>,
    pub status: SlotStatus,
    pub conflict_event: Option<ConflictSummary>,
}

/// A single scoring factor inside a slot breakdown, for explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub kind: String,
    pub value: i32,
    pub reason: String,
}

/// Per-slot explanation of how a backend arrived at a score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotBreakdown {
    pub slot_id: String,
    pub time: String,
    pub score: u8,
    pub status: SlotStatus,
    pub conflict: Option<ConflictSummary>,
    pub factors: Vec<ScoreFactor>,
    pub decision: String, // "AVAILABLE", "PROTECT", "WILLING_TO_RESCHEDULE", "RELUCTANT"
    pub decision_reason: String,
}

/// A learned preference the backend applied while scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceApplied {
    pub preference: String,
    pub effect: String,
    pub source: String,
}

/// What one participant proxy hands back to the coordinator: utilities keyed
/// by slot token, an escalation verdict, and structured rationale. No times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilityResponse {
    pub user_id: String,
    pub utilities: HashMap<String, u8>,
    pub escalate: bool,
    pub escalation_reason: Option<String>,
    pub reasoning: Option<String>,
    pub slot_breakdown: Vec<SlotBreakdown>,
    pub preferences_applied: Vec<PreferenceApplied>,
    /// Backend keys that were neither a known token nor a known time.
    /// Passed through unchanged, flagged here rather than dropped.
    pub unresolved_keys: Vec<String>,
    /// Set when a backend contract violation was recovered locally instead
    /// of failing the round. Surfaces in the round diagnostics.
    pub contract_violation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Scheduled,
    EscalationNeeded,
}

/// One ranked alternative in the initiator view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedOption {
    pub token: String,
    pub score: f64,
    pub time: DateTime<Utc>,
}

/// Everything the coordinator is allowed to retain about a round: tokens and
/// numbers only, never times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorView {
    pub slot_tokens: Vec<String>,
    pub participant_utilities: Vec<UtilityResponse>,
    pub aggregated_scores: HashMap<String, f64>,
    pub winning_token: String,
    pub winning_score: f64,
}

/// The view only the round initiator receives; it carries the token→time map
/// needed to dereference the winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatorView {
    pub token_to_time: HashMap<String, DateTime<Utc>>,
    pub winning_time: DateTime<Utc>,
    pub top_options: Vec<RankedOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationNotice {
    pub user_id: String,
    pub reason: String,
}

/// The two-view outcome of one scheduling round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    pub meeting_id: String,
    pub status: RoundStatus,
    pub coordinator_view: CoordinatorView,
    pub initiator_view: InitiatorView,
    pub escalations: Vec<EscalationNotice>,
    /// Recoverable anomalies observed during the round (unresolved backend
    /// keys, contract violations, timeouts). Never empty silently.
    pub diagnostics: Vec<String>,
}

/// Durable meeting record written by finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: String,
    pub title: String,
    pub organizer_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
}

/// Confirmation returned to the initiator after finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedMeeting {
    pub meeting_id: String,
    pub title: String,
    pub time: DateTime<Utc>,
    pub participants: Vec<String>,
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("no valid time slots in window")]
    NoAvailableSlots,

    #[error("unknown participant: {id}")]
    UnknownParticipant { id: String },

    #[error("scoring backend contract violation: {0}")]
    BackendContract(String),

    #[error("meeting already finalized: {id}")]
    AlreadyFinalized { id: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("general error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
