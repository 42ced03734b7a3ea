use crate::backend::{MeetingMetadata, ScoringBackend, ScoringRequest};
use crate::config::SchedulerConfig;
use crate::preferences::{derive_preferences, LearnedPreferences};
use crate::slot_id::canonical_time;
use crate::store::{CalendarStore, DecisionStore, DirectoryStore, ProfileStore};
use crate::types::{
    CalendarEvent, ConflictSummary, DecisionRecord, Participant, Result, SchedulerError,
    SlotDescriptor, SlotStatus, UserAction, UtilityResponse,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Acts on behalf of a single participant. Owns exclusive read access to
/// that participant's calendar and decision history; the coordinator only
/// ever sees the token-keyed utilities this proxy emits.
pub struct ParticipantProxy {
    participant: Participant,
    calendar: Arc<dyn CalendarStore>,
    decisions: Arc<dyn DecisionStore>,
    profiles: Arc<dyn ProfileStore>,
    backend: Arc<dyn ScoringBackend>,
    config: SchedulerConfig,
}

impl ParticipantProxy {
    /// Resolve the participant and bind the proxy to their private data.
    /// Fails with `UnknownParticipant` when the directory has no owner for
    /// the id; a round must never silently exclude a participant.
    pub async fn new(
        user_id: &str,
        directory: Arc<dyn DirectoryStore>,
        calendar: Arc<dyn CalendarStore>,
        decisions: Arc<dyn DecisionStore>,
        profiles: Arc<dyn ProfileStore>,
        backend: Arc<dyn ScoringBackend>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        let participant = directory.get_participant(user_id).await?;
        Ok(Self {
            participant,
            calendar,
            decisions,
            profiles,
            backend,
            config,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.participant.id
    }

    /// Calendar events in a range, read-only.
    pub async fn get_calendar(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        self.calendar
            .events_between(&self.participant.id, start, end)
            .await
    }

    /// Append one immutable decision record for future preference learning.
    pub async fn record_decision(
        &self,
        meeting_category: String,
        conflicting_category: Option<String>,
        recommended_action: String,
        user_action: UserAction,
        notes: Option<String>,
    ) -> Result<()> {
        let record = DecisionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: self.participant.id.clone(),
            timestamp: Utc::now(),
            meeting_category,
            conflicting_category,
            recommended_action,
            user_action,
            notes,
        };
        self.decisions.record_decision(record).await
    }

    /// Read-only explainability capability: the same derivation the live
    /// scoring path uses, exposed for preference UIs.
    pub async fn derive_preferences(&self) -> Result<LearnedPreferences> {
        let history = self
            .decisions
            .recent_decisions(&self.participant.id, self.config.preference_history_limit)
            .await?;
        let defaults = self
            .profiles
            .default_preferences(&self.participant.id)
            .await?;
        Ok(derive_preferences(
            &history,
            &defaults,
            self.config.preference_history_limit,
        ))
    }

    /// Score every candidate slot privately and decide whether to escalate.
    /// The coordinator hands over the full token→time map; nothing but
    /// token-keyed scores goes back.
    pub async fn score_slots(
        &self,
        meeting: &MeetingMetadata,
        token_to_time: &HashMap<String, DateTime<Utc>>,
        duration_minutes: i64,
    ) -> Result<UtilityResponse> {
        debug!(
            "Proxy for {} scoring {} slots",
            self.participant.id,
            token_to_time.len()
        );

        // Stable slot order for the backend: chronological.
        let mut pairs: Vec<(&String, &DateTime<Utc>)> = token_to_time.iter().collect();
        pairs.sort_by_key(|(_, time)| **time);

        let mut slots = Vec::with_capacity(pairs.len());
        for (token, time) in &pairs {
            let conflict = self.conflict_at(**time, duration_minutes).await?;
            slots.push(SlotDescriptor {
                token: (*token).clone(),
                time: **time,
                status: if conflict.is_some() {
                    SlotStatus::Conflict
                } else {
                    SlotStatus::Free
                },
                conflict_event: conflict,
            });
        }

        let decisions = self
            .decisions
            .recent_decisions(&self.participant.id, self.config.scoring_history_limit)
            .await?;
        let defaults = self
            .profiles
            .default_preferences(&self.participant.id)
            .await?;
        let learned = derive_preferences(
            &decisions,
            &defaults,
            self.config.preference_history_limit,
        );

        let request = ScoringRequest {
            user_id: self.participant.id.clone(),
            user_name: self.participant.name.clone(),
            meeting: meeting.clone(),
            slots,
            decisions,
            learned,
        };

        let (response, contract_violation) = match self.backend.score(&request).await {
            Ok(response) => (response, None),
            // A malformed backend response degrades this participant, not
            // the whole round. The empty utility map escalates below.
            Err(SchedulerError::BackendContract(msg)) => {
                warn!(
                    "Backend contract violation for user {}: {}",
                    self.participant.id, msg
                );
                (
                    crate::backend::ScoringResponse {
                        utilities: HashMap::new(),
                        reasoning: None,
                        slot_breakdown: Vec::new(),
                        preferences_applied: Vec::new(),
                    },
                    Some(msg),
                )
            }
            Err(e) => return Err(e),
        };

        // The backend may key utilities by token or by canonical time
        // string. Rewrite time keys back to tokens; anything else passes
        // through unchanged and gets flagged.
        let time_to_token: HashMap<String, String> = token_to_time
            .iter()
            .map(|(token, time)| (canonical_time(*time), token.clone()))
            .collect();

        let mut utilities = HashMap::new();
        let mut unresolved_keys = Vec::new();
        for (key, score) in response.utilities {
            if token_to_time.contains_key(&key) {
                utilities.insert(key, score);
            } else if let Some(token) = time_to_token.get(&key) {
                utilities.insert(token.clone(), score);
            } else {
                warn!(
                    "Unresolvable utility key from backend for user {}: {}",
                    self.participant.id, key
                );
                unresolved_keys.push(key.clone());
                utilities.insert(key, score);
            }
        }

        // Same normalization for the breakdown's slot ids.
        let mut slot_breakdown = response.slot_breakdown;
        for entry in &mut slot_breakdown {
            if let Some(token) = time_to_token.get(&entry.slot_id) {
                entry.slot_id = token.clone();
            }
            if entry.time.is_empty() {
                if let Some(time) = token_to_time.get(&entry.slot_id) {
                    entry.time = canonical_time(*time);
                }
            }
        }

        let (escalate, escalation_reason) = self.should_escalate(&utilities);
        if escalate {
            info!(
                "Participant {} escalating: {}",
                self.participant.id,
                escalation_reason.as_deref().unwrap_or("unknown")
            );
        }

        Ok(UtilityResponse {
            user_id: self.participant.id.clone(),
            utilities,
            escalate,
            escalation_reason,
            reasoning: response.reasoning,
            slot_breakdown,
            preferences_applied: response.preferences_applied,
            unresolved_keys,
            contract_violation,
        })
    }

    /// The single most important event overlapping [time, time+duration),
    /// if any, represents the conflict.
    async fn conflict_at(
        &self,
        time: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<Option<ConflictSummary>> {
        let end = time + Duration::minutes(duration_minutes);
        let overlapping = self
            .calendar
            .events_between(&self.participant.id, time, end)
            .await?;

        Ok(overlapping
            .into_iter()
            .max_by_key(|event| event.importance)
            .map(|event| ConflictSummary {
                title: event.title,
                category: event.category,
                importance: event.importance,
                external: event.external,
            }))
    }

    /// The three escalation checks, evaluated in priority order; only the
    /// first true condition's reason is reported.
    fn should_escalate(&self, utilities: &HashMap<String, u8>) -> (bool, Option<String>) {
        let mut scores: Vec<u8> = utilities.values().copied().collect();
        if scores.is_empty() {
            return (true, Some("no candidate slots".to_string()));
        }

        scores.sort_unstable_by(|a, b| b.cmp(a));
        let max_score = scores[0];

        if max_score < self.config.escalation_floor {
            return (
                true,
                Some(format!("scores too low (max: {})", max_score)),
            );
        }

        // Compare distinct score values: several slots sharing the top
        // score is a clear winner by tie-break, not a close call.
        scores.dedup();
        if scores.len() >= 2 && scores[0] - scores[1] < self.config.escalation_margin {
            return (
                true,
                Some(format!(
                    "too close to call (top scores: {}, {})",
                    scores[0], scores[1]
                )),
            );
        }

        (false, None)
    }
}
