use crate::backend::{MeetingMetadata, ScoringBackend};
use crate::config::SchedulerConfig;
use crate::proxy::ParticipantProxy;
use crate::slot_id;
use crate::store::{CalendarStore, DecisionStore, DirectoryStore, ProfileStore};
use crate::types::{
    CoordinatorView, EscalationNotice, InitiatorView, MeetingRequest, RankedOption, Result,
    RoundResult, RoundStatus, SchedulerError, UtilityResponse,
};
use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates one scheduling round. The coordinator works exclusively in
/// opaque slot tokens and numeric scores: the token→time map passes through
/// on its way to the proxies and the initiator view, and is never logged or
/// retained here.
pub struct Coordinator {
    directory: Arc<dyn DirectoryStore>,
    calendar: Arc<dyn CalendarStore>,
    decisions: Arc<dyn DecisionStore>,
    profiles: Arc<dyn ProfileStore>,
    backend: Arc<dyn ScoringBackend>,
    config: SchedulerConfig,
}

impl Coordinator {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        calendar: Arc<dyn CalendarStore>,
        decisions: Arc<dyn DecisionStore>,
        profiles: Arc<dyn ProfileStore>,
        backend: Arc<dyn ScoringBackend>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            directory,
            calendar,
            decisions,
            profiles,
            backend,
            config,
        }
    }

    /// Enumerate every candidate slot origin: fixed stride through the
    /// window, kept only if the meeting still fits and the hour falls in
    /// the allowed band.
    pub fn generate_time_slots(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Vec<DateTime<Utc>> {
        let (band_start, band_end) = self.config.business_hours;
        let stride = Duration::minutes(self.config.slot_interval_minutes);
        let duration = Duration::minutes(duration_minutes);

        let mut slots = Vec::new();
        let mut current = window_start;
        while current + duration <= window_end {
            let hour = current.hour();
            if hour >= band_start && hour < band_end {
                slots.push(current);
            }
            current += stride;
        }
        slots
    }

    /// Run one full round: enumerate, tokenize, fan out to every
    /// participant's proxy, aggregate, select a winner, and assemble the
    /// two trust-partitioned views. Terminal on first pass; business
    /// outcomes (low scores, escalation) are results, never errors.
    pub async fn coordinate(&self, request: &MeetingRequest) -> Result<RoundResult> {
        let times = self.generate_time_slots(
            request.window_start,
            request.window_end,
            request.duration_minutes,
        );
        if times.is_empty() {
            return Err(SchedulerError::NoAvailableSlots);
        }

        let (slot_tokens, token_to_time) = slot_id::identify_all(&request.id, &times);
        info!(
            "Coordinating meeting {}: {} candidate slots, {} participants",
            request.id,
            slot_tokens.len(),
            request.participant_ids.len() + 1
        );

        let responses = self.fan_out(request, &token_to_time).await?;

        let aggregated = self.aggregate(&responses, &request.organizer_id, &slot_tokens);

        // Winner selection is restricted to tokens the round actually
        // enumerated; an unresolved passthrough key can never win because
        // it cannot be dereferenced to a time.
        let position: HashMap<&String, usize> = slot_tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (token, i))
            .collect();
        let mut ranked: Vec<(&String, f64)> = aggregated
            .iter()
            .filter(|(token, _)| position.contains_key(token))
            .map(|(token, score)| (token, *score))
            .collect();
        // Strict score descending; exact ties go to the earlier-enumerated
        // slot so repeated runs resolve identically.
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| position[a.0].cmp(&position[b.0]))
        });

        let (winning_token, winning_score) = ranked
            .first()
            .map(|(token, score)| ((*token).clone(), *score))
            .ok_or(SchedulerError::NoAvailableSlots)?;

        let top_options: Vec<RankedOption> = ranked
            .iter()
            .take(self.config.top_option_count)
            .map(|(token, score)| RankedOption {
                token: (*token).clone(),
                score: *score,
                time: token_to_time[*token],
            })
            .collect();

        // Round escalates iff any participant escalated: the union, not a vote.
        let escalations: Vec<EscalationNotice> = responses
            .iter()
            .filter(|r| r.escalate)
            .map(|r| EscalationNotice {
                user_id: r.user_id.clone(),
                reason: r
                    .escalation_reason
                    .clone()
                    .unwrap_or_else(|| "unspecified".to_string()),
            })
            .collect();
        let status = if escalations.is_empty() {
            RoundStatus::Scheduled
        } else {
            RoundStatus::EscalationNeeded
        };

        let mut diagnostics = Vec::new();
        for response in &responses {
            for key in &response.unresolved_keys {
                diagnostics.push(format!(
                    "unresolved utility key from participant {}: {}",
                    response.user_id, key
                ));
            }
            if let Some(violation) = &response.contract_violation {
                diagnostics.push(format!(
                    "backend contract violation for participant {}: {}",
                    response.user_id, violation
                ));
            }
        }

        info!(
            "Round for meeting {} complete: winning token {}, score {:.1}, {} escalation(s)",
            request.id,
            winning_token,
            winning_score,
            escalations.len()
        );

        let winning_time = token_to_time[&winning_token];
        Ok(RoundResult {
            meeting_id: request.id.clone(),
            status,
            coordinator_view: CoordinatorView {
                slot_tokens,
                participant_utilities: responses,
                aggregated_scores: aggregated,
                winning_token,
                winning_score,
            },
            initiator_view: InitiatorView {
                token_to_time,
                winning_time,
                top_options,
            },
            escalations,
            diagnostics,
        })
    }

    /// Fan out to every participant proxy concurrently and block on the
    /// full set. Proxies share no mutable state; the only shared object is
    /// the immutable token→time map. A proxy failure fails the round -
    /// silently excluding a participant would corrupt the aggregation
    /// contract.
    async fn fan_out(
        &self,
        request: &MeetingRequest,
        token_to_time: &HashMap<String, DateTime<Utc>>,
    ) -> Result<Vec<UtilityResponse>> {
        let meeting = MeetingMetadata {
            title: request.title.clone(),
            organizer_id: request.organizer_id.clone(),
            category: request.category.clone(),
            external: request.external,
            duration_minutes: request.duration_minutes,
        };

        let mut all_participants = vec![request.organizer_id.clone()];
        all_participants.extend(request.participant_ids.iter().cloned());

        let shared_map = Arc::new(token_to_time.clone());
        let mut handles = Vec::with_capacity(all_participants.len());

        for user_id in all_participants {
            let directory = self.directory.clone();
            let calendar = self.calendar.clone();
            let decisions = self.decisions.clone();
            let profiles = self.profiles.clone();
            let backend = self.backend.clone();
            let config = self.config.clone();
            let meeting = meeting.clone();
            let map = shared_map.clone();
            let duration = request.duration_minutes;
            let timeout = self.config.participant_timeout;

            handles.push(tokio::spawn(async move {
                let proxy = ParticipantProxy::new(
                    &user_id, directory, calendar, decisions, profiles, backend, config,
                )
                .await?;

                let scoring = proxy.score_slots(&meeting, &map, duration);
                match timeout {
                    Some(deadline) => match tokio::time::timeout(deadline, scoring).await {
                        Ok(result) => result,
                        // Recommended deployment policy: a stalled proxy
                        // forces escalation for that participant rather
                        // than blocking the round.
                        Err(_) => {
                            warn!("Participant {} timed out while scoring", user_id);
                            Ok(UtilityResponse {
                                user_id: user_id.clone(),
                                utilities: HashMap::new(),
                                escalate: true,
                                escalation_reason: Some("scoring timed out".to_string()),
                                reasoning: None,
                                slot_breakdown: Vec::new(),
                                preferences_applied: Vec::new(),
                                unresolved_keys: Vec::new(),
                                contract_violation: Some("scoring timed out".to_string()),
                            })
                        }
                    },
                    None => scoring.await,
                }
            }));
        }

        let joined = futures::future::try_join_all(handles)
            .await
            .map_err(|e| SchedulerError::General(format!("participant task failed: {}", e)))?;

        joined.into_iter().collect()
    }

    /// Weighted, order-independent summation: organizer weight times their
    /// score plus participant weight times everyone else's. Every enumerated
    /// token starts at zero so missing entries contribute exactly that.
    fn aggregate(
        &self,
        responses: &[UtilityResponse],
        organizer_id: &str,
        slot_tokens: &[String],
    ) -> HashMap<String, f64> {
        let mut aggregated: HashMap<String, f64> = slot_tokens
            .iter()
            .map(|token| (token.clone(), 0.0))
            .collect();

        for response in responses {
            let weight = if response.user_id == organizer_id {
                self.config.organizer_weight
            } else {
                self.config.participant_weight
            };

            for (token, score) in &response.utilities {
                *aggregated.entry(token.clone()).or_insert(0.0) += f64::from(*score) * weight;
            }
        }

        aggregated
    }
}
