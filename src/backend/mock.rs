use super::{ScoringBackend, ScoringRequest, ScoringResponse};
use crate::types::{
    PreferenceApplied, Result, ScoreFactor, SlotBreakdown, SlotStatus,
};
use async_trait::async_trait;
use chrono::Timelike;
use std::collections::HashMap;
use tracing::debug;

/// Deterministic reference backend and the baseline the tests rely on.
/// A generative backend must honor the same contract shape but may score
/// differently.
///
/// Policy:
/// - free slot: base 80, +10 for 9-11 AM, -10 for the lunch hours
/// - conflict with an external event: 0, external commitments never move
/// - internal conflict, learned-protected category: 5
/// - internal conflict, learned-tolerant category: 65
/// - internal conflict, no learned preference: by importance (60 / 30 / 10)
pub struct MockScoringBackend;

impl MockScoringBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockScoringBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoringBackend for MockScoringBackend {
    fn backend_name(&self) -> String {
        "mock".to_string()
    }

    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResponse> {
        debug!(
            "Mock backend scoring {} slots for user {}",
            request.slots.len(),
            request.user_id
        );

        let mut utilities = HashMap::new();
        let mut reasoning_parts = Vec::new();
        let mut slot_breakdown = Vec::new();
        let mut preferences_applied = Vec::new();

        for slot in &request.slots {
            let hour = slot.time.hour();
            let time_str = slot.time.format("%I:%M %p").to_string();
            let mut factors = Vec::new();

            let score: u8 = match (&slot.status, &slot.conflict_event) {
                (SlotStatus::Free, _) => {
                    let mut score: i32 = 80;
                    factors.push(ScoreFactor {
                        kind: "base_free".to_string(),
                        value: 80,
                        reason: "Slot is free".to_string(),
                    });

                    if (9..=11).contains(&hour) {
                        score += 10;
                        factors.push(ScoreFactor {
                            kind: "time_preference".to_string(),
                            value: 10,
                            reason: "Morning slot (9-11 AM) preferred".to_string(),
                        });
                        reasoning_parts.push(format!("Morning slot {} gets bonus", time_str));
                    } else if (12..=13).contains(&hour) {
                        score -= 10;
                        factors.push(ScoreFactor {
                            kind: "time_preference".to_string(),
                            value: -10,
                            reason: "Lunch hour penalty".to_string(),
                        });
                    }

                    slot_breakdown.push(SlotBreakdown {
                        slot_id: slot.token.clone(),
                        time: time_str.clone(),
                        score: score as u8,
                        status: SlotStatus::Free,
                        conflict: None,
                        factors: factors.clone(),
                        decision: "AVAILABLE".to_string(),
                        decision_reason: format!("No conflicts at {}", time_str),
                    });
                    score as u8
                }
                (SlotStatus::Conflict, Some(event)) => {
                    let (score, decision, decision_reason) = if event.external {
                        factors.push(ScoreFactor {
                            kind: "external_protection".to_string(),
                            value: 0,
                            reason: format!(
                                "NEVER reschedule external meeting: {}",
                                event.title
                            ),
                        });
                        reasoning_parts
                            .push(format!("Protecting external meeting at {}", time_str));
                        (
                            0u8,
                            "PROTECT",
                            "External/customer meetings are never rescheduled".to_string(),
                        )
                    } else if request.learned.is_protected(&event.category) {
                        factors.push(ScoreFactor {
                            kind: "learned_preference".to_string(),
                            value: 5,
                            reason: format!(
                                "LEARNED: user previously REJECTED rescheduling {}",
                                event.category
                            ),
                        });
                        reasoning_parts.push(format!("Learned: protect {}", event.category));
                        preferences_applied.push(PreferenceApplied {
                            preference: format!("protect_{}", event.category),
                            effect: "Score reduced to 5".to_string(),
                            source: format!("User rejected rescheduling {}", event.category),
                        });
                        (
                            5,
                            "PROTECT",
                            format!("Learned preference: user protects {} meetings", event.category),
                        )
                    } else if request.learned.is_tolerant(&event.category) {
                        factors.push(ScoreFactor {
                            kind: "learned_preference".to_string(),
                            value: 65,
                            reason: format!(
                                "LEARNED: user previously ACCEPTED rescheduling {}",
                                event.category
                            ),
                        });
                        reasoning_parts
                            .push(format!("Learned: willing to reschedule {}", event.category));
                        preferences_applied.push(PreferenceApplied {
                            preference: format!("reschedule_{}", event.category),
                            effect: "Score boosted to 65".to_string(),
                            source: format!("User accepted rescheduling {}", event.category),
                        });
                        (
                            65,
                            "WILLING_TO_RESCHEDULE",
                            format!(
                                "Learned preference: user accepts rescheduling {}",
                                event.category
                            ),
                        )
                    } else if event.importance <= 4 {
                        factors.push(ScoreFactor {
                            kind: "importance_score".to_string(),
                            value: 60,
                            reason: format!(
                                "Low importance ({}/10) - willing to reschedule",
                                event.importance
                            ),
                        });
                        (
                            60,
                            "WILLING_TO_RESCHEDULE",
                            format!("Low importance meeting ({}/10)", event.importance),
                        )
                    } else if event.importance <= 7 {
                        factors.push(ScoreFactor {
                            kind: "importance_score".to_string(),
                            value: 30,
                            reason: format!(
                                "Medium importance ({}/10) - reluctant to reschedule",
                                event.importance
                            ),
                        });
                        (
                            30,
                            "RELUCTANT",
                            format!("Medium importance meeting ({}/10)", event.importance),
                        )
                    } else {
                        factors.push(ScoreFactor {
                            kind: "importance_score".to_string(),
                            value: 10,
                            reason: format!(
                                "High importance ({}/10) - strongly protect",
                                event.importance
                            ),
                        });
                        reasoning_parts
                            .push(format!("High importance meeting at {}", time_str));
                        (
                            10,
                            "PROTECT",
                            format!("High importance meeting ({}/10)", event.importance),
                        )
                    };

                    slot_breakdown.push(SlotBreakdown {
                        slot_id: slot.token.clone(),
                        time: time_str,
                        score,
                        status: SlotStatus::Conflict,
                        conflict: Some(event.clone()),
                        factors: factors.clone(),
                        decision: decision.to_string(),
                        decision_reason,
                    });
                    score
                }
                // A conflict descriptor without the event carries no detail
                // to reason about; treat as an unmovable commitment.
                (SlotStatus::Conflict, None) => 0,
            };

            utilities.insert(slot.token.clone(), score);
        }

        let reasoning = if reasoning_parts.is_empty() {
            "Standard availability scoring".to_string()
        } else {
            reasoning_parts
                .iter()
                .take(5)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ")
        };

        Ok(ScoringResponse {
            utilities,
            reasoning: Some(reasoning),
            slot_breakdown,
            preferences_applied,
        })
    }
}
