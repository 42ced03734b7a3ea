use super::{ScoringBackend, ScoringRequest, ScoringResponse};
use crate::slot_id::canonical_time;
use crate::types::{Result, SchedulerError, SlotStatus, UserAction};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You are a scheduling assistant. Output only valid JSON \
with utilities, reasoning, and slot_breakdown.";

/// Generative backend speaking the OpenAI chat-completions protocol. Honors
/// the same output contract as the mock backend; the proxy's key
/// normalization covers models that answer with time strings instead of
/// slot tokens.
pub struct RemoteScoringBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl RemoteScoringBackend {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    /// Format the per-slot availability block of the prompt.
    fn build_slot_details(request: &ScoringRequest) -> String {
        let mut lines = Vec::new();
        for slot in &request.slots {
            let time = canonical_time(slot.time);
            match (&slot.status, &slot.conflict_event) {
                (SlotStatus::Free, _) => lines.push(format!("- {}: FREE", time)),
                (SlotStatus::Conflict, Some(event)) => lines.push(format!(
                    "- {}: CONFLICT - \"{}\" ({}, importance {}, {})",
                    time,
                    event.title,
                    event.category,
                    event.importance,
                    if event.external { "external" } else { "internal" }
                )),
                (SlotStatus::Conflict, None) => {
                    lines.push(format!("- {}: CONFLICT - details unavailable", time))
                }
            }
        }
        lines.join("\n")
    }

    /// Format the learned-preference block from decision history.
    fn build_preferences(request: &ScoringRequest) -> String {
        if request.decisions.is_empty() {
            return "No past decisions recorded yet.".to_string();
        }

        let mut lines = Vec::new();
        for decision in &request.decisions {
            let Some(conflicting) = decision.conflicting_category.as_ref() else {
                continue;
            };
            match decision.user_action {
                UserAction::Accepted => lines.push(format!(
                    "- You ACCEPTED rescheduling {} for {}",
                    conflicting, decision.meeting_category
                )),
                UserAction::Rejected => lines.push(format!(
                    "- You REJECTED rescheduling {} for {}",
                    conflicting, decision.meeting_category
                )),
                UserAction::Modified => {}
            }
        }

        if lines.is_empty() {
            "No clear preferences learned yet.".to_string()
        } else {
            lines.join("\n")
        }
    }

    fn build_prompt(request: &ScoringRequest) -> String {
        format!(
            "You are a scheduling assistant for {user_name}.\n\n\
             NEW MEETING REQUEST:\n\
             - Title: {title}\n\
             - Organizer: {organizer}\n\
             - Type: {category}\n\
             - External: {external}\n\
             - Duration: {duration} minutes\n\n\
             YOUR CALENDAR FOR EACH TIME SLOT:\n{slot_details}\n\n\
             LEARNED PREFERENCES FROM PAST DECISIONS:\n{preferences}\n\n\
             INSTRUCTIONS:\n\
             For each time slot, output a utility score 0-100.\n\
             - 100 = perfect slot (free, preferred time)\n\
             - 70-99 = good slot (free, acceptable time)\n\
             - 40-69 = willing to reschedule existing meeting for this\n\
             - 1-39 = reluctant but possible\n\
             - 0 = absolutely not (important conflict, external meeting, etc.)\n\n\
             Consider:\n\
             - User's learned preferences from past decisions\n\
             - Meeting importance (external > internal usually)\n\
             - Existing meeting importance\n\
             - Never reschedule external/customer meetings\n\n\
             Output JSON only:\n\
             {{\n\
               \"utilities\": {{\"slot_id\": score, ...}},\n\
               \"reasoning\": \"brief explanation of key decisions\",\n\
               \"slot_breakdown\": [...]\n\
             }}",
            user_name = request.user_name,
            title = request.meeting.title,
            organizer = request.meeting.organizer_id,
            category = request.meeting.category,
            external = request.meeting.external,
            duration = request.meeting.duration_minutes,
            slot_details = Self::build_slot_details(request),
            preferences = Self::build_preferences(request),
        )
    }
}

#[async_trait]
impl ScoringBackend for RemoteScoringBackend {
    fn backend_name(&self) -> String {
        format!("openai ({})", self.model)
    }

    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResponse> {
        let prompt = Self::build_prompt(request);
        debug!(
            "Requesting utilities for user {} from model {}",
            request.user_id, self.model
        );

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.3,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| {
                SchedulerError::BackendContract("empty completion response".to_string())
            })?;

        // The model must emit the contract shape; anything else is a
        // contract violation the proxy recovers from.
        let scoring: ScoringResponse = serde_json::from_str(content).map_err(|e| {
            SchedulerError::BackendContract(format!("unparseable scoring response: {}", e))
        })?;

        info!(
            "Model returned {} utility entries for user {}",
            scoring.utilities.len(),
            request.user_id
        );
        Ok(scoring)
    }
}
