mod mock;
mod remote;

pub use mock::MockScoringBackend;
pub use remote::RemoteScoringBackend;

use crate::config::{BackendMode, SchedulerConfig};
use crate::preferences::LearnedPreferences;
use crate::types::{DecisionRecord, PreferenceApplied, Result, SlotBreakdown, SlotDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// The meeting as a scoring backend is allowed to see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingMetadata {
    pub title: String,
    pub organizer_id: String,
    pub category: String,
    pub external: bool,
    pub duration_minutes: i64,
}

/// Everything a backend receives for one participant: identity, the meeting,
/// per-slot availability, and the participant's learned preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub user_id: String,
    pub user_name: String,
    pub meeting: MeetingMetadata,
    pub slots: Vec<SlotDescriptor>,
    pub decisions: Vec<DecisionRecord>,
    pub learned: LearnedPreferences,
}

/// The fixed output contract. `utilities` is mandatory and may be keyed by
/// slot token or by canonical time string; the proxy reconciles either form.
/// A backend that omits a slot makes it contribute zero, which is not an
/// error. Everything else is optional explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResponse {
    pub utilities: HashMap<String, u8>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub slot_breakdown: Vec<SlotBreakdown>,
    #[serde(default)]
    pub preferences_applied: Vec<PreferenceApplied>,
}

/// Strategy seam between the proxy and whatever produces utility scores.
/// Implementations must be pure with respect to the request: no access to
/// calendars or stores, only what the request carries.
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    fn backend_name(&self) -> String;

    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResponse>;
}

/// Pick the backend the configuration asks for.
pub fn backend_from_config(config: &SchedulerConfig) -> Arc<dyn ScoringBackend> {
    let backend: Arc<dyn ScoringBackend> = match config.backend_mode {
        BackendMode::Mock => Arc::new(MockScoringBackend::new()),
        BackendMode::OpenAi => Arc::new(RemoteScoringBackend::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
        )),
    };
    info!("Using scoring backend: {}", backend.backend_name());
    backend
}
