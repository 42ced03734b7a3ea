use std::env;
use std::time::Duration;

/// Which scoring backend a round uses. Selected by configuration, never by
/// conditionals inside the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMode {
    Mock,
    OpenAi,
}

/// Every protocol constant in one place. Defaults match the reference
/// scheduling policy; deployments override through `from_env` or directly.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Stride between candidate slot origins.
    pub slot_interval_minutes: i64,
    /// Allowed hour-of-day band, inclusive start / exclusive end.
    pub business_hours: (u32, u32),
    pub organizer_weight: f64,
    pub participant_weight: f64,
    /// Escalate when a participant's best score falls below this.
    pub escalation_floor: u8,
    /// Escalate when the top two scores are closer than this.
    pub escalation_margin: u8,
    /// How many ranked alternatives the initiator view carries.
    pub top_option_count: usize,
    /// Decision history entries consulted when scoring.
    pub scoring_history_limit: usize,
    /// Decision history entries consulted when deriving preferences.
    pub preference_history_limit: usize,
    /// Per-participant scoring deadline. None means wait indefinitely, which
    /// matches the prototype; deployments with a generative backend should
    /// set one. A timeout forces escalation for that participant.
    pub participant_timeout: Option<Duration>,
    pub backend_mode: BackendMode,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            slot_interval_minutes: 30,
            business_hours: (9, 17),
            organizer_weight: 3.0,
            participant_weight: 1.5,
            escalation_floor: 40,
            escalation_margin: 10,
            top_option_count: 3,
            scoring_history_limit: 10,
            preference_history_limit: 50,
            participant_timeout: None,
            backend_mode: BackendMode::Mock,
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(mode) = env::var("SCHEDULER_BACKEND") {
            config.backend_mode = match mode.as_str() {
                "openai" => BackendMode::OpenAi,
                _ => BackendMode::Mock,
            };
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config.openai_api_key = key;
        }
        if let Ok(model) = env::var("OPENAI_MODEL") {
            config.openai_model = model;
        }
        if let Ok(base) = env::var("OPENAI_BASE_URL") {
            config.openai_base_url = base;
        }
        if let Ok(secs) = env::var("SCHEDULER_PARTICIPANT_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.participant_timeout = Some(Duration::from_secs(secs));
            }
        }

        config
    }
}
