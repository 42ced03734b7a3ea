pub mod backend;
pub mod config;
pub mod coordinator;
pub mod finalize;
pub mod preferences;
pub mod proxy;
pub mod slot_id;
pub mod store;
pub mod types;

pub use backend::{
    backend_from_config, MeetingMetadata, MockScoringBackend, RemoteScoringBackend,
    ScoringBackend, ScoringRequest, ScoringResponse,
};
pub use config::{BackendMode, SchedulerConfig};
pub use coordinator::Coordinator;
pub use finalize::FinalizationStep;
pub use preferences::{derive_preferences, LearnedPreferences};
pub use proxy::ParticipantProxy;
pub use store::{
    CalendarStore, DecisionStore, DirectoryStore, InMemoryStore, MeetingStore, ProfileStore,
};
pub use types::*;
