use crate::types::{DecisionRecord, PreferenceProfile, UserAction};
use std::collections::BTreeSet;

/// Category-level bias derived from a participant's decision history.
/// Both the live scoring path and the explainability surface go through
/// `derive_preferences` so the two can never drift apart.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LearnedPreferences {
    pub protected_categories: Vec<String>,
    pub tolerant_categories: Vec<String>,
    pub preferred_times_of_day: Vec<String>,
}

impl LearnedPreferences {
    pub fn is_protected(&self, category: &str) -> bool {
        self.protected_categories.iter().any(|c| c == category)
    }

    pub fn is_tolerant(&self, category: &str) -> bool {
        self.tolerant_categories.iter().any(|c| c == category)
    }
}

/// Partition decision history into protected / reschedule-tolerant category
/// sets. A category the user ever REJECTED rescheduling for is protected; one
/// they ever ACCEPTED is tolerant. Presence in history is sufficient; recency
/// does not matter. An empty set falls back to the participant's static
/// default profile.
pub fn derive_preferences(
    history: &[DecisionRecord],
    defaults: &PreferenceProfile,
    limit: usize,
) -> LearnedPreferences {
    let mut protected = BTreeSet::new();
    let mut tolerant = BTreeSet::new();

    for decision in history.iter().take(limit) {
        let Some(category) = decision.conflicting_category.as_ref() else {
            continue;
        };
        match decision.user_action {
            UserAction::Rejected => {
                protected.insert(category.clone());
            }
            UserAction::Accepted => {
                tolerant.insert(category.clone());
            }
            UserAction::Modified => {}
        }
    }

    let protected_categories = if protected.is_empty() {
        defaults.protected_categories.clone()
    } else {
        protected.into_iter().collect()
    };
    let tolerant_categories = if tolerant.is_empty() {
        defaults.tolerant_categories.clone()
    } else {
        tolerant.into_iter().collect()
    };

    LearnedPreferences {
        protected_categories,
        tolerant_categories,
        preferred_times_of_day: defaults.preferred_times_of_day.clone(),
    }
}
