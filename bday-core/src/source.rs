//! Contact collaborator contract: who has a birthday and which group
//! preferences apply to them.

use std::collections::HashMap;

use crate::person::BirthdayRecord;
use crate::preference::NotificationPreference;

pub trait ContactSource {
    fn list_people(&self) -> Vec<BirthdayRecord>;

    /// Preferences of every group the person belongs to; empty when ungrouped.
    fn group_preferences_for(&self, person_id: &str) -> Vec<NotificationPreference>;
}

/// Read-only snapshot of people and their resolved group preferences for
/// one scheduling pass.
#[derive(Debug, Clone, Default)]
pub struct ContactSnapshot {
    pub people: Vec<BirthdayRecord>,
    pub preferences: HashMap<String, Vec<NotificationPreference>>,
}

impl ContactSnapshot {
    pub fn new(people: Vec<BirthdayRecord>) -> Self {
        Self {
            people,
            preferences: HashMap::new(),
        }
    }

    pub fn with_preferences(
        mut self,
        person_id: impl Into<String>,
        preferences: impl IntoIterator<Item = NotificationPreference>,
    ) -> Self {
        self.preferences
            .entry(person_id.into())
            .or_default()
            .extend(preferences);
        self
    }
}

impl ContactSource for ContactSnapshot {
    fn list_people(&self) -> Vec<BirthdayRecord> {
        self.people.clone()
    }

    fn group_preferences_for(&self, person_id: &str) -> Vec<NotificationPreference> {
        self.preferences.get(person_id).cloned().unwrap_or_default()
    }
}
