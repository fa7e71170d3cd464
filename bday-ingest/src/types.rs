use std::collections::HashMap;

use bday_core::{BirthdayRecord, ContactSnapshot, NotificationPreference};
use serde::{Deserialize, Serialize};

/// Birthday fields as found in a contact export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedBirthday {
    pub month: u32,
    pub day: u32,
    pub year: Option<i32>,
}

/// Normalized output of contact parsers (format-agnostic).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactImport {
    pub people: Vec<BirthdayRecord>,
    /// Person id -> names of the groups they belong to.
    pub memberships: HashMap<String, Vec<String>>,
}

impl ContactImport {
    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Insert or replace by identifier. A later record for the same id wins
    /// but keeps the position of the first one.
    pub fn upsert(&mut self, person: BirthdayRecord, groups: Vec<String>) {
        match self.people.iter_mut().find(|p| p.id == person.id) {
            Some(existing) => *existing = person.clone(),
            None => self.people.push(person.clone()),
        }
        if groups.is_empty() {
            self.memberships.remove(&person.id);
        } else {
            self.memberships.insert(person.id, groups);
        }
    }

    /// Resolve group names to preferences. Groups without a configured
    /// preference count as `Both`.
    pub fn snapshot(&self, group_preferences: &HashMap<String, NotificationPreference>) -> ContactSnapshot {
        let mut snapshot = ContactSnapshot::new(self.people.clone());
        for (person_id, groups) in &self.memberships {
            let prefs = groups
                .iter()
                .map(|g| group_preferences.get(g).copied().unwrap_or_default());
            snapshot = snapshot.with_preferences(person_id.clone(), prefs);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bday_core::ContactSource;

    #[test]
    fn upsert_replaces_in_place() {
        let mut import = ContactImport::default();
        import.upsert(BirthdayRecord::new("a", "Ann", "", 1, 2), vec!["Family".into()]);
        import.upsert(BirthdayRecord::new("b", "Ben", "", 3, 4), vec![]);
        import.upsert(BirthdayRecord::new("a", "Anne", "", 5, 6), vec![]);

        assert_eq!(import.len(), 2);
        assert_eq!(import.people[0].first_name, "Anne");
        assert!(import.memberships.is_empty());
    }

    #[test]
    fn snapshot_maps_group_names() {
        let mut import = ContactImport::default();
        import.upsert(
            BirthdayRecord::new("a", "Ann", "", 1, 2),
            vec!["Family".into(), "Work".into()],
        );
        import.upsert(BirthdayRecord::new("b", "Ben", "", 3, 4), vec!["Work".into()]);

        let prefs = HashMap::from([("Work".to_string(), NotificationPreference::DayOfOnly)]);
        let snapshot = import.snapshot(&prefs);

        assert_eq!(
            snapshot.group_preferences_for("a"),
            vec![NotificationPreference::Both, NotificationPreference::DayOfOnly]
        );
        assert_eq!(snapshot.group_preferences_for("b"), vec![NotificationPreference::DayOfOnly]);
        assert!(snapshot.group_preferences_for("zzz").is_empty());
    }
}
