//! Upcoming-birthday digest for list and glance views.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{days_until_text, section_for, Section};
use crate::person::BirthdayRecord;

/// How many entries a compact glance view shows.
pub const GLANCE_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingBirthday {
    pub person_id: String,
    pub name: String,
    pub first_name: String,
    pub date: NaiveDate,
    pub days_until: i64,
    /// Age turned on `date`, when the birth year is known.
    pub turning: Option<u32>,
    pub section: Section,
}

impl UpcomingBirthday {
    pub fn days_until_text(&self) -> String {
        days_until_text(self.days_until)
    }
}

/// Nearest birthdays first, ties in input order. Invalid records are skipped.
pub fn upcoming(people: &[BirthdayRecord], now: NaiveDateTime, limit: usize) -> Vec<UpcomingBirthday> {
    let mut entries: Vec<UpcomingBirthday> = people
        .iter()
        .filter_map(|p| {
            let md = p.validate().ok()?;
            let date = md.next_occurrence(now);
            let days_until = (date - now.date()).num_days();
            Some(UpcomingBirthday {
                person_id: p.id.clone(),
                name: p.display_name(),
                first_name: p.first_name.clone(),
                date,
                days_until,
                turning: p.age_on(date),
                section: section_for(days_until),
            })
        })
        .collect();

    entries.sort_by_key(|e| e.days_until);
    entries.truncate(limit);
    entries
}

/// Bucket entries by section, in section order, dropping empty sections.
pub fn group_by_section(entries: Vec<UpcomingBirthday>) -> Vec<(Section, Vec<UpcomingBirthday>)> {
    let mut groups: Vec<(Section, Vec<UpcomingBirthday>)> =
        Section::ALL.iter().map(|s| (*s, Vec::new())).collect();

    for entry in entries {
        if let Some((_, bucket)) = groups.iter_mut().find(|(s, _)| *s == entry.section) {
            bucket.push(entry);
        }
    }

    groups.retain(|(_, bucket)| !bucket.is_empty());
    groups
}
