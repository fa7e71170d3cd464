//! Candidate reminder generation for one person.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::calendar::DateError;
use crate::person::{BirthdayRecord, RecordError};
use crate::preference::NotificationPreference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    DayBefore,
    DayOf,
}

impl EventKind {
    /// Generation order for one person: the day-before reminder fires first.
    pub const ORDER: [EventKind; 2] = [EventKind::DayBefore, EventKind::DayOf];

    fn offset_days(self) -> i64 {
        match self {
            EventKind::DayBefore => -1,
            EventKind::DayOf => 0,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            EventKind::DayBefore => "daybefore",
            EventKind::DayOf => "dayof",
        }
    }
}

/// Local time of day at which reminders fire. Defaults to 09:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTime(NaiveTime);

impl DeliveryTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, DateError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or(DateError::Time { hour, minute })
    }

    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.0)
    }

    pub fn time(self) -> NaiveTime {
        self.0
    }
}

impl Default for DeliveryTime {
    fn default() -> Self {
        Self(NaiveTime::default() + Duration::hours(9))
    }
}

/// A computed, not-yet-submitted reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEvent {
    /// Pure function of (person id, kind); re-registering replaces in place.
    pub id: String,
    pub person_id: String,
    pub kind: EventKind,
    pub trigger_at: NaiveDateTime,
    pub title: String,
    pub body: String,
}

pub fn event_id(person_id: &str, kind: EventKind) -> String {
    format!("{}-birthday-{}", person_id, kind.suffix())
}

/// Project one person into zero, one, or two reminders.
///
/// A reminder is skipped when its date is before today, or when it falls
/// today and the delivery time is at or before `now`.
pub fn generate_candidates(
    person: &BirthdayRecord,
    preference: NotificationPreference,
    delivery: DeliveryTime,
    now: NaiveDateTime,
) -> Result<Vec<CandidateEvent>, RecordError> {
    let birthday = person.validate()?.next_occurrence(now);
    let today = now.date();
    let name = person.display_name();

    let mut out = Vec::with_capacity(2);

    for kind in EventKind::ORDER {
        if !preference.includes(kind) {
            continue;
        }

        let Some(target) = birthday.checked_add_signed(Duration::days(kind.offset_days())) else {
            continue;
        };
        if target < today {
            continue;
        }

        let trigger_at = delivery.on(target);
        if target == today && trigger_at <= now {
            continue;
        }

        let (title, body) = match kind {
            EventKind::DayOf => (
                format!("{name}'s Birthday!"),
                format!("Today is {name}'s birthday!"),
            ),
            EventKind::DayBefore => (
                "Birthday Tomorrow".to_string(),
                format!("{name}'s birthday is tomorrow!"),
            ),
        };

        out.push(CandidateEvent {
            id: event_id(&person.id, kind),
            person_id: person.id.clone(),
            kind,
            trigger_at,
            title,
            body,
        });
    }

    Ok(out)
}
