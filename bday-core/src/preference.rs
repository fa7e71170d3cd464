//! Group notification preferences and their resolution to one per person.

use serde::{Deserialize, Serialize};

use crate::reminders::EventKind;

/// Which reminders a group wants. The same enumeration doubles as the
/// effective preference resolved for a person.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationPreference {
    #[serde(rename = "day-of")]
    DayOfOnly,
    #[serde(rename = "day-before")]
    DayBeforeOnly,
    #[default]
    #[serde(rename = "both")]
    Both,
}

impl NotificationPreference {
    pub fn includes(self, kind: EventKind) -> bool {
        match (self, kind) {
            (NotificationPreference::Both, _) => true,
            (NotificationPreference::DayOfOnly, EventKind::DayOf) => true,
            (NotificationPreference::DayBeforeOnly, EventKind::DayBefore) => true,
            _ => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NotificationPreference::DayOfOnly => "Day of only",
            NotificationPreference::DayBeforeOnly => "Day before only",
            NotificationPreference::Both => "Both",
        }
    }
}

/// Combine the preferences of every group a person belongs to.
///
/// Most permissive wins: no groups, any `Both`, or a mix of the two single
/// kinds all resolve to `Both`.
pub fn effective_preference<I>(group_preferences: I) -> NotificationPreference
where
    I: IntoIterator<Item = NotificationPreference>,
{
    let mut day_of = false;
    let mut day_before = false;

    for pref in group_preferences {
        match pref {
            NotificationPreference::Both => return NotificationPreference::Both,
            NotificationPreference::DayOfOnly => day_of = true,
            NotificationPreference::DayBeforeOnly => day_before = true,
        }
    }

    match (day_of, day_before) {
        (true, false) => NotificationPreference::DayOfOnly,
        (false, true) => NotificationPreference::DayBeforeOnly,
        _ => NotificationPreference::Both,
    }
}
