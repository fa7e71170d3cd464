//! Birthday record as supplied by the contact collaborator.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{format_birthday, DateError, MonthDay};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record identifier must be non-empty")]
    EmptyId,

    #[error(transparent)]
    Date(#[from] DateError),
}

/// One person with a recurring annual date.
///
/// Month/day are kept as plain integers so records can be deserialized
/// before they are checked; call [`BirthdayRecord::validate`] before doing
/// date math on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthdayRecord {
    /// Stable identifier from the contact store.
    pub id: String,
    pub first_name: String,
    pub last_name: String,

    /// 1-12.
    pub month: u32,
    /// 1-31, valid for `month`. Feb 29 is always accepted.
    pub day: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Non-Gregorian origin marker. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<String>,
}

impl BirthdayRecord {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        month: u32,
        day: u32,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            month,
            day,
            year: None,
            calendar: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_calendar(mut self, calendar: impl Into<String>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }

    /// First and last name joined, skipping whichever is empty.
    pub fn display_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn validate(&self) -> Result<MonthDay, RecordError> {
        if self.id.trim().is_empty() {
            return Err(RecordError::EmptyId);
        }
        Ok(MonthDay::new(self.month, self.day)?)
    }

    /// Age turned on `occurrence`, when the birth year is known.
    pub fn age_on(&self, occurrence: NaiveDate) -> Option<u32> {
        let year = self.year?;
        u32::try_from(occurrence.year() - year).ok()
    }

    pub fn formatted_birthday(&self) -> Result<String, RecordError> {
        Ok(format_birthday(self.validate()?, self.year))
    }
}
