//! Date engine: next occurrence and days-until for recurring month/day pairs.
//!
//! Everything here works on the local wall-clock calendar (`NaiveDate`,
//! `NaiveDateTime`). Callers decide what "local" means.
//!
//! A Feb 29 birthday falls on March 1 in years without a Feb 29. The mapping
//! is resolved per candidate year, so a reference date in a common year can
//! still resolve to Feb 29 of the following leap year.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Longest day number each month admits. February always admits 29.
const MAX_DAY: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("month {0} is outside 1..=12")]
    Month(u32),

    #[error("day {day} is not valid for month {month}")]
    Day { month: u32, day: u32 },

    #[error("delivery time {hour:02}:{minute:02} is not a valid time of day")]
    Time { hour: u32, minute: u32 },
}

/// A validated recurring month/day pair. Serialized as `[month, day]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self, DateError> {
        if !(1..=12).contains(&month) {
            return Err(DateError::Month(month));
        }
        if day == 0 || day > MAX_DAY[(month - 1) as usize] {
            return Err(DateError::Day { month, day });
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_leap_day(&self) -> bool {
        self.month == 2 && self.day == 29
    }

    /// The concrete date this pair falls on in `year`.
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        if self.is_leap_day() && !is_leap_year(year) {
            return NaiveDate::from_ymd_opt(year, 3, 1);
        }
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }

    /// Soonest occurrence on or after the start of `now`'s day.
    pub fn next_occurrence(&self, now: NaiveDateTime) -> NaiveDate {
        let today = now.date();
        match self.in_year(today.year()) {
            Some(candidate) if candidate >= today => candidate,
            // Only fails at the edge of chrono's representable range.
            _ => self.in_year(today.year() + 1).unwrap_or(today),
        }
    }

    /// Whole days from the start of `now`'s day to the next occurrence.
    pub fn days_until(&self, now: NaiveDateTime) -> i64 {
        (self.next_occurrence(now) - now.date()).num_days()
    }
}

impl TryFrom<(u32, u32)> for MonthDay {
    type Error = DateError;

    fn try_from((month, day): (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(month, day)
    }
}

impl From<MonthDay> for (u32, u32) {
    fn from(md: MonthDay) -> Self {
        (md.month, md.day)
    }
}

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Next occurrence of `month`/`day`, or `None` when the pair is not a valid
/// calendar date.
pub fn next_occurrence(month: u32, day: u32, now: NaiveDateTime) -> Option<NaiveDate> {
    MonthDay::new(month, day).ok().map(|md| md.next_occurrence(now))
}

pub fn days_until(month: u32, day: u32, now: NaiveDateTime) -> Option<i64> {
    MonthDay::new(month, day).ok().map(|md| md.days_until(now))
}

/// Display bucket for a birthday based on how far away it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Today,
    ThisWeek,
    ThisMonth,
    Later,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Today,
        Section::ThisWeek,
        Section::ThisMonth,
        Section::Later,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Today => "Today",
            Section::ThisWeek => "This Week",
            Section::ThisMonth => "This Month",
            Section::Later => "Later",
        }
    }
}

pub fn section_for(days_until: i64) -> Section {
    match days_until {
        0 => Section::Today,
        1..=7 => Section::ThisWeek,
        8..=30 => Section::ThisMonth,
        _ => Section::Later,
    }
}

/// Short relative phrase: "Today", "Tomorrow", "in 5 days".
pub fn days_until_text(days_until: i64) -> String {
    match days_until {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        n => format!("in {n} days"),
    }
}

/// "March 15, 1990" with a year, "March 15" without.
pub fn format_birthday(md: MonthDay, year: Option<i32>) -> String {
    // 2000 is a leap year, so Feb 29 formats without a known year.
    match year.and_then(|y| NaiveDate::from_ymd_opt(y, md.month, md.day)) {
        Some(date) => date.format("%B %-d, %Y").to_string(),
        None => NaiveDate::from_ymd_opt(2000, md.month, md.day)
            .map(|d| d.format("%B %-d").to_string())
            .unwrap_or_default(),
    }
}
