pub mod contacts_csv;
pub mod vcard;

use anyhow::Result;
use bday_core::MonthDay;
use regex::Regex;

use crate::types::ParsedBirthday;

/// Recognizes the birthday spellings contact exports use:
/// `1990-03-15`, `19900315`, `--03-15`, `--0315`, with an optional
/// trailing time part (`1990-03-15T00:00:00Z`).
pub(crate) struct BirthdayPattern {
    full: Regex,
    yearless: Regex,
}

impl BirthdayPattern {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            full: Regex::new(r"^(?P<y>\d{4})-?(?P<m>\d{2})-?(?P<d>\d{2})(?:T.*)?$")?,
            yearless: Regex::new(r"^--(?P<m>\d{2})-?(?P<d>\d{2})$")?,
        })
    }

    /// Parse and validate; `None` for unrecognized or impossible dates.
    pub(crate) fn parse(&self, raw: &str) -> Option<ParsedBirthday> {
        let raw = raw.trim();

        let (month, day, year) = if let Some(caps) = self.yearless.captures(raw) {
            (caps["m"].parse().ok()?, caps["d"].parse().ok()?, None)
        } else {
            let caps = self.full.captures(raw)?;
            (
                caps["m"].parse().ok()?,
                caps["d"].parse().ok()?,
                Some(caps["y"].parse().ok()?),
            )
        };

        MonthDay::new(month, day).ok()?;
        Some(ParsedBirthday { month, day, year })
    }
}
