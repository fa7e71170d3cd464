//! Contacts CSV export parser.
//!
//! Expected header (column order is free, extra columns are ignored):
//!   id,first_name,last_name,birthday,calendar,groups
//!
//! `birthday` is `YYYY-MM-DD` or `--MM-DD`; `groups` is `;`-separated.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use bday_core::BirthdayRecord;
use serde::Deserialize;

use super::BirthdayPattern;
use crate::types::ContactImport;

#[derive(Debug, Deserialize)]
struct ContactRow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    birthday: String,
    #[serde(default)]
    calendar: String,
    #[serde(default)]
    groups: String,
}

pub fn parse_contacts_csv(path: impl AsRef<Path>) -> Result<ContactImport> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;
    parse_contacts_csv_reader(file)
}

/// Parse contacts from any reader. Rows without a usable birthday or id are
/// skipped; a repeated id replaces the earlier row.
pub fn parse_contacts_csv_reader<R: Read>(reader: R) -> Result<ContactImport> {
    let pattern = BirthdayPattern::new()?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut import = ContactImport::default();

    for (line, result) in rdr.deserialize::<ContactRow>().enumerate() {
        let row = result.with_context(|| format!("reading contacts row {}", line + 2))?;

        if row.id.is_empty() {
            tracing::debug!(row = line + 2, "skipping contact without id");
            continue;
        }
        let Some(bday) = pattern.parse(&row.birthday) else {
            tracing::debug!(contact_id = %row.id, "skipping contact without birthday");
            continue;
        };

        let mut person = BirthdayRecord::new(row.id, row.first_name, row.last_name, bday.month, bday.day);
        person.year = bday.year;
        if !row.calendar.is_empty() {
            person.calendar = Some(row.calendar);
        }

        let groups = row
            .groups
            .split(';')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();

        import.upsert(person, groups);
    }

    tracing::info!(contacts = import.len(), "contacts csv parsed");
    Ok(import)
}
