//! vCard (.vcf) parser for contact exports (vCard 3.0 / 4.0).
//!
//! Properties used:
//!   UID        -> identifier (falls back to FN)
//!   N / FN     -> names
//!   BDAY       -> birthday; `X-APPLE-OMIT-YEAR` marks the year as unknown
//!   X-ALTBDAY  -> non-Gregorian marker via its CALSCALE parameter, only
//!                 when there is no Gregorian BDAY
//!   CATEGORIES -> group names
//!
//! A contact with only an alternate-calendar birthday is skipped: the
//! Gregorian month/day cannot be derived from it here.

use std::path::Path;

use anyhow::{Context, Result};
use bday_core::BirthdayRecord;

use super::BirthdayPattern;
use crate::types::{ContactImport, ParsedBirthday};

#[derive(Debug, Default)]
struct Card {
    uid: Option<String>,
    full_name: Option<String>,
    first_name: String,
    last_name: String,
    birthday: Option<ParsedBirthday>,
    calendar: Option<String>,
    categories: Vec<String>,
}

impl Card {
    fn into_record(self) -> Option<(BirthdayRecord, Vec<String>)> {
        let id = self.uid.or_else(|| self.full_name.clone())?;
        // The alternate calendar only tags a card without a Gregorian BDAY.
        let calendar = self.calendar.filter(|_| self.birthday.is_none());
        let bday = self.birthday?;

        let (first, last) = if self.first_name.is_empty() && self.last_name.is_empty() {
            (self.full_name.unwrap_or_default(), String::new())
        } else {
            (self.first_name, self.last_name)
        };

        let mut person = BirthdayRecord::new(id, first, last, bday.month, bday.day);
        person.year = bday.year;
        person.calendar = calendar;
        Some((person, self.categories))
    }
}

pub fn parse_vcard_file(path: impl AsRef<Path>) -> Result<ContactImport> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read {}", path.as_ref().display()))?;
    parse_vcards(&text)
}

pub fn parse_vcards(text: &str) -> Result<ContactImport> {
    let pattern = BirthdayPattern::new()?;
    let mut import = ContactImport::default();
    let mut card: Option<Card> = None;

    for line in unfold(text) {
        let Some((head, value)) = line.split_once(':') else {
            continue;
        };
        let mut params = head.split(';');
        let name = params.next().unwrap_or_default();
        // Drop "item1." style group prefixes.
        let name = name.rsplit('.').next().unwrap_or(name).to_ascii_uppercase();
        let params: Vec<&str> = params.collect();

        match name.as_str() {
            "BEGIN" if value.eq_ignore_ascii_case("VCARD") => card = Some(Card::default()),
            "END" if value.eq_ignore_ascii_case("VCARD") => {
                let Some(done) = card.take() else { continue };
                match done.into_record() {
                    Some((person, groups)) => import.upsert(person, groups),
                    None => tracing::debug!("skipping vcard without identifier or birthday"),
                }
            }
            _ => {
                if let Some(c) = card.as_mut() {
                    apply_property(c, &name, &params, value, &pattern);
                }
            }
        }
    }

    tracing::info!(contacts = import.len(), "vcards parsed");
    Ok(import)
}

fn apply_property(card: &mut Card, name: &str, params: &[&str], value: &str, pattern: &BirthdayPattern) {
    match name {
        "UID" => card.uid = Some(unescape(value)).filter(|v| !v.is_empty()),
        "FN" => card.full_name = Some(unescape(value)).filter(|v| !v.is_empty()),
        "N" => {
            let mut parts = split_unescaped(value, ';').into_iter();
            card.last_name = parts.next().unwrap_or_default();
            card.first_name = parts.next().unwrap_or_default();
        }
        "BDAY" => {
            if let Some(mut bday) = pattern.parse(value) {
                if has_param(params, "X-APPLE-OMIT-YEAR") {
                    bday.year = None;
                }
                card.birthday = Some(bday);
            }
        }
        "X-ALTBDAY" => {
            card.calendar = param_value(params, "CALSCALE").map(|s| s.to_ascii_lowercase());
        }
        "CATEGORIES" => {
            card.categories = split_unescaped(value, ',')
                .into_iter()
                .filter(|c| !c.is_empty())
                .collect();
        }
        _ => {}
    }
}

/// Join folded continuation lines (leading space or tab).
fn unfold(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in text.lines() {
        let raw = raw.trim_end_matches('\r');
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(last) = out.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !raw.trim().is_empty() {
            out.push(raw.to_string());
        }
    }
    out
}

fn has_param(params: &[&str], key: &str) -> bool {
    params
        .iter()
        .any(|p| p.split('=').next().is_some_and(|k| k.eq_ignore_ascii_case(key)))
}

fn param_value(params: &[&str], key: &str) -> Option<String> {
    params.iter().find_map(|p| {
        let (k, v) = p.split_once('=')?;
        k.eq_ignore_ascii_case(key).then(|| v.trim_matches('"').to_string())
    })
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out.trim().to_string()
}

/// Split on `sep` unless escaped, then unescape each part.
fn split_unescaped(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            current.push('\\');
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(unescape(&current));
            current.clear();
        } else {
            current.push(c);
        }
    }
    parts.push(unescape(&current));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "BEGIN:VCARD\r
VERSION:3.0\r
UID:abc-1\r
N:Lovelace;Ada;;;\r
FN:Ada Lovelace\r
BDAY:1815-12-10\r
CATEGORIES:Family,Friends\r
END:VCARD\r
BEGIN:VCARD\r
VERSION:3.0\r
UID:abc-2\r
N:Turing;Alan;;;\r
item1.BDAY;X-APPLE-OMIT-YEAR=1604:1604-06-23\r
END:VCARD\r
BEGIN:VCARD\r
VERSION:4.0\r
FN:Grace\r
  Hopper\r
BDAY:--1209\r
X-ALTBDAY;CALSCALE=chinese:20061202\r
END:VCARD\r
BEGIN:VCARD\r
VERSION:4.0\r
UID:abc-4\r
FN:Nobody\r
END:VCARD\r
BEGIN:VCARD\r
UID:abc-5\r
N:O\\,Brien;Pat;;;\r
BDAY:19800229\r
CATEGORIES:Work\\, Inc\r
END:VCARD\r
";

    #[test]
    fn test_parse_vcards() {
        let import = parse_vcards(SAMPLE).unwrap();
        assert_eq!(import.len(), 4);

        let ada = &import.people[0];
        assert_eq!(ada.id, "abc-1");
        assert_eq!(ada.display_name(), "Ada Lovelace");
        assert_eq!((ada.month, ada.day, ada.year), (12, 10, Some(1815)));
        assert_eq!(import.memberships["abc-1"], vec!["Family", "Friends"]);

        let alan = &import.people[1];
        assert_eq!((alan.month, alan.day, alan.year), (6, 23, None));

        let grace = &import.people[2];
        assert_eq!(grace.id, "Grace Hopper");
        assert_eq!(grace.first_name, "Grace Hopper");
        assert_eq!((grace.month, grace.day), (12, 9));
        assert_eq!(grace.calendar, None);

        let pat = &import.people[3];
        assert_eq!(pat.last_name, "O,Brien");
        assert_eq!((pat.month, pat.day, pat.year), (2, 29, Some(1980)));
        assert_eq!(import.memberships["abc-5"], vec!["Work, Inc"]);
    }

    #[test]
    fn test_gregorian_bday_overrides_alternate_calendar() {
        let text = "BEGIN:VCARD\nUID:g1\nFN:Mei\nBDAY:1990-05-01\nX-ALTBDAY;CALSCALE=chinese:19900407\nEND:VCARD\n\
BEGIN:VCARD\nUID:g2\nFN:Lin\nX-ALTBDAY;CALSCALE=chinese:19900407\nEND:VCARD\n";
        let import = parse_vcards(text).unwrap();
        assert_eq!(import.len(), 1);
        let mei = &import.people[0];
        assert_eq!(mei.id, "g1");
        assert_eq!((mei.month, mei.day, mei.year), (5, 1, Some(1990)));
        assert_eq!(mei.calendar, None);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_vcards("").unwrap().is_empty());
    }
}
