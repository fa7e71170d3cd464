//! bday-ingest: contact export parsing (CSV, vCard) into birthday records and group memberships.

pub mod types;
pub mod parsers;

use std::path::Path;

use anyhow::Result;

pub use parsers::contacts_csv::{parse_contacts_csv, parse_contacts_csv_reader};
pub use parsers::vcard::{parse_vcard_file, parse_vcards};
pub use types::{ContactImport, ParsedBirthday};

/// Load a contacts export, picking the parser by extension (`.vcf` / `.vcard`
/// for vCard, anything else as CSV).
pub fn load_contacts(path: impl AsRef<Path>) -> Result<ContactImport> {
    let path = path.as_ref();
    let is_vcard = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("vcf") || e.eq_ignore_ascii_case("vcard"));

    if is_vcard {
        parse_vcard_file(path)
    } else {
        parse_contacts_csv(path)
    }
}
