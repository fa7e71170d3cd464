use bday_core::CandidateEvent;
use chrono::Duration;

/// Emit an ICS calendar with one VEVENT per reminder.
///
/// DTSTART/DTEND are floating local times, matching the wall-clock trigger.
/// UIDs derive from the event id, so re-importing replaces rather than
/// duplicates.
pub fn events_to_ics(events: &[CandidateEvent]) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//bday//EN\r\n");

    for e in events {
        let dtstart = e.trigger_at.format("%Y%m%dT%H%M%S");
        let dtend = (e.trigger_at + Duration::minutes(15)).format("%Y%m%dT%H%M%S");

        s.push_str("BEGIN:VEVENT\r\n");
        s.push_str(&format!("UID:{}@bday\r\n", e.id));
        s.push_str(&format!("DTSTART:{}\r\n", dtstart));
        s.push_str(&format!("DTEND:{}\r\n", dtend));
        s.push_str(&format!("SUMMARY:{}\r\n", escape_ics(&e.title)));
        s.push_str(&format!("DESCRIPTION:{}\r\n", escape_ics(&e.body)));
        s.push_str("END:VEVENT\r\n");
    }

    s.push_str("END:VCALENDAR\r\n");
    s
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}
