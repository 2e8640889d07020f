use chrono::{Local, LocalResult, NaiveDate, TimeZone, Utc};
use log::warn;

use crate::models::{Message, Section};

/// Distinguished label for the current local calendar date.
pub const TODAY_LABEL: &str = "Today";

/// Local calendar date of a nanosecond timestamp.
pub fn local_date(timestamp_nanos: u64) -> NaiveDate {
    let secs = (timestamp_nanos / 1_000_000_000) as i64;
    let nsecs = (timestamp_nanos % 1_000_000_000) as u32;
    match Utc.timestamp_opt(secs, nsecs) {
        LocalResult::Single(instant) => instant.with_timezone(&Local).date_naive(),
        _ => {
            warn!("Timestamp {} ns is outside the representable range", timestamp_nanos);
            Local::now().date_naive()
        }
    }
}

/// Display label for a calendar day: "Today" for the current date,
/// otherwise the short weekday/month/day form, e.g. "Mon, Jan 5".
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        TODAY_LABEL.to_string()
    } else {
        date.format("%a, %b %-d").to_string()
    }
}

/// Group a window of messages into day sections.
///
/// Input is the window in storage (chronological) order. Section boundaries
/// are determined solely by the local calendar date of each timestamp. A
/// message is the last of its run when it is the chronologically newest in
/// its section or the next chronological message in the section has a
/// different directionality.
///
/// Output is presentation order: sections newest-day-first, messages
/// newest-first within each section. The function is pure and idempotent;
/// run flags are recomputed from scratch on every call.
pub fn group_into_sections(messages: &[Message], today: NaiveDate) -> Vec<Section> {
    let mut sections: Vec<(NaiveDate, Section)> = Vec::new();

    for message in messages {
        let date = local_date(message.timestamp_nanos);
        let mut message = message.clone();
        message.last_of_run = false;

        match sections.last_mut() {
            Some((section_date, section)) if *section_date == date => {
                section.messages.push(message);
            }
            _ => sections.push((
                date,
                Section {
                    label: day_label(date, today),
                    messages: vec![message],
                },
            )),
        }
    }

    let mut sections: Vec<Section> = sections.into_iter().map(|(_, s)| s).collect();

    for section in &mut sections {
        let count = section.messages.len();
        for i in 0..count {
            section.messages[i].last_of_run = i + 1 == count
                || section.messages[i].is_outgoing != section.messages[i + 1].is_outgoing;
        }
        // Newest message first within the day
        section.messages.reverse();
    }
    // Newest day first
    sections.reverse();

    sections
}
