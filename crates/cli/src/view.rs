//! Presentation shared by the CLI and the HTTP API.

use repairdesk_core::{urgency, ServiceRecord, Urgency};
use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};

/// The shop's calendar date. Deadlines are local dates, so urgency is
/// judged against the local clock; UTC stands in when the offset is unknown.
pub(crate) fn today() -> Date {
    local_date(OffsetDateTime::now_utc(), UtcOffset::current_local_offset().ok())
}

fn local_date(now: OffsetDateTime, offset: Option<UtcOffset>) -> Date {
    match offset {
        Some(offset) => now.to_offset(offset).date(),
        None => now.date(),
    }
}

/// A record plus its deadline urgency, as front-ends render it.
#[derive(Serialize)]
pub(crate) struct ServiceView<'a> {
    #[serde(flatten)]
    pub(crate) record: &'a ServiceRecord,
    pub(crate) urgency: Option<Urgency>,
}

impl<'a> ServiceView<'a> {
    pub(crate) fn new(record: &'a ServiceRecord, today: Date) -> Self {
        ServiceView {
            record,
            urgency: urgency(record.deadline, today),
        }
    }

    /// One line for terminal listings.
    pub(crate) fn text_line(&self) -> String {
        let r = self.record;
        let items: Vec<&str> = r.item_names().collect();
        let mut line = format!(
            "#{:<5} {:<11} {:<20} {}",
            r.id,
            r.status.label(),
            r.customer_name,
            items.join(", ")
        );
        if let Some(d) = r.deadline {
            line.push_str(&format!("  due {}", repairdesk_core::record::format_date(d)));
            match self.urgency {
                Some(Urgency::Overdue) => line.push_str(" (overdue)"),
                Some(Urgency::DueSoon) => line.push_str(" (due soon)"),
                _ => {}
            }
        }
        if r.high_priority {
            line.push_str("  [priority]");
        }
        line
    }
}
