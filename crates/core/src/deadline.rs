//! Deadline urgency shown next to each job.

use serde::Serialize;
use time::Date;

/// Days of notice that count as "due soon".
pub const DUE_SOON_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Overdue,
    DueSoon,
    Normal,
}

/// Whole calendar days from `today` to `deadline`; negative once passed.
pub fn days_until(deadline: Date, today: Date) -> i64 {
    (deadline - today).whole_days()
}

/// `None` when the job has no deadline.
pub fn urgency(deadline: Option<Date>, today: Date) -> Option<Urgency> {
    let days = days_until(deadline?, today);
    Some(if days < 0 {
        Urgency::Overdue
    } else if days <= DUE_SOON_DAYS {
        Urgency::DueSoon
    } else {
        Urgency::Normal
    })
}
