//! Search, status filtering, and the active/history split of the record list.
//!
//! Everything here is a pure function of `(records, query, status filter)`
//! and keeps the store's order (newest first).

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::record::{Bucket, ServiceRecord, Status, UnknownStatus};

/// Status dropdown: every status, or exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => s == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    /// `"all"` (any case) or a status label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(s) => write!(f, "{}", s),
        }
    }
}

/// Which partition is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Active,
    History,
}

impl Tab {
    fn bucket(self) -> Bucket {
        match self {
            Tab::Active => Bucket::Active,
            Tab::History => Bucket::History,
        }
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Tab::Active),
            "history" => Ok(Tab::History),
            other => Err(format!("unknown tab '{}' (expected active or history)", other)),
        }
    }
}

/// Does `record` match the free-text search?
///
/// Empty query matches everything. Otherwise a case-insensitive substring
/// test against the id, the customer name, all item names joined by spaces,
/// and all item damages joined by spaces.
pub fn matches_search(record: &ServiceRecord, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let q = query.to_lowercase();
    if record.id.to_string().contains(&q) {
        return true;
    }
    if record.customer_name.to_lowercase().contains(&q) {
        return true;
    }
    let names = record
        .items
        .iter()
        .map(|i| i.name.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if names.contains(&q) {
        return true;
    }
    let damages = record
        .items
        .iter()
        .map(|i| i.damage.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    damages.contains(&q)
}

/// Records passing both the status filter and the search, in input order.
pub fn filter_records<'a>(
    records: &'a [ServiceRecord],
    query: &str,
    status: StatusFilter,
) -> Vec<&'a ServiceRecord> {
    records
        .iter()
        .filter(|r| status.matches(r.status) && matches_search(r, query))
        .collect()
}

/// The filtered set split into active and history work.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partitioned<'a> {
    pub active: Vec<&'a ServiceRecord>,
    pub history: Vec<&'a ServiceRecord>,
}

impl<'a> Partitioned<'a> {
    pub fn tab(&self, tab: Tab) -> &[&'a ServiceRecord] {
        match tab.bucket() {
            Bucket::Active => &self.active,
            Bucket::History => &self.history,
        }
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split without re-filtering. Every status lands in exactly one bucket.
pub fn partition<'a>(filtered: &[&'a ServiceRecord]) -> Partitioned<'a> {
    let mut out = Partitioned::default();
    for &r in filtered {
        match r.status.bucket() {
            Bucket::Active => out.active.push(r),
            Bucket::History => out.history.push(r),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LineItem;

    fn rec(id: i64, customer: &str, status: Status, items: &[(&str, &str)]) -> ServiceRecord {
        ServiceRecord {
            id,
            created_at: format!("2024-05-{:02}T10:00:00Z", id),
            customer_name: customer.to_string(),
            customer_phone: None,
            deadline: None,
            high_priority: false,
            status,
            items: items
                .iter()
                .map(|(n, d)| LineItem::new(n, d, ""))
                .collect(),
            legacy_status: false,
        }
    }

    fn fixture() -> Vec<ServiceRecord> {
        vec![
            rec(6, "Budi", Status::Intake, &[("Laptop", "No power")]),
            rec(5, "Sari", Status::Done, &[("Laptop", ""), ("Mouse", "Scroll broken")]),
            rec(4, "Andi", Status::InProgress, &[("Printer", "Paper jam")]),
            rec(3, "Dewi", Status::Cancelled, &[("Phone", "Cracked screen")]),
            rec(2, "Eko", Status::PickedUp, &[("Tablet", "")]),
            rec(1, "Fajar", Status::Inspection, &[("Monitor", "Flicker")]),
        ]
    }

    fn ids(records: &[&ServiceRecord]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    #[test]
    fn all_and_empty_query_is_identity() {
        let records = fixture();
        let out = filter_records(&records, "", StatusFilter::All);
        assert_eq!(ids(&out), vec![6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn search_matches_item_name_case_insensitively() {
        let records = fixture();
        let out = filter_records(&records, "mouse", StatusFilter::All);
        assert_eq!(ids(&out), vec![5]);
        assert!(!out[0].customer_name.to_lowercase().contains("mouse"));
    }

    #[test]
    fn search_matches_damage_customer_and_id() {
        let records = fixture();
        assert_eq!(ids(&filter_records(&records, "JAM", StatusFilter::All)), vec![4]);
        assert_eq!(ids(&filter_records(&records, "dew", StatusFilter::All)), vec![3]);
        assert_eq!(ids(&filter_records(&records, "6", StatusFilter::All)), vec![6]);
    }

    #[test]
    fn search_spans_joined_item_names() {
        let records = fixture();
        let out = filter_records(&records, "laptop mouse", StatusFilter::All);
        assert_eq!(ids(&out), vec![5]);
    }

    #[test]
    fn status_filter_is_exact_and_combines_with_search() {
        let records = fixture();
        let laptops_done = filter_records(&records, "laptop", StatusFilter::Only(Status::Done));
        assert_eq!(ids(&laptops_done), vec![5]);
        let none = filter_records(&records, "printer", StatusFilter::Only(Status::Done));
        assert!(none.is_empty());
    }

    #[test]
    fn partition_is_disjoint_and_complete() {
        let records = fixture();
        for query in ["", "laptop", "a", "zzz"] {
            let filtered = filter_records(&records, query, StatusFilter::All);
            let parts = partition(&filtered);
            assert_eq!(parts.active.len() + parts.history.len(), filtered.len());
            for r in &parts.active {
                assert!(!parts.history.iter().any(|h| h.id == r.id));
            }
        }
    }

    #[test]
    fn partition_keeps_order() {
        let records = fixture();
        let filtered = filter_records(&records, "", StatusFilter::All);
        let parts = partition(&filtered);
        assert_eq!(ids(parts.tab(Tab::Active)), vec![6, 4, 1]);
        assert_eq!(ids(parts.tab(Tab::History)), vec![5, 3, 2]);
    }

    #[test]
    fn parses_filter_and_tab() {
        assert_eq!("ALL".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!(
            "Batal".parse::<StatusFilter>(),
            Ok(StatusFilter::Only(Status::Cancelled))
        );
        assert!("nope".parse::<StatusFilter>().is_err());
        assert_eq!("History".parse::<Tab>(), Ok(Tab::History));
        assert!("later".parse::<Tab>().is_err());
    }
}
