//! Service records as the application sees them.
//!
//! The store keeps a record's items as three parallel lists (`item_name`,
//! `item_damage`, `item_notes`). Here they are a single `Vec<LineItem>`; the
//! zip/unzip lives in [`zip_items`] and [`unzip_items`] and nowhere else.

use std::fmt;
use std::str::FromStr;

use repairdesk_storage::{ServiceRow, TextList};
use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Wire format of `deadline`: a calendar date without time.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s.trim(), DATE_FORMAT)
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

// ──────────────────────────────────────────────
// Status
// ──────────────────────────────────────────────

/// Where a job sits in the shop's workflow.
///
/// Serialized with the English label. Rows written by the first deployment
/// carry Indonesian labels, accepted on read as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(alias = "Masuk")]
    Intake,
    #[serde(alias = "Pengecekan")]
    Inspection,
    #[serde(alias = "Dikerjakan")]
    InProgress,
    #[serde(alias = "Selesai")]
    Done,
    #[serde(alias = "Diambil")]
    PickedUp,
    #[serde(alias = "Batal")]
    Cancelled,
}

/// Which list a status is shown under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Active,
    History,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Intake,
        Status::Inspection,
        Status::InProgress,
        Status::Done,
        Status::PickedUp,
        Status::Cancelled,
    ];

    /// Position in the forward-only progression.
    ///
    /// `PickedUp` and `Cancelled` share 5: the two terminal states are
    /// lateral to each other.
    pub fn ordinal(self) -> u8 {
        match self {
            Status::Intake => 1,
            Status::Inspection => 2,
            Status::InProgress => 3,
            Status::Done => 4,
            Status::PickedUp => 5,
            Status::Cancelled => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Intake => "Intake",
            Status::Inspection => "Inspection",
            Status::InProgress => "InProgress",
            Status::Done => "Done",
            Status::PickedUp => "PickedUp",
            Status::Cancelled => "Cancelled",
        }
    }

    fn legacy_label(self) -> &'static str {
        match self {
            Status::Intake => "Masuk",
            Status::Inspection => "Pengecekan",
            Status::InProgress => "Dikerjakan",
            Status::Done => "Selesai",
            Status::PickedUp => "Diambil",
            Status::Cancelled => "Batal",
        }
    }

    /// Resolve a label: the English label in any case, or a legacy label.
    pub fn from_label(label: &str) -> Option<Status> {
        let label = label.trim();
        Status::ALL.into_iter().find(|s| {
            s.label().eq_ignore_ascii_case(label) || s.legacy_label() == label
        })
    }

    pub fn bucket(self) -> Bucket {
        match self {
            Status::Intake | Status::Inspection | Status::InProgress => Bucket::Active,
            Status::Done | Status::PickedUp | Status::Cancelled => Bucket::History,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::from_label(s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

// ──────────────────────────────────────────────
// LineItem / ServiceRecord
// ──────────────────────────────────────────────

/// One device or part brought in on a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default)]
    pub damage: String,
    #[serde(default)]
    pub notes: String,
}

impl LineItem {
    pub fn new(name: &str, damage: &str, notes: &str) -> Self {
        LineItem {
            name: name.to_string(),
            damage: damage.to_string(),
            notes: notes.to_string(),
        }
    }

    pub fn blank() -> Self {
        LineItem::default()
    }
}

/// A repair job as stored, with items already zipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: i64,
    pub created_at: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub deadline: Option<Date>,
    #[serde(default)]
    pub high_priority: bool,
    pub status: Status,
    pub items: Vec<LineItem>,
    /// The row still carries a legacy status label.
    #[serde(skip)]
    pub legacy_status: bool,
}

/// A stored row that cannot be turned into a [`ServiceRecord`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("service {id} has unknown status '{label}'")]
    UnknownStatus { id: i64, label: String },
}

impl ServiceRecord {
    /// Decode a store row.
    ///
    /// Missing text columns decode as empty; an unparseable deadline is
    /// dropped with a warning rather than failing the whole row.
    pub fn from_row(row: ServiceRow) -> Result<Self, DecodeError> {
        let status = Status::from_label(&row.status).ok_or_else(|| DecodeError::UnknownStatus {
            id: row.id,
            label: row.status.clone(),
        })?;

        let deadline = match row.deadline.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_date(raw) {
                Ok(d) => Some(d),
                Err(e) => {
                    tracing::warn!(id = row.id, deadline = raw, error = %e, "ignoring unparseable deadline");
                    None
                }
            },
        };

        let items = zip_items(
            row.item_name.as_ref(),
            row.item_damage.as_ref(),
            row.item_notes.as_ref(),
        );

        Ok(ServiceRecord {
            id: row.id,
            created_at: row.created_at,
            customer_name: row.customer_name.unwrap_or_default(),
            customer_phone: row.customer_phone.filter(|p| !p.is_empty()),
            deadline,
            high_priority: row.high_priority.unwrap_or(false),
            status,
            items,
            legacy_status: row.status.trim() != status.label(),
        })
    }

    pub fn item_names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.name.as_str())
    }
}

/// Zip the three stored lists into items by index.
///
/// The name list drives the length. With no name list at all the record gets
/// one blank item, so the result is never empty.
pub fn zip_items(
    names: Option<&TextList>,
    damage: Option<&TextList>,
    notes: Option<&TextList>,
) -> Vec<LineItem> {
    let Some(names) = names else {
        return vec![LineItem::blank()];
    };
    let field = |list: Option<&TextList>, i: usize| {
        list.and_then(|l| l.get(i)).unwrap_or("").to_string()
    };
    let items: Vec<LineItem> = (0..names.len())
        .map(|i| LineItem {
            name: names.get(i).unwrap_or("").to_string(),
            damage: field(damage, i),
            notes: field(notes, i),
        })
        .collect();
    if items.is_empty() {
        vec![LineItem::blank()]
    } else {
        items
    }
}

/// Split items into the three parallel lists the store keeps.
pub fn unzip_items(items: &[LineItem]) -> (Vec<String>, Vec<String>, Vec<String>) {
    let names = items.iter().map(|i| i.name.clone()).collect();
    let damage = items.iter().map(|i| i.damage.clone()).collect();
    let notes = items.iter().map(|i| i.notes.clone()).collect();
    (names, damage, notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn row(status: &str) -> ServiceRow {
        ServiceRow {
            id: 12,
            created_at: "2024-05-01T10:00:00+00:00".to_string(),
            customer_name: Some("Budi".to_string()),
            customer_phone: Some(String::new()),
            deadline: Some("2024-05-10".to_string()),
            high_priority: None,
            status: status.to_string(),
            item_name: Some(vec!["Laptop".to_string(), "Mouse".to_string()].into()),
            item_damage: Some(vec!["No power".to_string(), "Scroll broken".to_string()].into()),
            item_notes: Some(vec![String::new(), "Under warranty".to_string()].into()),
        }
    }

    #[test]
    fn ordinals_follow_progression() {
        let ords: Vec<u8> = Status::ALL.iter().map(|s| s.ordinal()).collect();
        assert_eq!(ords, vec![1, 2, 3, 4, 5, 5]);
    }

    #[test]
    fn labels_round_trip() {
        for s in Status::ALL {
            assert_eq!(s.label().parse::<Status>(), Ok(s));
        }
    }

    #[test]
    fn legacy_and_lowercase_labels_resolve() {
        assert_eq!(Status::from_label("Masuk"), Some(Status::Intake));
        assert_eq!(Status::from_label("Batal"), Some(Status::Cancelled));
        assert_eq!(Status::from_label("inprogress"), Some(Status::InProgress));
        assert_eq!(Status::from_label("pickedup"), Some(Status::PickedUp));
        assert!("Finished".parse::<Status>().is_err());
    }

    #[test]
    fn serde_accepts_legacy_alias() {
        let s: Status = serde_json::from_str(r#""Diambil""#).unwrap();
        assert_eq!(s, Status::PickedUp);
        assert_eq!(serde_json::to_string(&s).unwrap(), r#""PickedUp""#);
    }

    #[test]
    fn buckets_split_three_and_three() {
        let active = Status::ALL
            .iter()
            .filter(|s| s.bucket() == Bucket::Active)
            .count();
        assert_eq!(active, 3);
    }

    #[test]
    fn from_row_zips_items_by_index() {
        let rec = ServiceRecord::from_row(row("Intake")).unwrap();
        assert_eq!(
            rec.items,
            vec![
                LineItem::new("Laptop", "No power", ""),
                LineItem::new("Mouse", "Scroll broken", "Under warranty"),
            ]
        );
        assert_eq!(rec.deadline, Some(date!(2024 - 05 - 10)));
        assert_eq!(rec.customer_phone, None);
        assert!(!rec.high_priority);
    }

    #[test]
    fn from_row_normalizes_legacy_status() {
        let rec = ServiceRecord::from_row(row("Dikerjakan")).unwrap();
        assert_eq!(rec.status, Status::InProgress);
        assert!(rec.legacy_status);
        assert!(!ServiceRecord::from_row(row("InProgress")).unwrap().legacy_status);
    }

    #[test]
    fn from_row_rejects_unknown_status() {
        let err = ServiceRecord::from_row(row("Lost")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownStatus {
                id: 12,
                label: "Lost".to_string()
            }
        );
    }

    #[test]
    fn from_row_drops_bad_deadline() {
        let mut r = row("Intake");
        r.deadline = Some("next week".to_string());
        let rec = ServiceRecord::from_row(r).unwrap();
        assert_eq!(rec.deadline, None);
    }

    #[test]
    fn missing_name_list_falls_back_to_blank_item() {
        assert_eq!(zip_items(None, None, None), vec![LineItem::blank()]);
        let empty = TextList::Many(vec![]);
        assert_eq!(zip_items(Some(&empty), None, None), vec![LineItem::blank()]);
    }

    #[test]
    fn legacy_single_string_becomes_one_item() {
        let names = TextList::Single("Laptop Asus ROG".to_string());
        let damage = TextList::Single("Mati total".to_string());
        assert_eq!(
            zip_items(Some(&names), Some(&damage), None),
            vec![LineItem::new("Laptop Asus ROG", "Mati total", "")]
        );
    }

    #[test]
    fn short_side_lists_pad_with_empty_text() {
        let names: TextList = vec!["A".to_string(), "B".to_string()].into();
        let damage: TextList = vec!["cracked".to_string()].into();
        let items = zip_items(Some(&names), Some(&damage), None);
        assert_eq!(items[1], LineItem::new("B", "", ""));
    }

    #[test]
    fn unzip_keeps_index_correspondence() {
        let (n, d, o) = unzip_items(&[
            LineItem::new("Laptop", "No power", ""),
            LineItem::new("Mouse", "Scroll broken", "Under warranty"),
        ]);
        assert_eq!(n, vec!["Laptop", "Mouse"]);
        assert_eq!(d, vec!["No power", "Scroll broken"]);
        assert_eq!(o, vec!["", "Under warranty"]);
    }

    #[test]
    fn record_serializes_deadline_as_date() {
        let rec = ServiceRecord::from_row(row("Intake")).unwrap();
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["deadline"], "2024-05-10");
        assert_eq!(json["status"], "Intake");
    }
}
