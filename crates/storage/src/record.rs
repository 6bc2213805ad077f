use serde::{Deserialize, Serialize};

/// A text column that is normally an array of strings.
///
/// Rows written by the first single-item form carry a bare string in the
/// `item_*` columns; array elements may be `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextList {
    Many(Vec<Option<String>>),
    Single(String),
}

impl TextList {
    /// The element at `index`, treating `null` as absent.
    ///
    /// A `Single` value only answers index 0.
    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            TextList::Many(items) => items.get(index).and_then(|v| v.as_deref()),
            TextList::Single(s) if index == 0 => Some(s.as_str()),
            TextList::Single(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TextList::Many(items) => items.len(),
            TextList::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<String>> for TextList {
    fn from(items: Vec<String>) -> Self {
        TextList::Many(items.into_iter().map(Some).collect())
    }
}

/// One row of the `services` table as the store returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRow {
    pub id: i64,
    /// ISO 8601 / RFC 3339 timestamp string, assigned by the store.
    pub created_at: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Calendar date `YYYY-MM-DD`, or null.
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub high_priority: Option<bool>,
    pub status: String,
    #[serde(default)]
    pub item_name: Option<TextList>,
    #[serde(default)]
    pub item_damage: Option<TextList>,
    #[serde(default)]
    pub item_notes: Option<TextList>,
}

/// Payload for inserting a service row. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServiceRow {
    pub customer_name: String,
    pub customer_phone: String,
    pub high_priority: bool,
    pub deadline: Option<String>,
    pub status: String,
    pub item_name: Vec<String>,
    pub item_damage: Vec<String>,
    pub item_notes: Vec<String>,
}

/// Partial update of a service row. `None` fields are left untouched.
///
/// `deadline` is doubly optional: `Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_priority: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_damage: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_notes: Option<Vec<String>>,
}

impl ServicePatch {
    /// A patch that only touches the `status` column.
    pub fn status(label: impl Into<String>) -> Self {
        ServicePatch {
            status: Some(label.into()),
            ..Default::default()
        }
    }

    /// Apply this patch to a row in place.
    pub fn apply_to(&self, row: &mut ServiceRow) {
        if let Some(v) = &self.customer_name {
            row.customer_name = Some(v.clone());
        }
        if let Some(v) = &self.customer_phone {
            row.customer_phone = Some(v.clone());
        }
        if let Some(v) = self.high_priority {
            row.high_priority = Some(v);
        }
        if let Some(v) = &self.deadline {
            row.deadline = v.clone();
        }
        if let Some(v) = &self.status {
            row.status = v.clone();
        }
        if let Some(v) = &self.item_name {
            row.item_name = Some(v.clone().into());
        }
        if let Some(v) = &self.item_damage {
            row.item_damage = Some(v.clone().into());
        }
        if let Some(v) = &self.item_notes {
            row.item_notes = Some(v.clone().into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_list_reads_arrays_with_nulls() {
        let list: TextList = serde_json::from_str(r#"["Laptop", null, "Mouse"]"#).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0), Some("Laptop"));
        assert_eq!(list.get(1), None);
        assert_eq!(list.get(2), Some("Mouse"));
        assert_eq!(list.get(3), None);
    }

    #[test]
    fn text_list_reads_legacy_bare_string() {
        let list: TextList = serde_json::from_str(r#""Laptop Asus ROG""#).unwrap();
        assert_eq!(list, TextList::Single("Laptop Asus ROG".to_string()));
        assert_eq!(list.get(0), Some("Laptop Asus ROG"));
        assert_eq!(list.get(1), None);
    }

    #[test]
    fn row_tolerates_missing_optional_columns() {
        let row: ServiceRow = serde_json::from_value(serde_json::json!({
            "id": 7,
            "created_at": "2024-05-01T10:00:00+00:00",
            "status": "Masuk",
        }))
        .unwrap();
        assert_eq!(row.id, 7);
        assert!(row.item_name.is_none());
        assert!(row.high_priority.is_none());
    }

    #[test]
    fn status_patch_serializes_only_status() {
        let json = serde_json::to_value(ServicePatch::status("Done")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "Done"}));
    }

    #[test]
    fn clearing_deadline_serializes_null() {
        let patch = ServicePatch {
            deadline: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"deadline": null}));
    }

    #[test]
    fn apply_patch_replaces_item_lists() {
        let mut row = ServiceRow {
            id: 1,
            created_at: "2024-05-01T10:00:00Z".to_string(),
            customer_name: Some("Budi".to_string()),
            customer_phone: None,
            deadline: Some("2024-05-10".to_string()),
            high_priority: None,
            status: "Intake".to_string(),
            item_name: Some(TextList::Single("Laptop".to_string())),
            item_damage: None,
            item_notes: None,
        };
        let patch = ServicePatch {
            deadline: Some(None),
            item_name: Some(vec!["Laptop".to_string(), "Mouse".to_string()]),
            ..Default::default()
        };
        patch.apply_to(&mut row);
        assert_eq!(row.deadline, None);
        assert_eq!(row.item_name.as_ref().map(TextList::len), Some(2));
        assert_eq!(row.customer_name.as_deref(), Some("Budi"));
    }
}
