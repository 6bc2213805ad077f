//! Draft editing for a single service record.
//!
//! An [`Editor`] owns a draft of one record (new or existing), applies field
//! edits, and produces a validated [`Submission`] for the store. The editor
//! never talks to the store itself; see [`crate::desk::ServiceDesk::submit`].

use repairdesk_storage::{NewServiceRow, ServicePatch};
use time::Date;

use crate::record::{format_date, unzip_items, LineItem, ServiceRecord, Status};

/// Which text field of a line item an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Name,
    Damage,
    Notes,
}

/// The editable fields of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub customer_name: String,
    pub customer_phone: String,
    pub deadline: Option<Date>,
    pub high_priority: bool,
    pub items: Vec<LineItem>,
}

impl Default for Draft {
    fn default() -> Self {
        Draft {
            customer_name: String::new(),
            customer_phone: String::new(),
            deadline: None,
            high_priority: false,
            items: vec![LineItem::blank()],
        }
    }
}

/// Why a draft cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("customer name is required")]
    MissingCustomerName,
    #[error("item {} needs a name", .index + 1)]
    MissingItemName { index: usize },
}

/// A validated request for the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Insert(NewServiceRow),
    Update { id: i64, patch: ServicePatch },
}

/// Draft state for creating or editing one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Editor {
    id: Option<i64>,
    draft: Draft,
    /// Set when the record was read with a legacy status label.
    relabel: Option<Status>,
}

impl Editor {
    /// A blank draft: no customer, one empty item, no deadline.
    pub fn new_record() -> Self {
        Editor {
            id: None,
            draft: Draft::default(),
            relabel: None,
        }
    }

    /// A draft seeded from an existing record.
    pub fn for_record(record: &ServiceRecord) -> Self {
        let items = if record.items.is_empty() {
            vec![LineItem::blank()]
        } else {
            record.items.clone()
        };
        Editor {
            id: Some(record.id),
            draft: Draft {
                customer_name: record.customer_name.clone(),
                customer_phone: record.customer_phone.clone().unwrap_or_default(),
                deadline: record.deadline,
                high_priority: record.high_priority,
                items,
            },
            relabel: record.legacy_status.then_some(record.status),
        }
    }

    /// The id of the record being edited, or `None` for a new one.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn items(&self) -> &[LineItem] {
        &self.draft.items
    }

    pub fn set_customer_name(&mut self, value: &str) {
        self.draft.customer_name = value.to_string();
    }

    pub fn set_customer_phone(&mut self, value: &str) {
        self.draft.customer_phone = value.to_string();
    }

    pub fn set_deadline(&mut self, value: Option<Date>) {
        self.draft.deadline = value;
    }

    pub fn set_high_priority(&mut self, value: bool) {
        self.draft.high_priority = value;
    }

    /// Append one blank item.
    pub fn add_item(&mut self) {
        self.draft.items.push(LineItem::blank());
    }

    /// Remove the item at `index`.
    ///
    /// No-op when it is the only item left or `index` is out of range.
    pub fn remove_item(&mut self, index: usize) {
        if self.draft.items.len() > 1 && index < self.draft.items.len() {
            self.draft.items.remove(index);
        }
    }

    /// Edit one field of the item at `index`. Out-of-range indices are ignored.
    pub fn set_item_field(&mut self, index: usize, field: ItemField, value: &str) {
        let Some(item) = self.draft.items.get_mut(index) else {
            return;
        };
        let slot = match field {
            ItemField::Name => &mut item.name,
            ItemField::Damage => &mut item.damage,
            ItemField::Notes => &mut item.notes,
        };
        *slot = value.to_string();
    }

    /// Replace all items at once. An empty list leaves one blank item.
    pub fn replace_items(&mut self, items: Vec<LineItem>) {
        self.draft.items = if items.is_empty() {
            vec![LineItem::blank()]
        } else {
            items
        };
    }

    /// Check required fields without building a payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.draft.customer_name.trim().is_empty() {
            return Err(ValidationError::MissingCustomerName);
        }
        if let Some(index) = self
            .draft
            .items
            .iter()
            .position(|i| i.name.trim().is_empty())
        {
            return Err(ValidationError::MissingItemName { index });
        }
        Ok(())
    }

    /// Build the store request for this draft.
    ///
    /// New records are always inserted as `Intake`. Updates leave the status
    /// column alone (the lifecycle owns it) except to rewrite a legacy label
    /// as the same status's English label.
    pub fn submission(&self) -> Result<Submission, ValidationError> {
        self.validate()?;
        let d = &self.draft;
        let (item_name, item_damage, item_notes) = unzip_items(&d.items);
        let deadline = d.deadline.map(format_date);

        Ok(match self.id {
            None => Submission::Insert(NewServiceRow {
                customer_name: d.customer_name.clone(),
                customer_phone: d.customer_phone.clone(),
                high_priority: d.high_priority,
                deadline,
                status: Status::Intake.label().to_string(),
                item_name,
                item_damage,
                item_notes,
            }),
            Some(id) => Submission::Update {
                id,
                patch: ServicePatch {
                    customer_name: Some(d.customer_name.clone()),
                    customer_phone: Some(d.customer_phone.clone()),
                    high_priority: Some(d.high_priority),
                    deadline: Some(deadline),
                    status: self.relabel.map(|s| s.label().to_string()),
                    item_name: Some(item_name),
                    item_damage: Some(item_damage),
                    item_notes: Some(item_notes),
                },
            },
        })
    }
}
