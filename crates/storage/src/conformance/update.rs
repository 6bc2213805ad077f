use std::future::Future;

use super::{make_new_row, CaseResult};
use crate::record::{ServicePatch, ServiceRow};
use crate::{RecordStore, StorageError};

pub(super) async fn run_update_tests<S, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        CaseResult::new(
            "update",
            "status_patch_changes_only_status",
            status_patch_changes_only_status(factory).await,
        ),
        CaseResult::new(
            "update",
            "full_patch_replaces_fields",
            full_patch_replaces_fields(factory).await,
        ),
        CaseResult::new(
            "update",
            "patch_can_clear_deadline",
            patch_can_clear_deadline(factory).await,
        ),
        CaseResult::new(
            "update",
            "update_unknown_id_not_found",
            update_unknown_id_not_found(factory).await,
        ),
        CaseResult::new(
            "update",
            "last_write_wins",
            last_write_wins(factory).await,
        ),
    ]
}

async fn fetch<S: RecordStore>(s: &S, id: i64) -> Result<ServiceRow, String> {
    s.list_services()
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| format!("row {} not listed", id))
}

async fn status_patch_changes_only_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let before = s
        .insert_service(make_new_row("Budi", &[("Laptop", "No power", "")]))
        .await
        .map_err(|e| e.to_string())?;
    s.update_service(before.id, ServicePatch::status("Inspection"))
        .await
        .map_err(|e| e.to_string())?;

    let after = fetch(&s, before.id).await?;
    if after.status != "Inspection" {
        return Err(format!("expected status Inspection, got {}", after.status));
    }
    let mut expected = before.clone();
    expected.status = after.status.clone();
    if after != expected {
        return Err(format!(
            "status patch touched other columns: before {:?}, after {:?}",
            before, after
        ));
    }
    Ok(())
}

async fn full_patch_replaces_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let row = s
        .insert_service(make_new_row("Budi", &[("Laptop", "", "")]))
        .await
        .map_err(|e| e.to_string())?;
    let patch = ServicePatch {
        customer_name: Some("Budi Santoso".to_string()),
        high_priority: Some(true),
        deadline: Some(Some("2024-06-01".to_string())),
        item_name: Some(vec!["Laptop".to_string(), "Charger".to_string()]),
        item_damage: Some(vec!["No power".to_string(), String::new()]),
        item_notes: Some(vec![String::new(), "Frayed cable".to_string()]),
        ..Default::default()
    };
    s.update_service(row.id, patch)
        .await
        .map_err(|e| e.to_string())?;

    let after = fetch(&s, row.id).await?;
    if after.customer_name.as_deref() != Some("Budi Santoso") {
        return Err(format!("customer_name: {:?}", after.customer_name));
    }
    if after.high_priority != Some(true) {
        return Err(format!("high_priority: {:?}", after.high_priority));
    }
    if after.deadline.as_deref() != Some("2024-06-01") {
        return Err(format!("deadline: {:?}", after.deadline));
    }
    let names = after.item_name.ok_or("item_name missing")?;
    if names.len() != 2 || names.get(1) != Some("Charger") {
        return Err(format!("item_name: {:?}", names));
    }
    if after.status != "Intake" {
        return Err(format!("status changed by field patch: {}", after.status));
    }
    Ok(())
}

async fn patch_can_clear_deadline<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut new_row = make_new_row("Budi", &[("Laptop", "", "")]);
    new_row.deadline = Some("2024-06-01".to_string());
    let row = s.insert_service(new_row).await.map_err(|e| e.to_string())?;

    let patch = ServicePatch {
        deadline: Some(None),
        ..Default::default()
    };
    s.update_service(row.id, patch)
        .await
        .map_err(|e| e.to_string())?;

    let after = fetch(&s, row.id).await?;
    if after.deadline.is_some() {
        return Err(format!("expected cleared deadline, got {:?}", after.deadline));
    }
    Ok(())
}

async fn update_unknown_id_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.update_service(999, ServicePatch::status("Done")).await {
        Err(StorageError::ServiceNotFound { id: 999 }) => Ok(()),
        other => Err(format!("expected ServiceNotFound {{ id: 999 }}, got {:?}", other)),
    }
}

/// No optimistic concurrency: two writers both succeed, the second wins.
async fn last_write_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let row = s
        .insert_service(make_new_row("Budi", &[("Laptop", "", "")]))
        .await
        .map_err(|e| e.to_string())?;
    s.update_service(row.id, ServicePatch::status("Done"))
        .await
        .map_err(|e| e.to_string())?;
    s.update_service(row.id, ServicePatch::status("Cancelled"))
        .await
        .map_err(|e| e.to_string())?;

    let after = fetch(&s, row.id).await?;
    if after.status != "Cancelled" {
        return Err(format!("expected last write Cancelled, got {}", after.status));
    }
    Ok(())
}
