use std::future::Future;

use super::{make_new_row, CaseResult};
use crate::{RecordStore, StorageError};

pub(super) async fn run_delete_tests<S, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        CaseResult::new(
            "delete",
            "delete_removes_row",
            delete_removes_row(factory).await,
        ),
        CaseResult::new(
            "delete",
            "delete_leaves_other_rows",
            delete_leaves_other_rows(factory).await,
        ),
        CaseResult::new(
            "delete",
            "delete_twice_not_found",
            delete_twice_not_found(factory).await,
        ),
    ]
}

async fn delete_removes_row<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.delete_service(row.id).await.map_err(|e| e.to_string())?;

    let rows = s.list_services().await.map_err(|e| e.to_string())?;
    if rows.iter().any(|r| r.id == row.id) {
        return Err(format!("row {} still listed after delete", row.id));
    }
    Ok(())
}

async fn delete_leaves_other_rows<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let keep = s
        .insert_service(make_new_row("Budi", &[("Laptop", "", "")]))
        .await
        .map_err(|e| e.to_string())?;
    let gone = s
        .insert_service(make_new_row("Sari", &[("Printer", "", "")]))
        .await
        .map_err(|e| e.to_string())?;
    s.delete_service(gone.id).await.map_err(|e| e.to_string())?;

    let ids: Vec<i64> = s
        .list_services()
        .await
        .map_err(|e| e.to_string())?
        .iter()
        .map(|r| r.id)
        .collect();
    if ids != vec![keep.id] {
        return Err(format!("expected only {} left, got {:?}", keep.id, ids));
    }
    Ok(())
}

/// Delete is permanent: a second delete finds nothing.
async fn delete_twice_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.delete_service(row.id).await.map_err(|e| e.to_string())?;
    match s.delete_service(row.id).await {
        Err(StorageError::ServiceNotFound { id }) if id == row.id => Ok(()),
        other => Err(format!("expected ServiceNotFound, got {:?}", other)),
    }
}
