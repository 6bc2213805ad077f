use std::future::Future;

use super::{make_new_row, CaseResult};
use crate::record::TextList;
use crate::RecordStore;

pub(super) async fn run_insert_tests<S, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        CaseResult::new(
            "insert",
            "list_empty_store",
            list_empty_store(factory).await,
        ),
        CaseResult::new(
            "insert",
            "insert_assigns_distinct_ids",
            insert_assigns_distinct_ids(factory).await,
        ),
        CaseResult::new(
            "insert",
            "insert_assigns_created_at",
            insert_assigns_created_at(factory).await,
        ),
        CaseResult::new(
            "insert",
            "insert_preserves_parallel_item_lists",
            insert_preserves_parallel_item_lists(factory).await,
        ),
        CaseResult::new(
            "insert",
            "list_returns_newest_first",
            list_returns_newest_first(factory).await,
        ),
    ]
}

/// A fresh store lists nothing.
async fn list_empty_store<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rows = s.list_services().await.map_err(|e| e.to_string())?;
    if !rows.is_empty() {
        return Err(format!("expected empty list, got {} rows", rows.len()));
    }
    Ok(())
}

async fn insert_assigns_distinct_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let a = s
        .insert_service(make_new_row("Budi", &[("Laptop", "", "")]))
        .await
        .map_err(|e| e.to_string())?;
    let b = s
        .insert_service(make_new_row("Sari", &[("Printer", "", "")]))
        .await
        .map_err(|e| e.to_string())?;
    if a.id == b.id {
        return Err(format!("both inserts got id {}", a.id));
    }
    Ok(())
}

async fn insert_assigns_created_at<S, F, Fut>(factory: &F) -> Result<(), String>
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
    if row.created_at.is_empty() {
        return Err("created_at is empty".to_string());
    }
    Ok(())
}

/// Index correspondence across the three item lists survives a round trip.
async fn insert_preserves_parallel_item_lists<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let inserted = s
        .insert_service(make_new_row(
            "Budi",
            &[("Laptop", "No power", ""), ("Mouse", "Scroll broken", "Under warranty")],
        ))
        .await
        .map_err(|e| e.to_string())?;

    let rows = s.list_services().await.map_err(|e| e.to_string())?;
    let row = rows
        .iter()
        .find(|r| r.id == inserted.id)
        .ok_or_else(|| format!("inserted row {} not listed", inserted.id))?;

    let expect = |list: &Option<TextList>, want: &[&str], column: &str| -> Result<(), String> {
        let list = list
            .as_ref()
            .ok_or_else(|| format!("{} missing after insert", column))?;
        let got: Vec<&str> = (0..list.len()).map(|i| list.get(i).unwrap_or("")).collect();
        if got != want {
            return Err(format!("{}: expected {:?}, got {:?}", column, want, got));
        }
        Ok(())
    };
    expect(&row.item_name, &["Laptop", "Mouse"], "item_name")?;
    expect(&row.item_damage, &["No power", "Scroll broken"], "item_damage")?;
    expect(&row.item_notes, &["", "Under warranty"], "item_notes")?;

    if row.status != "Intake" {
        return Err(format!("expected status Intake, got {}", row.status));
    }
    if row.customer_name.as_deref() != Some("Budi") {
        return Err(format!("customer_name not preserved: {:?}", row.customer_name));
    }
    Ok(())
}

async fn list_returns_newest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        let row = s
            .insert_service(make_new_row(name, &[("Laptop", "", "")]))
            .await
            .map_err(|e| e.to_string())?;
        ids.push(row.id);
    }
    ids.reverse();

    let listed: Vec<i64> = s
        .list_services()
        .await
        .map_err(|e| e.to_string())?
        .iter()
        .map(|r| r.id)
        .collect();
    if listed != ids {
        return Err(format!("expected newest-first {:?}, got {:?}", ids, listed));
    }
    Ok(())
}
