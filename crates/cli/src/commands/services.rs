use repairdesk_core::record::parse_date;
use repairdesk_core::{
    Always, Editor, ItemField, LineItem, ServiceDesk, Status, StatusChange, StatusFilter, Tab,
};
use time::Date;
use tokio::runtime::Runtime;

use super::{Context, StdinConfirm};
use crate::view::{today, ServiceView};

/// Parse `name|damage|notes`; damage and notes may be omitted.
pub(crate) fn parse_item(spec: &str) -> LineItem {
    let mut parts = spec.splitn(3, '|').map(str::trim);
    let name = parts.next().unwrap_or_default();
    let damage = parts.next().unwrap_or_default();
    let notes = parts.next().unwrap_or_default();
    LineItem::new(name, damage, notes)
}

fn parse_deadline(ctx: &Context, raw: &str) -> Date {
    match parse_date(raw) {
        Ok(d) => d,
        Err(e) => ctx.fail(&format!("invalid deadline '{}': {} (expected YYYY-MM-DD)", raw, e)),
    }
}

fn print_saved(ctx: &Context, desk: &ServiceDesk, id: i64, verb: &str) {
    ctx.say(&format!("{} service #{}", verb, id));
    if let Some(record) = desk.find(id) {
        ctx.json(&serde_json::json!({
            "id": id,
            "service": ServiceView::new(record, today()),
        }));
    }
}

fn submit(ctx: &Context, rt: &Runtime, desk: &mut ServiceDesk, editor: &Editor) -> i64 {
    ctx.block(rt, desk.submit(editor))
}

pub(crate) fn cmd_list(ctx: &Context, search: &str, status: Option<&str>, tab: Option<&str>) {
    let filter = match status.map(str::parse::<StatusFilter>) {
        None => StatusFilter::All,
        Some(Ok(f)) => f,
        Some(Err(e)) => ctx.fail(&e.to_string()),
    };
    let tab = match tab.map(str::parse::<Tab>) {
        None => Tab::Active,
        Some(Ok(t)) => t,
        Some(Err(e)) => ctx.fail(&e),
    };

    let rt = ctx.runtime();
    let desk = ctx.desk(&rt);
    let parts = desk.view(search, filter);
    let today = today();
    let views: Vec<ServiceView> = parts
        .tab(tab)
        .iter()
        .map(|r| ServiceView::new(r, today))
        .collect();

    ctx.json(&serde_json::json!({
        "tab": tab,
        "counts": { "active": parts.active.len(), "history": parts.history.len() },
        "services": views,
    }));
    ctx.say(&format!(
        "Active ({}) | History ({})",
        parts.active.len(),
        parts.history.len()
    ));
    if views.is_empty() {
        ctx.say("No services found.");
    }
    for view in &views {
        ctx.say(&view.text_line());
    }
}

pub(crate) fn cmd_add(
    ctx: &Context,
    customer: &str,
    phone: Option<&str>,
    deadline: Option<&str>,
    priority: bool,
    items: &[String],
) {
    let mut editor = Editor::new_record();
    editor.set_customer_name(customer);
    editor.set_customer_phone(phone.unwrap_or_default());
    editor.set_deadline(deadline.map(|d| parse_deadline(ctx, d)));
    editor.set_high_priority(priority);
    for (index, spec) in items.iter().enumerate() {
        if index > 0 {
            editor.add_item();
        }
        let item = parse_item(spec);
        editor.set_item_field(index, ItemField::Name, &item.name);
        editor.set_item_field(index, ItemField::Damage, &item.damage);
        editor.set_item_field(index, ItemField::Notes, &item.notes);
    }
    if let Err(e) = editor.validate() {
        ctx.fail(&e.to_string());
    }

    let rt = ctx.runtime();
    let mut desk = ctx.desk(&rt);
    let id = submit(ctx, &rt, &mut desk, &editor);
    print_saved(ctx, &desk, id, "Created");
}

/// Field overrides for `repairdesk edit`. `None` keeps the stored value.
pub(crate) struct EditArgs {
    pub customer: Option<String>,
    pub phone: Option<String>,
    pub deadline: Option<String>,
    pub clear_deadline: bool,
    pub priority: Option<bool>,
    pub items: Vec<String>,
    pub remove_items: Vec<usize>,
}

pub(crate) fn cmd_edit(ctx: &Context, id: i64, args: EditArgs) {
    let rt = ctx.runtime();
    let mut desk = ctx.desk(&rt);
    let Some(record) = desk.find(id) else {
        ctx.fail(&format!("service {} not found", id));
    };

    let mut editor = Editor::for_record(record);
    if let Some(name) = &args.customer {
        editor.set_customer_name(name);
    }
    if let Some(phone) = &args.phone {
        editor.set_customer_phone(phone);
    }
    if args.clear_deadline {
        editor.set_deadline(None);
    } else if let Some(raw) = &args.deadline {
        editor.set_deadline(Some(parse_deadline(ctx, raw)));
    }
    if let Some(p) = args.priority {
        editor.set_high_priority(p);
    }
    if !args.items.is_empty() {
        editor.replace_items(args.items.iter().map(|s| parse_item(s)).collect());
    }
    // Highest first so earlier removals don't shift later positions.
    let mut removals = args.remove_items;
    removals.sort_unstable_by(|a, b| b.cmp(a));
    removals.dedup();
    for position in removals {
        if position == 0 || position > editor.items().len() {
            ctx.fail(&format!("no item {} on service #{}", position, id));
        }
        editor.remove_item(position - 1);
    }
    if let Err(e) = editor.validate() {
        ctx.fail(&e.to_string());
    }

    let id = submit(ctx, &rt, &mut desk, &editor);
    print_saved(ctx, &desk, id, "Updated");
}

pub(crate) fn cmd_status(ctx: &Context, id: i64, status: &str, yes: bool) {
    let requested: Status = match status.parse() {
        Ok(s) => s,
        Err(e) => ctx.fail(&format!("{}", e)),
    };
    let rt = ctx.runtime();
    let mut desk = ctx.desk(&rt);

    let outcome = if yes {
        ctx.block(&rt, desk.change_status(id, requested, &mut Always(true)))
    } else {
        ctx.block(&rt, desk.change_status(id, requested, &mut StdinConfirm))
    };

    match outcome {
        StatusChange::Unchanged => {
            ctx.say(&format!("Service #{} is already {}.", id, requested));
            ctx.json(&serde_json::json!({ "id": id, "status": requested, "changed": false }));
        }
        StatusChange::Applied { from, to } => {
            ctx.say(&format!("Service #{}: {} -> {}", id, from, to));
            ctx.json(&serde_json::json!({
                "id": id, "from": from, "status": to, "changed": true,
            }));
        }
        StatusChange::Declined => ctx.fail("Status change aborted."),
    }
}

pub(crate) fn cmd_delete(ctx: &Context, id: i64, yes: bool) {
    let rt = ctx.runtime();
    let mut desk = ctx.desk(&rt);

    let deleted = if yes {
        ctx.block(&rt, desk.delete(id, &mut Always(true)))
    } else {
        ctx.block(&rt, desk.delete(id, &mut StdinConfirm))
    };
    if !deleted {
        ctx.fail("Delete aborted.");
    }
    ctx.say(&format!("Deleted service #{}", id));
    ctx.json(&serde_json::json!({ "deleted": id }));
}
