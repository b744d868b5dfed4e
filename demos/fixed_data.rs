// Example: a local dataset with grouping, pinning, sorting and a virtualized body.
use std::sync::Arc;

use datagrid::{
    ActionMenu, ColumnDef, ColumnPin, DEFAULT_ACTIONS_LABEL, GridOptions, GridStore, MemoryStore,
    PinSide, RenderPlan, RowAction, RowVirtualizer, SortEntry, VirtualizerOptions,
};
use serde_json::{Value, json};

fn main() -> datagrid::Result<()> {
    let data: Vec<Value> = (0..500)
        .map(|i| {
            json!({
                "id": format!("inv-{i:04}"),
                "customer": { "name": format!("Customer {}", i % 37) },
                "amount": (i * 7919) % 1000,
                "status": if i % 3 == 0 { "overdue" } else { "paid" },
                "locked": i % 5 == 0,
            })
        })
        .collect();

    let columns = vec![
        ColumnDef::accessor("id", "Invoice").with_size(120),
        ColumnDef::group(
            "billing",
            "Billing",
            [
                ColumnDef::accessor("customer.name", "Customer"),
                ColumnDef::accessor("amount", "Amount").with_size(90),
            ],
        ),
        ColumnDef::accessor("status", "Status").with_size(100),
    ];

    let menu = Arc::new(ActionMenu::new(
        DEFAULT_ACTIONS_LABEL,
        vec![
            RowAction::item("Open").with_on_click(|row: &Value| println!("open {}", row["id"])),
            RowAction::divider(),
            RowAction::item("Delete")
                .disabled_when(|row: &Value| row["locked"].as_bool().unwrap_or(false))
                .with_class_name("danger"),
        ],
    )?);

    let storage = Arc::new(MemoryStore::new());
    let options = GridOptions::new("invoices")
        .with_storage(storage.clone())
        .with_selectable(true)
        .with_actions(menu)
        .with_get_row_id(|row: &Value, _| row["id"].as_str().unwrap_or_default().to_string());
    let mut grid = GridStore::new(columns, options)?.with_data(data);
    grid.mount();

    grid.set_column_pinning("id", ColumnPin::Left)?;
    grid.set_sorting(vec![SortEntry::desc("amount")])?;
    grid.set_page_size(100)?;

    for group in grid.header_groups() {
        let cells: Vec<String> = group
            .headers
            .iter()
            .map(|h| {
                if h.is_placeholder {
                    "·".to_string()
                } else {
                    format!("{}×{}", h.label, h.col_span)
                }
            })
            .collect();
        println!("header row {}: {}", group.depth, cells.join(" | "));
    }
    println!(
        "id sticks at left={}px, actions at right={}px, total width={}px",
        grid.column_offset("id", PinSide::Left),
        grid.column_offset("actions", PinSide::Right),
        grid.total_width()
    );

    let mut body = RowVirtualizer::new(VirtualizerOptions::fixed(0, 36));
    body.mount(360);
    body.set_scroll_offset(1_000);
    if let RenderPlan::Rows { window, rows, .. } = RenderPlan::compute(&grid, &mut body) {
        println!("window={window:?}");
        for row in rows.iter().take(3) {
            let entries = grid.row_actions(row);
            println!("row {} ({} menu lines)", row.id, entries.len());
        }
    }

    grid.set_grouping(vec!["status".into()])?;
    for row in grid.row_model().rows {
        println!("group {} depth={}", row.id, row.depth);
    }
    println!("persisted entries: {}", storage.len());
    Ok(())
}
