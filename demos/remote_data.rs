// Example: server-driven paging and sorting, including a late response.
use datagrid::{
    ColumnDef, GridOptions, GridStore, PageRequest, PageResponse, RenderPlan, RowVirtualizer,
    SortEntry, VirtualizerOptions,
};
use serde_json::{Value, json};

const TOTAL: usize = 1_234;

fn fetch(req: &PageRequest) -> Result<PageResponse<Value>, String> {
    if req.page_index > TOTAL / req.page_size {
        return Err(format!("page {} out of range", req.page_index));
    }
    let desc = req.sorting.first().is_some_and(|s| s.desc);
    let start = req.page_index * req.page_size;
    let rows = (start..(start + req.page_size).min(TOTAL))
        .map(|i| if desc { TOTAL - 1 - i } else { i })
        .map(|i| json!({ "id": i, "title": format!("ticket #{i}") }))
        .collect();
    Ok(PageResponse {
        rows,
        total_count: TOTAL,
    })
}

fn main() -> datagrid::Result<()> {
    let columns = vec![
        ColumnDef::accessor("id", "Id").with_size(60),
        ColumnDef::accessor("title", "Title"),
    ];
    let options = GridOptions::new("tickets")
        .with_manual_pagination(|p| println!("pagination changed: {p:?}"))
        .with_manual_sorting(|s| println!("sorting changed: {s:?}"));
    let mut grid = GridStore::<Value>::new(columns, options)?;
    grid.mount();

    let first = grid.begin_fetch();
    grid.receive_page(fetch(&first));
    println!("pages={:?} rows={}", grid.page_count(), grid.total_rows());

    // Two requests in flight; the older one lands last and wins.
    grid.set_sorting(vec![SortEntry::desc("id")])?;
    let older = grid.begin_fetch();
    grid.next_page();
    let newer = grid.begin_fetch();
    grid.receive_page(fetch(&newer));
    grid.receive_page(fetch(&older));
    println!("showing first id {}", grid.data()[0]["id"]);

    let mut body = RowVirtualizer::new(VirtualizerOptions::fixed(0, 32));
    match RenderPlan::compute(&grid, &mut body) {
        RenderPlan::Rows { rows, .. } => println!("rendering {} rows", rows.len()),
        other => println!("{other:?}"),
    }

    let broken = PageRequest {
        page_index: 10_000,
        ..grid.begin_fetch()
    };
    grid.receive_page(fetch(&broken));
    println!("after failure: {:?}", RenderPlan::compute(&grid, &mut body));
    Ok(())
}
