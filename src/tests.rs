use crate::*;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use proptest::prelude::*;
use serde_json::{Value, json};

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        start + (self.next_u64() % (end_exclusive - start))
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        self.gen_range_u64(start as u64, end_exclusive as u64) as u32
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

fn record(name: &str, amount: i64, status: &str) -> Value {
    json!({ "name": name, "amount": amount, "status": status, "locked": false })
}

fn sample_rows() -> Vec<Value> {
    vec![
        record("carol", 3, "open"),
        record("alice", 1, "closed"),
        record("bob", 2, "open"),
    ]
}

fn flat_columns() -> Vec<ColumnDef<Value>> {
    vec![
        ColumnDef::accessor("name", "Name"),
        ColumnDef::accessor("amount", "Amount").with_size(100),
        ColumnDef::accessor("status", "Status"),
    ]
}

fn nested_columns() -> Vec<ColumnDef<Value>> {
    vec![
        ColumnDef::accessor("name", "Name"),
        ColumnDef::group(
            "details",
            "Details",
            [
                ColumnDef::accessor("amount", "Amount").with_size(100),
                ColumnDef::accessor("status", "Status"),
            ],
        ),
    ]
}

fn mounted(
    columns: Vec<ColumnDef<Value>>,
    options: GridOptions<Value>,
    data: Vec<Value>,
) -> GridStore<Value> {
    let mut store = GridStore::new(columns, options).unwrap().with_data(data);
    store.mount();
    store
}

fn delete_menu() -> Arc<ActionMenu<Value>> {
    Arc::new(
        ActionMenu::new(
            DEFAULT_ACTIONS_LABEL,
            vec![
                RowAction::divider(),
                RowAction::item("Delete")
                    .disabled_when(|row: &Value| row["locked"].as_bool().unwrap_or(false)),
            ],
        )
        .unwrap(),
    )
}

fn header<'a>(groups: &'a [HeaderGroup], depth: usize, column_id: &str) -> &'a Header {
    groups[depth]
        .headers
        .iter()
        .find(|h| h.column_id == column_id)
        .unwrap()
}

fn source_order(model: &RowModel) -> Vec<usize> {
    model.rows.iter().filter_map(Row::source_index).collect()
}

fn assert_window_invariants(w: VisibleWindow, heights: &[u32]) {
    let n = heights.len();
    let total: u64 = heights.iter().map(|&h| h as u64).sum();
    if n == 0 {
        assert_eq!(w, VisibleWindow::default());
        return;
    }
    assert!(w.start_index <= w.end_index, "{w:?}");
    assert!(w.end_index < n, "{w:?}");
    let visible: u64 = heights[w.start_index..=w.end_index].iter().map(|&h| h as u64).sum();
    assert_eq!(w.top_padding_px + visible + w.bottom_padding_px, total, "{w:?}");
}

// Virtualizer.

#[test]
fn fixed_height_window_at_top() {
    let w = visible_window(100, Some(Viewport::new(0, 400)), |_| 40, 10);
    assert_eq!(w.start_index, 0);
    assert_eq!(w.end_index, 19);
    assert_eq!(w.top_padding_px, 0);
    assert_eq!(w.bottom_padding_px, 4000 - 20 * 40);
    assert_eq!(w.len(), 20);
}

#[test]
fn scrolled_window_applies_overscan_on_both_sides() {
    let w = visible_window(100, Some(Viewport::new(800, 400)), |_| 40, 10);
    assert_eq!((w.start_index, w.end_index), (10, 39));
    assert_eq!(w.top_padding_px, 400);
    assert_eq!(w.bottom_padding_px, 2400);
}

#[test]
fn unmounted_viewport_renders_every_row() {
    let w = visible_window(25, None, |_| 40, 10);
    assert_eq!((w.start_index, w.end_index), (0, 24));
    assert_eq!((w.top_padding_px, w.bottom_padding_px), (0, 0));
}

#[test]
fn empty_list_has_an_all_zero_window() {
    let w = visible_window(0, Some(Viewport::new(500, 400)), |_| 40, 10);
    assert_eq!(w, VisibleWindow::default());
    assert!(w.is_empty());
    assert_eq!(w.indices().count(), 0);
}

#[test]
fn overscrolled_offsets_are_clamped() {
    let w = visible_window(100, Some(Viewport::new(10_000, 400)), |_| 40, 10);
    assert_eq!((w.start_index, w.end_index), (80, 99));
    assert_eq!(w.bottom_padding_px, 0);
}

#[test]
fn measure_updates_total_and_reset_restores_estimates() {
    let mut v = RowVirtualizer::new(VirtualizerOptions::fixed(10, 40));
    assert_eq!(v.total_height(), 400);
    v.measure(3, 100);
    assert!(v.is_measured(3));
    assert_eq!(v.total_height(), 460);
    assert_eq!(v.row_start(4), Some(220));
    assert_eq!(v.index_at_offset(150), Some(3));
    v.reset_measurements();
    assert!(!v.is_measured(3));
    assert_eq!(v.total_height(), 400);
}

#[test]
fn shrinking_the_count_drops_cached_keys() {
    let mut v = RowVirtualizer::new(VirtualizerOptions::fixed(10, 40));
    v.measure(2, 80);
    v.measure(8, 90);
    assert_eq!(v.cached_measurements(), 2);
    v.set_count(5);
    assert_eq!(v.cached_measurements(), 1);
    assert_eq!(v.row_height(2), Some(80));
    v.set_count(10);
    assert!(!v.is_measured(8));
    assert_eq!(v.row_height(8), Some(40));
}

#[test]
fn measurements_follow_keys_after_reorder() {
    let keys = Arc::new(Mutex::new(vec![10u64, 11, 12, 13]));
    let k = Arc::clone(&keys);
    let opts = VirtualizerOptions::new_with_key(4, |_| 40, move |i| k.lock().unwrap()[i]);
    let mut v = RowVirtualizer::new(opts);
    v.measure(0, 90);
    keys.lock().unwrap().reverse();
    v.sync_row_keys();
    assert_eq!(v.row_height(0), Some(40));
    assert_eq!(v.row_height(3), Some(90));
    assert_eq!(v.total_height(), 210);
}

#[test]
fn set_options_keeps_heights_when_only_overscan_changes() {
    let mut v = RowVirtualizer::new(VirtualizerOptions::fixed(5, 40));
    v.measure(1, 70);
    let opts = v.options().clone().with_overscan(2);
    v.set_options(opts);
    assert_eq!(v.row_height(1), Some(70));
    assert_eq!(v.overscan(), 2);
}

#[test]
fn scroll_offset_is_ignored_until_mounted() {
    let mut v = RowVirtualizer::new(VirtualizerOptions::fixed(100, 40));
    v.set_scroll_offset(800);
    assert_eq!(v.scroll_offset(), 0);
    assert_eq!(v.window().len(), 100);
    v.mount(400);
    v.set_scroll_offset(800);
    assert_eq!(v.window().start_index, 10);
    assert_eq!(v.clamp_scroll_offset(9_999), 3600);
}

#[test]
fn collect_visible_rows_matches_window() {
    let mut v = RowVirtualizer::new(VirtualizerOptions::fixed(50, 20).with_overscan(1));
    v.mount(100);
    v.set_scroll_offset(200);
    let mut rows = Vec::new();
    v.collect_visible_rows(&mut rows);
    let w = v.window();
    assert_eq!(rows.len(), w.len());
    assert_eq!(rows[0].index, w.start_index);
    assert_eq!(rows[0].start, w.top_padding_px);
    let last = rows.last().unwrap();
    assert_eq!(last.end() + w.bottom_padding_px, v.total_height());
}

#[test]
fn property_random_window_invariants() {
    for seed in 1..=200u64 {
        let mut rng = Lcg::new(seed);
        let count = rng.gen_range_usize(0, 300);
        let mut v = RowVirtualizer::new(
            VirtualizerOptions::new(count, |_| 30).with_overscan(rng.gen_range_usize(0, 12)),
        );
        v.mount(rng.gen_range_u32(0, 900));
        for _ in 0..rng.gen_range_usize(0, 40) {
            if count > 0 {
                let i = rng.gen_range_usize(0, count);
                v.measure(i, rng.gen_range_u32(0, 200));
            }
        }
        if rng.gen_bool() {
            v.set_scroll_offset(rng.gen_range_u64(0, 20_000));
        }
        let heights: Vec<u32> = (0..count).map(|i| v.row_height(i).unwrap()).collect();
        assert_window_invariants(v.window(), &heights);
    }
}

proptest! {
    #[test]
    fn window_bounds_and_padding_sum_to_total(
        count in 0usize..500,
        height in 1u32..80,
        viewport in 0u32..2000,
        scroll in 0u64..50_000,
        overscan in 0usize..20,
    ) {
        let w = visible_window(count, Some(Viewport::new(scroll, viewport)), |_| height, overscan);
        let heights = vec![height; count];
        assert_window_invariants(w, &heights);
    }
}

// Column model builder.

#[test]
fn builder_injects_synthetic_columns() {
    let mut builder = ColumnModelBuilder::new();
    let menu = delete_menu();
    let model = builder.build(&flat_columns(), true, Some(&menu)).unwrap();
    assert_eq!(
        model.identity_order(),
        vec!["select", "name", "amount", "status", "actions"]
    );
    let select = model.get(SELECT_COLUMN_ID).unwrap();
    assert_eq!(select.kind, ColumnKind::Select);
    assert_eq!(select.capabilities, ColumnCapabilities::NONE);
    assert_eq!(model.get(ACTIONS_COLUMN_ID).unwrap().header, "Actions");
}

#[test]
fn builder_skips_actions_column_for_an_empty_menu() {
    let mut builder = ColumnModelBuilder::new();
    let empty = Arc::new(ActionMenu::new("Actions", Vec::new()).unwrap());
    let model = builder.build(&flat_columns(), false, Some(&empty)).unwrap();
    assert!(!model.contains(ACTIONS_COLUMN_ID));
    assert!(!empty.context_menu_enabled());
}

#[test]
fn builder_memoizes_on_selectable_and_menu_identity() {
    let mut builder = ColumnModelBuilder::new();
    let menu = delete_menu();
    let a = builder.build(&flat_columns(), true, Some(&menu)).unwrap();
    let b = builder.build(&nested_columns(), true, Some(&Arc::clone(&menu))).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(builder.build_count(), 1);

    let other = delete_menu();
    let c = builder.build(&flat_columns(), true, Some(&other)).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    let d = builder.build(&flat_columns(), false, Some(&other)).unwrap();
    assert!(!Arc::ptr_eq(&c, &d));
    assert_eq!(builder.build_count(), 3);
}

#[test]
fn duplicate_column_ids_are_rejected() {
    let columns = vec![
        ColumnDef::<Value>::accessor("name", "Name"),
        ColumnDef::group("g", "G", [ColumnDef::accessor("name", "Again")]),
    ];
    let err = GridStore::new(columns, GridOptions::new("t")).unwrap_err();
    assert_eq!(err, GridError::DuplicateColumnId("name".into()));
}

#[test]
fn dot_path_accessors_read_nested_records() {
    let row = json!({ "company": { "city": "Oslo", "tags": ["a", "b"] }, "n": 4 });
    assert_eq!(row.field("company.city"), CellValue::from("Oslo"));
    assert_eq!(row.field("company.tags.1"), CellValue::from("b"));
    assert_eq!(row.field("n"), CellValue::Number(4.0));
    assert!(row.field("company.zip").is_null());
}

// Visibility.

#[test]
fn hiding_leaves_derives_group_visibility() {
    let mut store = mounted(nested_columns(), GridOptions::new("t"), sample_rows());
    store.set_column_visibility("amount", false).unwrap();
    assert!(store.is_column_visible("details"));
    store.set_column_visibility("status", false).unwrap();
    assert!(!store.is_column_visible("details"));
    store.set_column_visibility("status", true).unwrap();
    assert!(store.is_column_visible("details"));
    assert!(!store.state().column_visibility.contains_key("details"));
}

#[test]
fn hiding_a_group_cascades_to_its_leaves() {
    let mut store = mounted(nested_columns(), GridOptions::new("t"), sample_rows());
    store.set_column_visibility("details", false).unwrap();
    assert!(!store.is_column_visible("amount"));
    assert!(!store.is_column_visible("status"));
    let ids: Vec<_> = store.layout().columns().iter().map(|c| c.column_id.clone()).collect();
    assert_eq!(ids, vec!["name"]);
    store.toggle_column_visibility("details").unwrap();
    assert!(store.is_column_visible("amount"));
}

#[test]
fn synthetic_columns_cannot_be_hidden() {
    let options = GridOptions::new("t").with_selectable(true);
    let mut store = mounted(flat_columns(), options, sample_rows());
    assert_eq!(
        store.set_column_visibility(SELECT_COLUMN_ID, false),
        Err(GridError::NotHideable("select".into()))
    );
    assert_eq!(
        store.set_column_visibility("missing", false),
        Err(GridError::UnknownColumn("missing".into()))
    );
}

proptest! {
    #[test]
    fn group_visible_iff_a_descendant_leaf_is_visible(
        hidden in prop::collection::vec(any::<bool>(), 4),
    ) {
        let columns = vec![
            ColumnDef::<Value>::group("outer", "Outer", [
                ColumnDef::accessor("a", "A"),
                ColumnDef::group("inner", "Inner", [
                    ColumnDef::accessor("b", "B"),
                    ColumnDef::accessor("c", "C"),
                ]),
            ]),
            ColumnDef::accessor("d", "D"),
        ];
        let mut store = mounted(columns, GridOptions::new("t").with_persisted(false), Vec::new());
        for (id, hide) in ["a", "b", "c", "d"].iter().zip(&hidden) {
            store.set_column_visibility(id, !hide).unwrap();
        }
        prop_assert_eq!(store.is_column_visible("inner"), !hidden[1] || !hidden[2]);
        prop_assert_eq!(store.is_column_visible("outer"), !hidden[0] || !hidden[1] || !hidden[2]);
    }
}

// Persistence.

fn arb_state() -> impl Strategy<Value = GridState> {
    (
        prop::collection::vec(("[a-z]{1,6}", any::<bool>()), 0..4),
        prop::collection::vec("[a-z]{1,6}", 0..5),
        prop::collection::btree_map("[a-z]{1,6}", any::<bool>(), 0..4),
        prop::collection::btree_map(
            "[a-z]{1,6}",
            prop_oneof![Just(ColumnPin::Left), Just(ColumnPin::Right)],
            0..3,
        ),
        prop::collection::btree_map("[a-z]{1,6}", 20u32..1000, 0..3),
        (0usize..50, 1usize..100),
        prop::collection::btree_set("[0-9]{1,3}", 0..5),
        ".{0,8}",
    )
        .prop_map(|(sorting, order, visibility, pinning, sizing, page, selection, filter)| {
            GridState {
                sorting: sorting.into_iter().map(|(id, desc)| SortEntry { id, desc }).collect(),
                column_order: order,
                column_visibility: visibility,
                column_pinning: pinning,
                column_sizing: sizing,
                pagination: Pagination::new(page.0, page.1),
                row_selection: selection,
                global_filter: filter,
                ..GridState::default()
            }
        })
}

proptest! {
    #[test]
    fn saved_state_loads_back_equal(state in arb_state()) {
        let storage = MemoryStore::new();
        save_state(&storage, "orders", &state).unwrap();
        prop_assert_eq!(load_state(&storage, "orders"), Some(state));
    }
}

#[test]
fn state_is_stored_under_a_namespaced_key() {
    let storage = Arc::new(MemoryStore::new());
    let options = GridOptions::new("orders").with_storage(storage.clone());
    let mut store = mounted(flat_columns(), options, sample_rows());
    store.set_sorting(vec![SortEntry::desc("amount")]).unwrap();
    let raw = storage.get("table:orders").unwrap();
    assert!(raw.contains("\"sorting\":[{\"id\":\"amount\",\"desc\":true}]"), "{raw}");
    assert!(raw.contains("\"pageSize\":10"), "{raw}");
}

#[test]
fn corrupt_storage_falls_back_to_defaults() {
    let storage = Arc::new(MemoryStore::with_entry("table:t", "{not json"));
    let options = GridOptions::new("t").with_storage(storage.clone());
    let store = mounted(flat_columns(), options, sample_rows());
    assert_eq!(store.state().column_order, vec!["name", "amount", "status"]);
    assert_eq!(store.pagination(), Pagination::default());
    assert!(store.state().sorting.is_empty());
    // Mounting saved a valid snapshot over the corrupt one.
    assert!(load_state(storage.as_ref(), "t").is_some());
}

#[test]
fn partial_snapshot_hydrates_the_fields_it_has() {
    let storage = Arc::new(MemoryStore::with_entry(
        "table:t",
        r#"{"pagination":{"pageIndex":1,"pageSize":2},"columnOrder":["status","ghost"]}"#,
    ));
    let options = GridOptions::new("t").with_storage(storage);
    let store = mounted(flat_columns(), options, sample_rows());
    assert_eq!(store.pagination(), Pagination::new(1, 2));
    assert_eq!(store.state().column_order, vec!["status", "name", "amount"]);
    assert!(store.state().column_visibility.is_empty());
}

#[test]
fn hydrate_is_pure_and_mount_runs_once() {
    let storage = Arc::new(MemoryStore::new());
    let first = mounted(
        flat_columns(),
        GridOptions::new("t").with_storage(storage.clone()),
        sample_rows(),
    );
    let options = GridOptions::new("t").with_storage(storage.clone());
    let mut second = GridStore::new(flat_columns(), options).unwrap();
    second.set_column_order(["amount"]);
    assert_eq!(second.hydrate(), second.hydrate());
    assert_eq!(second.hydrate(), *first.state());
    second.mount();
    let snapshot = second.state().clone();
    second.mount();
    assert_eq!(*second.state(), snapshot);
}

#[test]
fn group_entries_in_a_snapshot_expand_onto_leaves() {
    let storage = Arc::new(MemoryStore::with_entry(
        "table:t",
        r#"{"columnVisibility":{"details":false},"columnPinning":{"details":"left"}}"#,
    ));
    let options = GridOptions::new("t").with_storage(storage);
    let store = mounted(nested_columns(), options, sample_rows());
    assert!(!store.is_column_visible("details"));
    assert_eq!(store.column_pin("details"), ColumnPin::Left);
    assert!(!store.state().column_pinning.contains_key("details"));
}

#[test]
fn unpersisted_grids_never_touch_storage() {
    let storage = Arc::new(MemoryStore::with_entry(
        "table:t",
        r#"{"pagination":{"pageIndex":0,"pageSize":50}}"#,
    ));
    let options = GridOptions::new("t").with_storage(storage.clone()).with_persisted(false);
    let mut store = mounted(flat_columns(), options, sample_rows());
    assert_eq!(store.pagination().page_size, 10);
    store.set_page_size(20).unwrap();
    assert_eq!(
        storage.get("table:t").as_deref(),
        Some(r#"{"pagination":{"pageIndex":0,"pageSize":50}}"#)
    );
}

struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> core::result::Result<(), StorageError> {
        Err(StorageError::Backend("quota exceeded".into()))
    }
}

#[test]
fn failed_saves_are_swallowed() {
    let options = GridOptions::new("t").with_storage(Arc::new(FailingStore));
    let mut store = mounted(flat_columns(), options, sample_rows());
    store.set_column_sizing("name", 200).unwrap();
    assert_eq!(store.column_size("name"), Some(200));
}

// Drag and drop.

#[test]
fn dragging_status_onto_name_moves_it_first() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    let groups = store.header_groups();
    let status = header(&groups, 0, "status").clone();
    let name = header(&groups, 0, "name").clone();
    assert!(store.begin_column_drag(&status));
    assert!(store.can_drop_on(&name));
    assert_eq!(
        store.drop_column(&name),
        DropOutcome::Dropped(vec!["status".into(), "name".into(), "amount".into()])
    );
    assert_eq!(store.state().column_order, vec!["status", "name", "amount"]);
    assert!(!store.drag().is_dragging());
}

#[test]
fn repeating_a_drag_does_not_restore_the_order() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    for _ in 0..2 {
        let groups = store.header_groups();
        let status = header(&groups, 0, "status").clone();
        let name = header(&groups, 0, "name").clone();
        assert!(store.begin_column_drag(&status));
        store.drop_column(&name);
    }
    assert_eq!(store.state().column_order, vec!["name", "status", "amount"]);
}

#[test]
fn splice_direction_depends_on_drag_direction() {
    let order: Vec<String> = ["a", "b", "c", "d"].map(String::from).into();
    assert_eq!(reorder(&order, "a", "c").unwrap(), vec!["b", "c", "a", "d"]);
    assert_eq!(reorder(&order, "d", "b").unwrap(), vec!["a", "d", "b", "c"]);
    assert_eq!(reorder(&order, "a", "a"), None);
    assert_eq!(reorder(&order, "a", "zz"), None);
}

#[test]
fn drops_across_pin_sections_are_rejected() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    store.set_column_pinning("name", ColumnPin::Left).unwrap();
    let groups = store.header_groups();
    let name = header(&groups, 0, "name").clone();
    let status = header(&groups, 0, "status").clone();
    assert!(!store.begin_column_drag(&name));
    assert!(store.begin_column_drag(&status));
    assert!(!store.can_drop_on(&name));
    assert_eq!(store.drop_column(&name), DropOutcome::Rejected);
    assert_eq!(store.state().column_order, vec!["name", "amount", "status"]);
    assert_eq!(store.drop_column(&name), DropOutcome::NotDragging);
}

#[test]
fn placeholders_and_fixed_columns_are_not_draggable() {
    let source = DragPayload::column("amount", ColumnPin::None, 1);
    let target = |id: &str, depth, is_placeholder| {
        DropTarget::new(DragPayload::column(id, ColumnPin::None, depth), is_placeholder)
    };
    assert!(!accepts(&source, &target("status", 1, true)));
    assert!(!accepts(&source, &target("name", 0, false)));
    assert!(accepts(&source, &target("status", 1, false)));
    assert!(!can_drag(false, ColumnPin::None, false));
    assert!(!can_drag(true, ColumnPin::Right, false));
    assert!(!can_drag(true, ColumnPin::None, true));

    let mut drag = DragController::new();
    assert!(!drag.begin(source.clone(), false));
    assert_eq!(*drag.state(), DragState::Idle);
    assert!(drag.begin(source, true));
    drag.cancel();
    assert!(!drag.is_dragging());
}

// Layout and headers.

fn pinned_store(formula: RightPinFormula) -> GridStore<Value> {
    let options = GridOptions::new("t")
        .with_selectable(true)
        .with_actions(delete_menu())
        .with_right_pin_formula(formula);
    let mut store = mounted(flat_columns(), options, sample_rows());
    store.set_column_pinning("name", ColumnPin::Left).unwrap();
    store
}

#[test]
fn synthetic_columns_are_pinned_on_mount() {
    let store = pinned_store(RightPinFormula::Legacy);
    assert_eq!(store.column_pin(SELECT_COLUMN_ID), ColumnPin::Left);
    assert_eq!(store.column_pin(ACTIONS_COLUMN_ID), ColumnPin::Right);
    let layout = store.layout();
    let ids: Vec<_> = layout.columns().iter().map(|c| c.column_id.as_str()).collect();
    assert_eq!(ids, vec!["select", "name", "amount", "status", "actions"]);
    assert_eq!(layout.total_width(), 40 + 150 + 100 + 150 + 30);
    assert_eq!(layout.left_width(), 190);
    assert_eq!(layout.center_width(), 250);
    assert_eq!(layout.right_width(), 30);
}

#[test]
fn left_offsets_sum_preceding_left_pinned_sizes() {
    let store = pinned_store(RightPinFormula::Legacy);
    assert_eq!(store.column_offset("select", PinSide::Left), 0);
    assert_eq!(store.column_offset("name", PinSide::Left), 40);
}

#[test]
fn legacy_right_offset_multiplies_remaining_width() {
    let mut store = pinned_store(RightPinFormula::Legacy);
    assert_eq!(store.column_offset("actions", PinSide::Right), 0);
    store.set_column_pinning("status", ColumnPin::Right).unwrap();
    // status starts at 290 with one column after it.
    assert_eq!(store.column_offset("status", PinSide::Right), (470 - 290) * 1);
    assert_eq!(store.column_offset("actions", PinSide::Right), 0);
}

#[test]
fn suffix_sum_right_offsets_stack_pinned_columns() {
    let mut store = pinned_store(RightPinFormula::SuffixSum);
    store.set_column_pinning("status", ColumnPin::Right).unwrap();
    assert_eq!(store.column_offset("status", PinSide::Right), 30);
    assert_eq!(store.column_offset("actions", PinSide::Right), 0);
}

#[test]
fn synthetic_columns_reject_user_pinning() {
    let mut store = pinned_store(RightPinFormula::Legacy);
    assert_eq!(
        store.set_column_pinning(ACTIONS_COLUMN_ID, ColumnPin::None),
        Err(GridError::NotPinnable("actions".into()))
    );
}

#[test]
fn layout_is_reused_until_a_column_slice_changes() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    let a = store.layout();
    let b = store.layout();
    assert!(Arc::ptr_eq(&a, &b));
    store.set_sorting(vec![SortEntry::asc("name")]).unwrap();
    assert!(Arc::ptr_eq(&a, &store.layout()));
    store.set_column_sizing("amount", 120).unwrap();
    let c = store.layout();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(c.get("amount").unwrap().size, 120);
}

#[test]
fn nothing_is_laid_out_before_mount() {
    let store = GridStore::new(flat_columns(), GridOptions::new("t")).unwrap();
    assert!(store.header_groups().is_empty());
    assert!(store.layout().is_empty());
}

#[test]
fn nested_headers_span_and_placeholder() {
    let store = mounted(nested_columns(), GridOptions::new("t"), sample_rows());
    let groups = store.header_groups();
    assert_eq!(groups.len(), 2);

    let top = &groups[0].headers;
    assert_eq!(top.len(), 2);
    assert!(top[0].is_placeholder);
    assert_eq!(top[0].column_id, "name");
    assert_eq!(top[1].column_id, "details");
    assert_eq!(top[1].col_span, 2);
    assert_eq!(top[1].size, 250);
    assert_eq!(top[1].start, 150);
    assert!(groups[0].is_renderable());

    let bottom: Vec<_> = groups[1].headers.iter().map(|h| h.column_id.as_str()).collect();
    assert_eq!(bottom, vec!["name", "amount", "status"]);
    assert_eq!(groups[1].headers[2].id, "center_1_status");
    for group in &groups {
        assert_eq!(group.headers.iter().map(|h| h.col_span).sum::<usize>(), 3);
    }
}

#[test]
fn header_spans_shrink_with_hidden_leaves() {
    let mut store = mounted(nested_columns(), GridOptions::new("t"), sample_rows());
    store.set_column_visibility("amount", false).unwrap();
    let groups = store.header_groups();
    let details = header(&groups, 0, "details");
    assert_eq!(details.col_span, 1);
    assert_eq!(details.size, 150);
}

#[test]
fn resize_session_clamps_and_reports_changes() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    store.begin_column_resize("amount", 100).unwrap();
    assert!(store.is_resizing());
    assert!(store.update_column_resize(150));
    assert_eq!(store.column_size("amount"), Some(150));
    assert!(!store.update_column_resize(150));
    assert!(store.update_column_resize(-1000));
    assert_eq!(store.column_size("amount"), Some(MIN_COLUMN_SIZE));
    store.end_column_resize();
    assert!(!store.is_resizing());
    assert_eq!(store.state().column_sizing_info, ColumnSizingInfo::default());
    assert!(!store.update_column_resize(300));
}

#[test]
fn extreme_pointer_positions_saturate() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    store.begin_column_resize("name", i64::MIN).unwrap();
    assert!(store.update_column_resize(i64::MAX));
    assert_eq!(store.column_size("name"), Some(MAX_COLUMN_SIZE));
    store.begin_column_resize("amount", i64::MAX).unwrap();
    assert!(store.update_column_resize(i64::MIN));
    assert_eq!(store.column_size("amount"), Some(MIN_COLUMN_SIZE));
}

#[test]
fn fixed_width_columns_cannot_be_resized() {
    let columns = vec![ColumnDef::<Value>::accessor("name", "Name").with_resizing(false)];
    let mut store = mounted(columns, GridOptions::new("t"), Vec::new());
    assert_eq!(
        store.begin_column_resize("name", 0),
        Err(GridError::NotResizable("name".into()))
    );
}

// Row model.

#[test]
fn sorting_is_multi_key_and_directional() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    store.set_sorting(vec![SortEntry::asc("amount")]).unwrap();
    assert_eq!(source_order(&store.row_model()), vec![1, 2, 0]);
    store.set_sorting(vec![SortEntry::asc("status"), SortEntry::desc("amount")]).unwrap();
    assert_eq!(source_order(&store.row_model()), vec![1, 0, 2]);
}

#[test]
fn toggle_sorting_cycles_through_directions() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    store.toggle_sorting("amount", false).unwrap();
    assert_eq!(store.state().sorting, vec![SortEntry::asc("amount")]);
    store.toggle_sorting("name", true).unwrap();
    store.toggle_sorting("amount", true).unwrap();
    assert_eq!(store.state().sorting, vec![SortEntry::desc("amount"), SortEntry::asc("name")]);
    store.toggle_sorting("amount", true).unwrap();
    assert_eq!(store.state().sorting, vec![SortEntry::asc("name")]);
    store.clear_sorting();
    assert!(store.state().sorting.is_empty());
}

#[test]
fn unsortable_columns_are_rejected() {
    let columns = vec![ColumnDef::<Value>::accessor("name", "Name").with_sorting(false)];
    let mut store = mounted(columns, GridOptions::new("t"), Vec::new());
    assert_eq!(
        store.set_sorting(vec![SortEntry::asc("name")]),
        Err(GridError::NotSortable("name".into()))
    );
}

#[test]
fn custom_comparators_override_value_order() {
    let columns = vec![
        ColumnDef::<Value>::accessor("name", "Name")
            .with_sort_fn(|a, b| {
                let len = |row: &Value| row["name"].as_str().map(str::len);
                len(a.original).cmp(&len(b.original))
            }),
    ];
    let data = vec![record("carol", 0, ""), record("bo", 0, ""), record("dave", 0, "")];
    let mut store = mounted(columns, GridOptions::new("t"), data);
    store.set_sorting(vec![SortEntry::asc("name")]).unwrap();
    assert_eq!(source_order(&store.row_model()), vec![1, 2, 0]);
}

#[test]
fn manual_sorting_reports_and_keeps_source_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = GridOptions::new("t")
        .with_manual_sorting(move |s: &[SortEntry]| sink.lock().unwrap().push(s.to_vec()));
    let mut store = mounted(flat_columns(), options, sample_rows());
    store.set_sorting(vec![SortEntry::asc("amount")]).unwrap();
    assert_eq!(source_order(&store.row_model()), vec![0, 1, 2]);
    assert_eq!(*seen.lock().unwrap(), vec![vec![SortEntry::asc("amount")]]);
}

#[test]
fn grouping_buckets_rows_and_expands() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    store.set_grouping(vec!["status".into()]).unwrap();
    let model = store.row_model();
    let ids: Vec<_> = model.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["status:s:open", "status:s:closed"]);
    assert!(matches!(model.rows[0].kind, RowKind::Group { leaf_count: 2, .. }));
    assert!(store.layout().get("status").is_none());

    store.toggle_expanded("status:s:open");
    let model = store.row_model();
    let ids: Vec<_> = model.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["status:s:open", "0", "2", "status:s:closed"]);
    assert_eq!(model.rows[1].depth, 1);

    store.set_sorting(vec![SortEntry::asc("status")]).unwrap();
    assert_eq!(store.row_model().rows[0].id, "status:s:closed");
}

#[test]
fn group_ids_keep_value_types_apart() {
    let columns = vec![ColumnDef::<Value>::accessor("k", "K")];
    let rows = vec![
        json!({ "k": "1" }),
        json!({ "k": 1 }),
        json!({ "k": null }),
        json!({ "k": "" }),
    ];
    let mut store = mounted(columns, GridOptions::new("t"), rows);
    store.set_grouping(vec!["k".into()]).unwrap();
    let ids: Vec<_> = store.row_model().rows.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["k:s:1", "k:n:1", "k:null", "k:s:"]);

    store.toggle_expanded("k:n:1");
    let model = store.row_model();
    let sources: Vec<_> = model.leaf_rows().filter_map(Row::source_index).collect();
    assert_eq!(sources, vec![1]);
}

#[test]
fn grouping_needs_an_accessor() {
    let columns = vec![ColumnDef::<Value>::display("avatar", "")];
    let mut store = mounted(columns, GridOptions::new("t"), Vec::new());
    assert_eq!(
        store.set_grouping(vec!["avatar".into()]),
        Err(GridError::NoAccessor("avatar".into()))
    );
}

#[test]
fn filters_apply_only_when_enabled() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    store.set_global_filter("ALI");
    assert_eq!(store.row_model().len(), 3);

    let options = GridOptions::new("t").with_filtering(true);
    let mut store = mounted(flat_columns(), options, sample_rows());
    store.set_global_filter("ALI");
    assert_eq!(source_order(&store.row_model()), vec![1]);
    store.set_global_filter("");
    store
        .set_column_filters(vec![ColumnFilter {
            id: "status".into(),
            value: "open".into(),
        }])
        .unwrap();
    assert_eq!(source_order(&store.row_model()), vec![0, 2]);
}

#[test]
fn row_ids_come_from_the_accessor() {
    let options = GridOptions::new("t")
        .with_get_row_id(|row: &Value, _| row["name"].as_str().unwrap_or_default().to_string());
    let store = mounted(flat_columns(), options, sample_rows());
    let ids: Vec<_> = store.row_model().rows.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["carol", "alice", "bob"]);
}

// Pagination.

fn numbered_rows(n: usize) -> Vec<Value> {
    (0..n).map(|i| record(&format!("row{i}"), i as i64, "open")).collect()
}

#[test]
fn internal_pagination_clamps_page_index() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), numbered_rows(300));
    assert_eq!(store.page_count(), Some(30));
    assert_eq!(store.total_rows(), 10);
    store.set_page_index(99).unwrap();
    assert_eq!(store.pagination().page_index, 29);
    assert!(!store.can_next_page());
    assert!(!store.next_page());

    store.set_page_size(50).unwrap();
    assert_eq!(store.pagination(), Pagination::new(5, 50));
    assert_eq!(store.page_count(), Some(6));

    store.set_data(numbered_rows(30));
    assert_eq!(store.pagination().page_index, 0);
    assert_eq!(store.set_page_size(0), Err(GridError::InvalidPageSize));
}

#[test]
fn page_navigation_moves_one_page_at_a_time() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), numbered_rows(25));
    assert!(!store.previous_page());
    assert!(store.next_page());
    assert_eq!(source_order(&store.row_model())[0], 10);
    assert!(store.last_page());
    assert_eq!(store.row_model().len(), 5);
    assert!(store.first_page());
    assert_eq!(store.pagination().page_index, 0);
}

#[test]
fn manual_pagination_counts_raw_rows_and_bounds_the_window() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let options = GridOptions::new("t").with_manual_pagination(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut store = mounted(flat_columns(), options, numbered_rows(300));
    assert_eq!(store.total_rows(), 300);
    assert_eq!(store.page_count(), None);
    assert!(store.can_next_page());

    let page_size = store.pagination().page_size;
    let mut v = RowVirtualizer::new(VirtualizerOptions::fixed(0, DEFAULT_ROW_HEIGHT));
    v.mount(DEFAULT_ROW_HEIGHT * page_size as u32);
    for offset in (0..12_000).step_by(400) {
        v.set_scroll_offset(offset);
        let plan = RenderPlan::compute(&store, &mut v);
        assert!(plan.rows().len() <= page_size + 2 * DEFAULT_OVERSCAN);
        assert!(!plan.rows().is_empty());
    }
    store.next_page();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn remote_pages_apply_in_arrival_order() {
    let options = GridOptions::new("t").with_manual_pagination(|_| {});
    let mut store = mounted(flat_columns(), options, Vec::new());
    let first = store.begin_fetch();
    assert!(store.is_loading());
    store.set_page_index(1).unwrap();
    let second = store.begin_fetch();
    assert_eq!((first.page_index, second.page_index), (0, 1));

    let page = |range: core::ops::Range<usize>| PageResponse {
        rows: range.map(|i| record(&format!("row{i}"), i as i64, "open")).collect(),
        total_count: 25,
    };
    store.receive_page::<String>(Ok(page(10..20)));
    store.receive_page::<String>(Ok(page(0..10)));
    assert!(!store.is_loading());
    assert_eq!(store.data()[0]["name"], "row0");
    assert_eq!(store.page_count(), Some(3));
}

#[test]
fn failed_fetch_shows_an_empty_page() {
    let options = GridOptions::new("t").with_manual_pagination(|_| {});
    let mut store = mounted(flat_columns(), options, numbered_rows(5));
    store.begin_fetch();
    let mut v = RowVirtualizer::new(VirtualizerOptions::fixed(0, 40));
    assert_eq!(
        RenderPlan::compute(&store, &mut v),
        RenderPlan::Loading { placeholder_rows: 1 }
    );
    store.receive_page(Err("503"));
    assert!(!store.is_loading());
    assert_eq!(RenderPlan::compute(&store, &mut v), RenderPlan::Empty { col_span: 3 });
}

#[test]
fn a_smaller_remote_total_pulls_the_page_back() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let storage = Arc::new(MemoryStore::new());
    let options = GridOptions::new("t")
        .with_storage(storage.clone())
        .with_manual_pagination(move |p: Pagination| sink.lock().unwrap().push(p.page_index));
    let mut store = mounted(flat_columns(), options, Vec::new());
    store.set_page_index(5).unwrap();
    store.begin_fetch();
    store.receive_page::<String>(Ok(PageResponse {
        rows: Vec::new(),
        total_count: 10,
    }));
    assert_eq!(store.page_count(), Some(1));
    assert_eq!(store.pagination().page_index, 0);
    assert_eq!(*seen.lock().unwrap(), vec![5, 0]);
    let saved = load_state(storage.as_ref(), "t").unwrap();
    assert_eq!(saved.pagination.page_index, 0);
}

#[test]
fn reported_page_count_clamp_is_saved_and_reported() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let storage = Arc::new(MemoryStore::new());
    let options = GridOptions::new("t")
        .with_storage(storage.clone())
        .with_manual_pagination(move |p: Pagination| sink.lock().unwrap().push(p.page_index));
    let mut store = mounted(flat_columns(), options, Vec::new());
    store.set_page_index(7).unwrap();
    store.set_page_count(Some(2));
    assert_eq!(store.pagination().page_index, 1);
    assert_eq!(load_state(storage.as_ref(), "t").unwrap().pagination.page_index, 1);
    assert_eq!(*seen.lock().unwrap(), vec![7, 1]);

    // No clamp, no extra report.
    store.set_page_count(Some(4));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn shrinking_local_data_saves_the_clamped_page() {
    let storage = Arc::new(MemoryStore::new());
    let options = GridOptions::new("t")
        .with_storage(storage.clone())
        .with_default_pagination(Pagination::new(0, 2));
    let mut store = mounted(flat_columns(), options, numbered_rows(10));
    store.set_page_index(4).unwrap();
    store.set_data(numbered_rows(3));
    assert_eq!(store.pagination().page_index, 1);
    assert_eq!(load_state(storage.as_ref(), "t").unwrap().pagination.page_index, 1);
}

#[test]
fn placeholder_rows_cover_the_padding() {
    let options = GridOptions::new("t").with_default_pagination(Pagination::new(0, 100));
    let store = mounted(flat_columns(), options, numbered_rows(100));
    let mut v = RowVirtualizer::new(VirtualizerOptions::fixed(0, 40).with_overscan(0));
    v.mount(400);
    let RenderPlan::Rows {
        window,
        rows,
        top_placeholder_rows,
        bottom_placeholder_rows,
    } = RenderPlan::compute(&store, &mut v)
    else {
        panic!("expected rows");
    };
    assert_eq!((window.start_index, window.end_index), (0, 9));
    assert_eq!(rows.len(), 10);
    assert_eq!((top_placeholder_rows, bottom_placeholder_rows), (0, 90));
}

// Selection.

#[test]
fn page_selection_toggles_every_leaf_on_the_page() {
    let options = GridOptions::new("t").with_selectable(true);
    let mut store = mounted(flat_columns(), options, numbered_rows(15));
    assert!(!store.is_all_page_rows_selected());
    store.toggle_all_page_rows_selected();
    assert!(store.is_all_page_rows_selected());
    assert_eq!(store.selected_row_count(), 10);
    store.toggle_row_selected("3");
    assert!(!store.is_row_selected("3"));
    assert!(!store.is_all_page_rows_selected());
    store.toggle_all_page_rows_selected();
    assert_eq!(store.selected_row_count(), 10);
    store.toggle_all_page_rows_selected();
    assert_eq!(store.selected_row_count(), 0);
}

// Row actions.

#[test]
fn locked_rows_render_delete_disabled() {
    let menu = delete_menu();
    let row = json!({ "locked": true });
    assert_eq!(
        menu.entries(&row),
        vec![
            MenuEntry::Label("Actions".into()),
            MenuEntry::Separator,
            MenuEntry::Separator,
            MenuEntry::Item {
                index: 1,
                label: "Delete".into(),
                disabled: true,
                class_name: None,
            },
        ]
    );
    assert!(!menu.entries(&row)[3].is_interactive());
    assert!(!menu.activate(1, &row));
}

#[test]
fn activation_invokes_on_click_with_the_row() {
    let clicks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&clicks);
    let menu = Arc::new(
        ActionMenu::new(
            "",
            vec![
                RowAction::item("Edit").with_on_click(move |row: &Value| {
                    let amount = row["amount"].as_u64().unwrap_or(0) as usize;
                    counter.fetch_add(amount, Ordering::SeqCst);
                }),
                RowAction::item("Archive").hidden_when(|row: &Value| row["status"] == "closed"),
            ],
        )
        .unwrap(),
    );
    let options = GridOptions::new("t").with_actions(Arc::clone(&menu));
    let store = mounted(flat_columns(), options, sample_rows());
    let rows = store.row_model().rows;
    assert!(store.activate_row_action(&rows[0], 0));
    assert_eq!(clicks.load(Ordering::SeqCst), 3);

    let closed = store.row_actions(&rows[1]);
    assert_eq!(closed.len(), 1);
    assert!(!store.activate_row_action(&rows[1], 1));
    assert!(!store.activate_row_action(&rows[1], 7));
}

#[test]
fn unlabeled_actions_fail_fast() {
    let err = ActionMenu::<Value>::new("Actions", vec![RowAction::divider(), RowAction::default()])
        .unwrap_err();
    assert_eq!(err, GridError::MissingActionLabel { index: 1 });
    assert!(ActionMenu::<Value>::new("Actions", vec![RowAction::item("")]).is_err());
}

#[test]
fn replacing_the_menu_rebuilds_the_model() {
    let mut store = mounted(flat_columns(), GridOptions::new("t"), sample_rows());
    assert!(!store.model().contains(ACTIONS_COLUMN_ID));
    store.set_actions(Some(delete_menu())).unwrap();
    assert!(store.model().contains(ACTIONS_COLUMN_ID));
    assert_eq!(store.column_pin(ACTIONS_COLUMN_ID), ColumnPin::Right);
    assert_eq!(store.state().column_order.last().map(String::as_str), Some("actions"));

    let before = Arc::clone(store.model());
    store.set_columns(nested_columns());
    store.set_selectable(false).unwrap();
    assert!(Arc::ptr_eq(&before, store.model()));
}
