use alloc::sync::Arc;
use core::cell::RefCell;
use std::collections::HashSet;

use crate::builder::{ACTIONS_COLUMN_ID, SELECT_COLUMN_ID};
use crate::column::{MAX_COLUMN_SIZE, MIN_COLUMN_SIZE};
use crate::drag::{DragController, DropOutcome};
use crate::header::{Header, HeaderGroup, build_header_groups};
use crate::layout::{self, ColumnLayout, PinSide, RightPinFormula};
use crate::row::{RowIdFn, RowModel, RowPipeline, page_count_for};
use crate::storage::{KeyValueStore, NoopStore, load_state, save_state};
use crate::{
    ActionMenu, ColumnDef, ColumnFilter, ColumnModel, ColumnModelBuilder, ColumnPin, GridError,
    GridState, MenuEntry, Pagination, Result, Row, SortEntry,
};

pub type PaginationHandler = Arc<dyn Fn(Pagination) + Send + Sync>;
pub type SortingHandler = Arc<dyn Fn(&[SortEntry]) + Send + Sync>;

/// Placeholder rows drawn while loading.
pub const DEFAULT_LOADING_ROWS: usize = 1;

/// Who computes a concern. `External` is the manual mode: the engine stops computing it and
/// reports every change to the handler instead.
pub enum Delegation<H> {
    Internal,
    External(H),
}

impl<H> Delegation<H> {
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::External(_))
    }

    pub fn handler(&self) -> Option<&H> {
        match self {
            Self::External(h) => Some(h),
            Self::Internal => None,
        }
    }
}

impl<H> Default for Delegation<H> {
    fn default() -> Self {
        Self::Internal
    }
}

impl<H: Clone> Clone for Delegation<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Internal => Self::Internal,
            Self::External(h) => Self::External(h.clone()),
        }
    }
}

impl<H> core::fmt::Debug for Delegation<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Internal => f.write_str("Internal"),
            Self::External(_) => f.write_str("External(..)"),
        }
    }
}

/// Configuration for [`GridStore`].
pub struct GridOptions<T> {
    pub table_id: String,
    /// When false, state is neither loaded nor saved.
    pub persisted: bool,
    pub storage: Arc<dyn KeyValueStore>,
    pub selectable: bool,
    pub actions: Option<Arc<ActionMenu<T>>>,
    pub pagination: Delegation<PaginationHandler>,
    pub sorting: Delegation<SortingHandler>,
    pub enable_filtering: bool,
    pub get_row_id: Option<RowIdFn<T>>,
    pub right_pin_formula: RightPinFormula,
    pub default_pagination: Pagination,
    /// Page count supplied by the caller in manual pagination.
    pub page_count: Option<usize>,
    pub loading_rows: usize,
}

impl<T> Clone for GridOptions<T> {
    fn clone(&self) -> Self {
        Self {
            table_id: self.table_id.clone(),
            persisted: self.persisted,
            storage: Arc::clone(&self.storage),
            selectable: self.selectable,
            actions: self.actions.clone(),
            pagination: self.pagination.clone(),
            sorting: self.sorting.clone(),
            enable_filtering: self.enable_filtering,
            get_row_id: self.get_row_id.clone(),
            right_pin_formula: self.right_pin_formula,
            default_pagination: self.default_pagination,
            page_count: self.page_count,
            loading_rows: self.loading_rows,
        }
    }
}

impl<T> GridOptions<T> {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            persisted: true,
            storage: Arc::new(NoopStore),
            selectable: false,
            actions: None,
            pagination: Delegation::Internal,
            sorting: Delegation::Internal,
            enable_filtering: false,
            get_row_id: None,
            right_pin_formula: RightPinFormula::Legacy,
            default_pagination: Pagination::default(),
            page_count: None,
            loading_rows: DEFAULT_LOADING_ROWS,
        }
    }

    pub fn with_persisted(mut self, persisted: bool) -> Self {
        self.persisted = persisted;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    pub fn with_actions(mut self, actions: Arc<ActionMenu<T>>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn with_manual_pagination(
        mut self,
        f: impl Fn(Pagination) + Send + Sync + 'static,
    ) -> Self {
        self.pagination = Delegation::External(Arc::new(f));
        self
    }

    pub fn with_manual_sorting(mut self, f: impl Fn(&[SortEntry]) + Send + Sync + 'static) -> Self {
        self.sorting = Delegation::External(Arc::new(f));
        self
    }

    pub fn with_filtering(mut self, enabled: bool) -> Self {
        self.enable_filtering = enabled;
        self
    }

    pub fn with_get_row_id(
        mut self,
        f: impl Fn(&T, usize) -> String + Send + Sync + 'static,
    ) -> Self {
        self.get_row_id = Some(Arc::new(f));
        self
    }

    pub fn with_right_pin_formula(mut self, formula: RightPinFormula) -> Self {
        self.right_pin_formula = formula;
        self
    }

    pub fn with_default_pagination(mut self, pagination: Pagination) -> Self {
        self.default_pagination = pagination;
        self
    }

    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = Some(page_count);
        self
    }

    pub fn with_loading_rows(mut self, rows: usize) -> Self {
        self.loading_rows = rows;
        self
    }
}

impl<T> core::fmt::Debug for GridOptions<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GridOptions")
            .field("table_id", &self.table_id)
            .field("persisted", &self.persisted)
            .field("selectable", &self.selectable)
            .field("pagination", &self.pagination)
            .field("sorting", &self.sorting)
            .field("enable_filtering", &self.enable_filtering)
            .field("right_pin_formula", &self.right_pin_formula)
            .field("default_pagination", &self.default_pagination)
            .field("page_count", &self.page_count)
            .finish_non_exhaustive()
    }
}

/// Query for one remote page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page_index: usize,
    pub page_size: usize,
    pub sorting: Vec<SortEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageResponse<T> {
    pub rows: Vec<T>,
    pub total_count: usize,
}

/// Owns the view state of one grid and derives everything drawn from it.
///
/// All transitions are synchronous and write through to the injected [`KeyValueStore`] once
/// the store is mounted.
pub struct GridStore<T> {
    columns: Vec<ColumnDef<T>>,
    options: GridOptions<T>,
    builder: ColumnModelBuilder<T>,
    model: Arc<ColumnModel<T>>,
    state: GridState,
    data: Vec<T>,
    loading: bool,
    mounted: bool,
    page_count: Option<usize>,
    drag: DragController,
    layout_revision: u64,
    layout_cache: RefCell<Option<(u64, Arc<ColumnLayout>)>>,
}

impl<T> GridStore<T> {
    pub fn new(columns: Vec<ColumnDef<T>>, options: GridOptions<T>) -> Result<Self> {
        let mut builder = ColumnModelBuilder::new();
        let model = builder.build(&columns, options.selectable, options.actions.as_ref())?;
        let state = default_state(&model, &options);
        let page_count = options.page_count;
        Ok(Self {
            columns,
            options,
            builder,
            model,
            state,
            data: Vec::new(),
            loading: false,
            mounted: false,
            page_count,
            drag: DragController::new(),
            layout_revision: 0,
            layout_cache: RefCell::new(None),
        })
    }

    pub fn with_data(mut self, data: Vec<T>) -> Self {
        self.data = data;
        self
    }

    /// Hydrates from storage, pins the synthetic columns and saves. A second call is a no-op.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.state = self.hydrate();
        self.mounted = true;
        self.pin_synthetic_columns();
        self.clamp_page_index();
        gdebug!(
            table_id = %self.options.table_id,
            columns = self.model.len(),
            rows = self.data.len(),
            "GridStore::mount"
        );
        self.invalidate_layout();
        self.commit();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// The state a mount would start from: the persisted snapshot normalized against the current
    /// column model, or the defaults on a miss. Reads storage, changes nothing.
    pub fn hydrate(&self) -> GridState {
        let loaded = if self.options.persisted {
            load_state(self.options.storage.as_ref(), &self.options.table_id)
        } else {
            None
        };
        match loaded {
            Some(state) => {
                gdebug!(table_id = %self.options.table_id, "hydrated persisted grid state");
                normalize_state(state, &self.model, &self.options)
            }
            None => default_state(&self.model, &self.options),
        }
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn options(&self) -> &GridOptions<T> {
        &self.options
    }

    pub fn model(&self) -> &Arc<ColumnModel<T>> {
        &self.model
    }

    pub fn columns(&self) -> &[ColumnDef<T>] {
        &self.columns
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_manual_pagination(&self) -> bool {
        self.options.pagination.is_manual()
    }

    pub fn is_manual_sorting(&self) -> bool {
        self.options.sorting.is_manual()
    }

    pub fn action_menu(&self) -> Option<&Arc<ActionMenu<T>>> {
        self.options.actions.as_ref()
    }

    /// Menu lines for a row; empty for group rows and when no actions are configured.
    pub fn row_actions(&self, row: &Row) -> Vec<MenuEntry> {
        match (self.action_menu(), self.original(row)) {
            (Some(menu), Some(record)) => menu.entries(record),
            _ => Vec::new(),
        }
    }

    pub fn activate_row_action(&self, row: &Row, index: usize) -> bool {
        match (self.action_menu(), self.original(row)) {
            (Some(menu), Some(record)) => menu.activate(index, record),
            _ => false,
        }
    }

    // Columns.

    /// Replaces the declared columns. The model is only rebuilt when `selectable` or the action
    /// menu changes, so this alone keeps the current model.
    pub fn set_columns(&mut self, columns: Vec<ColumnDef<T>>) {
        self.columns = columns;
    }

    pub fn set_selectable(&mut self, selectable: bool) -> Result<()> {
        self.options.selectable = selectable;
        self.rebuild_model()
    }

    pub fn set_actions(&mut self, actions: Option<Arc<ActionMenu<T>>>) -> Result<()> {
        self.options.actions = actions;
        self.rebuild_model()
    }

    fn rebuild_model(&mut self) -> Result<()> {
        let model = self.builder.build(
            &self.columns,
            self.options.selectable,
            self.options.actions.as_ref(),
        )?;
        if Arc::ptr_eq(&model, &self.model) {
            return Ok(());
        }
        self.model = model;
        let state = core::mem::take(&mut self.state);
        self.state = normalize_state(state, &self.model, &self.options);
        if self.mounted {
            self.pin_synthetic_columns();
        }
        self.invalidate_layout();
        self.commit();
        Ok(())
    }

    fn node_index(&self, column_id: &str) -> Result<usize> {
        self.model
            .index_of(column_id)
            .ok_or_else(|| GridError::UnknownColumn(column_id.to_string()))
    }

    /// Unknown and duplicate ids are dropped; columns missing from `order` are appended.
    pub fn set_column_order<I, S>(&mut self, order: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = order.into_iter().map(Into::into).collect();
        self.state.column_order = normalize_order(&order, &self.model);
        gtrace!(order = ?self.state.column_order, "GridStore::set_column_order");
        self.invalidate_layout();
        self.commit();
    }

    /// Groups are visible while any descendant leaf is visible.
    pub fn is_column_visible(&self, column_id: &str) -> bool {
        let Some(idx) = self.model.index_of(column_id) else {
            return false;
        };
        self.model
            .descendant_leaves(idx)
            .into_iter()
            .any(|leaf| self.state.is_leaf_visible(&self.model.nodes()[leaf].id))
    }

    /// Hides or shows a column. On a group the change cascades to every hideable leaf under it.
    pub fn set_column_visibility(&mut self, column_id: &str, visible: bool) -> Result<()> {
        let idx = self.node_index(column_id)?;
        let leaves: Vec<usize> = self
            .model
            .descendant_leaves(idx)
            .into_iter()
            .filter(|&leaf| self.model.nodes()[leaf].capabilities.can_hide)
            .collect();
        if leaves.is_empty() || !self.model.nodes()[idx].capabilities.can_hide {
            return Err(GridError::NotHideable(column_id.to_string()));
        }
        for leaf in leaves {
            let id = self.model.nodes()[leaf].id.clone();
            self.state.column_visibility.insert(id, visible);
        }
        gtrace!(column_id, visible, "GridStore::set_column_visibility");
        self.invalidate_layout();
        self.commit();
        Ok(())
    }

    pub fn toggle_column_visibility(&mut self, column_id: &str) -> Result<()> {
        let visible = self.is_column_visible(column_id);
        self.set_column_visibility(column_id, !visible)
    }

    /// A group reports a pin only when all of its leaves share it.
    pub fn column_pin(&self, column_id: &str) -> ColumnPin {
        let Some(idx) = self.model.index_of(column_id) else {
            return ColumnPin::None;
        };
        let mut pins = self
            .model
            .descendant_leaves(idx)
            .into_iter()
            .map(|leaf| self.state.leaf_pin(&self.model.nodes()[leaf].id));
        let Some(first) = pins.next() else {
            return ColumnPin::None;
        };
        if pins.all(|p| p == first) { first } else { ColumnPin::None }
    }

    /// Pins a column. On a group the pin cascades to every pinnable leaf under it.
    pub fn set_column_pinning(&mut self, column_id: &str, pin: ColumnPin) -> Result<()> {
        let idx = self.node_index(column_id)?;
        if !self.model.nodes()[idx].capabilities.can_pin {
            return Err(GridError::NotPinnable(column_id.to_string()));
        }
        let leaves: Vec<String> = self
            .model
            .descendant_leaves(idx)
            .into_iter()
            .filter(|&leaf| self.model.nodes()[leaf].capabilities.can_pin)
            .map(|leaf| self.model.nodes()[leaf].id.clone())
            .collect();
        for id in leaves {
            apply_pin(&mut self.state, id, pin);
        }
        gtrace!(column_id, pin = ?pin, "GridStore::set_column_pinning");
        self.invalidate_layout();
        self.commit();
        Ok(())
    }

    /// Leaf width; for a group the summed width of its visible leaves.
    pub fn column_size(&self, column_id: &str) -> Option<u32> {
        let idx = self.model.index_of(column_id)?;
        let node = &self.model.nodes()[idx];
        if node.is_leaf() {
            return Some(self.model.leaf_size(idx, &self.state));
        }
        let sum: u64 = self
            .model
            .descendant_leaves(idx)
            .into_iter()
            .filter(|&leaf| self.state.is_leaf_visible(&self.model.nodes()[leaf].id))
            .map(|leaf| self.model.leaf_size(leaf, &self.state) as u64)
            .sum();
        Some(sum.min(u32::MAX as u64) as u32)
    }

    pub fn set_column_sizing(&mut self, column_id: &str, size: u32) -> Result<()> {
        let idx = self.resizable_leaf(column_id)?;
        let size = size.clamp(MIN_COLUMN_SIZE, MAX_COLUMN_SIZE);
        let id = self.model.nodes()[idx].id.clone();
        self.state.column_sizing.insert(id, size);
        gtrace!(column_id, size, "GridStore::set_column_sizing");
        self.invalidate_layout();
        self.commit();
        Ok(())
    }

    pub fn reset_column_sizing(&mut self) {
        self.state.column_sizing.clear();
        self.invalidate_layout();
        self.commit();
    }

    fn resizable_leaf(&self, column_id: &str) -> Result<usize> {
        let idx = self.node_index(column_id)?;
        let node = &self.model.nodes()[idx];
        if !node.is_leaf() || !node.capabilities.can_resize {
            return Err(GridError::NotResizable(column_id.to_string()));
        }
        Ok(idx)
    }

    pub fn begin_column_resize(&mut self, column_id: &str, pointer_x: i64) -> Result<()> {
        let idx = self.resizable_leaf(column_id)?;
        let size = self.model.leaf_size(idx, &self.state);
        layout::begin_resize(&mut self.state.column_sizing_info, column_id, pointer_x, size);
        self.commit();
        Ok(())
    }

    /// Returns true when the column width changed.
    pub fn update_column_resize(&mut self, pointer_x: i64) -> bool {
        let Some(column_id) = self.state.column_sizing_info.is_resizing_column.clone() else {
            return false;
        };
        let current = self.column_size(&column_id).unwrap_or_default();
        let change = layout::update_resize(&mut self.state.column_sizing_info, pointer_x, current);
        if let Some((id, size)) = &change {
            self.state.column_sizing.insert(id.clone(), *size);
            self.invalidate_layout();
        }
        self.commit();
        change.is_some()
    }

    pub fn end_column_resize(&mut self) {
        if layout::end_resize(&mut self.state.column_sizing_info).is_some() {
            self.commit();
        }
    }

    pub fn is_resizing(&self) -> bool {
        self.state.column_sizing_info.is_resizing_column.is_some()
    }

    // Sorting.

    pub fn set_sorting(&mut self, sorting: Vec<SortEntry>) -> Result<()> {
        let mut seen = HashSet::new();
        let mut next = Vec::with_capacity(sorting.len());
        for entry in sorting {
            let idx = self.node_index(&entry.id)?;
            let node = &self.model.nodes()[idx];
            if !node.is_leaf() || !node.capabilities.can_sort {
                return Err(GridError::NotSortable(entry.id));
            }
            if seen.insert(entry.id.clone()) {
                next.push(entry);
            }
        }
        self.state.sorting = next;
        gtrace!(sorting = ?self.state.sorting, "GridStore::set_sorting");
        if let Some(handler) = self.options.sorting.handler() {
            handler(&self.state.sorting);
        }
        self.commit();
        Ok(())
    }

    /// Cycles `none -> asc -> desc -> none`. Without `multi` the other sort keys are dropped.
    pub fn toggle_sorting(&mut self, column_id: &str, multi: bool) -> Result<()> {
        let current = self.state.sort_entry(column_id).map(|e| e.desc);
        let mut sorting: Vec<SortEntry> = if multi {
            self.state
                .sorting
                .iter()
                .filter(|e| e.id != column_id)
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        match current {
            None => sorting.push(SortEntry::asc(column_id)),
            Some(false) => sorting.push(SortEntry::desc(column_id)),
            Some(true) => {}
        }
        if multi {
            // Keep the toggled key where it was.
            let toggled = sorting.last().is_some_and(|e| e.id == column_id);
            let pos = self.state.sorting.iter().position(|e| e.id == column_id);
            if let (true, Some(pos)) = (toggled, pos) {
                if let Some(entry) = sorting.pop() {
                    sorting.insert(pos.min(sorting.len()), entry);
                }
            }
        }
        self.set_sorting(sorting)
    }

    pub fn clear_sorting(&mut self) {
        self.state.sorting.clear();
        if let Some(handler) = self.options.sorting.handler() {
            handler(&self.state.sorting);
        }
        self.commit();
    }

    // Pagination.

    pub fn pagination(&self) -> Pagination {
        self.state.pagination
    }

    pub fn set_pagination(&mut self, pagination: Pagination) -> Result<()> {
        if pagination.page_size == 0 {
            return Err(GridError::InvalidPageSize);
        }
        self.state.pagination = pagination;
        self.clamp_page_index();
        gtrace!(
            page_index = self.state.pagination.page_index,
            page_size = self.state.pagination.page_size,
            "GridStore::set_pagination"
        );
        if let Some(handler) = self.options.pagination.handler() {
            handler(self.state.pagination);
        }
        self.commit();
        Ok(())
    }

    pub fn set_page_index(&mut self, page_index: usize) -> Result<()> {
        self.set_pagination(Pagination::new(page_index, self.state.pagination.page_size))
    }

    /// Changes the page size keeping the first row of the current page on screen.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(GridError::InvalidPageSize);
        }
        let Pagination {
            page_index,
            page_size: old,
        } = self.state.pagination;
        let page_index = page_index.saturating_mul(old) / page_size;
        self.set_pagination(Pagination::new(page_index, page_size))
    }

    pub fn next_page(&mut self) -> bool {
        if !self.can_next_page() {
            return false;
        }
        self.set_page_index(self.state.pagination.page_index + 1).is_ok()
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.can_previous_page() {
            return false;
        }
        self.set_page_index(self.state.pagination.page_index - 1).is_ok()
    }

    pub fn first_page(&mut self) -> bool {
        self.can_previous_page() && self.set_page_index(0).is_ok()
    }

    pub fn last_page(&mut self) -> bool {
        match self.page_count() {
            Some(count) if count > 0 && self.can_next_page() => {
                self.set_page_index(count - 1).is_ok()
            }
            _ => false,
        }
    }

    /// Total pages; `None` in manual pagination when the caller has not reported a count.
    pub fn page_count(&self) -> Option<usize> {
        if self.is_manual_pagination() {
            return self.page_count;
        }
        Some(page_count_for(
            self.pipeline().run().pre_pagination_len,
            self.state.pagination.page_size,
        ))
    }

    pub fn set_page_count(&mut self, page_count: Option<usize>) {
        self.page_count = page_count;
        self.settle_page_index();
    }

    pub fn can_previous_page(&self) -> bool {
        self.state.pagination.page_index > 0
    }

    /// An unknown page count never blocks paging forward.
    pub fn can_next_page(&self) -> bool {
        self.page_count()
            .is_none_or(|count| self.state.pagination.page_index + 1 < count)
    }

    fn clamp_page_index(&mut self) -> bool {
        let Some(count) = self.page_count() else {
            return false;
        };
        let last = count.saturating_sub(1);
        if self.state.pagination.page_index > last {
            self.state.pagination.page_index = last;
            return true;
        }
        false
    }

    /// Clamps after the page count shrank. A moved index is reported and saved like any
    /// other pagination change.
    fn settle_page_index(&mut self) {
        if !self.clamp_page_index() {
            return;
        }
        gtrace!(page_index = self.state.pagination.page_index, "GridStore::settle_page_index");
        if let Some(handler) = self.options.pagination.handler() {
            handler(self.state.pagination);
        }
        self.commit();
    }

    // Selection.

    pub fn is_row_selected(&self, row_id: &str) -> bool {
        self.state.row_selection.contains(row_id)
    }

    pub fn toggle_row_selected(&mut self, row_id: &str) {
        if !self.state.row_selection.remove(row_id) {
            self.state.row_selection.insert(row_id.to_string());
        }
        self.commit();
    }

    pub fn selected_row_count(&self) -> usize {
        self.state.row_selection.len()
    }

    pub fn clear_selection(&mut self) {
        self.state.row_selection.clear();
        self.commit();
    }

    /// False for a page without leaf rows.
    pub fn is_all_page_rows_selected(&self) -> bool {
        let model = self.row_model();
        let mut leaves = model.leaf_rows().peekable();
        leaves.peek().is_some() && leaves.all(|r| self.is_row_selected(&r.id))
    }

    pub fn toggle_all_page_rows_selected(&mut self) {
        let select = !self.is_all_page_rows_selected();
        let ids: Vec<String> = self.row_model().leaf_rows().map(|r| r.id.clone()).collect();
        for id in ids {
            if select {
                self.state.row_selection.insert(id);
            } else {
                self.state.row_selection.remove(&id);
            }
        }
        self.commit();
    }

    // Grouping and filtering.

    pub fn set_grouping(&mut self, grouping: Vec<String>) -> Result<()> {
        let mut next: Vec<String> = Vec::with_capacity(grouping.len());
        for id in grouping {
            let idx = self.node_index(&id)?;
            if !self.model.nodes()[idx].has_accessor() {
                return Err(GridError::NoAccessor(id));
            }
            if !next.contains(&id) {
                next.push(id);
            }
        }
        self.state.grouping = next;
        gtrace!(grouping = ?self.state.grouping, "GridStore::set_grouping");
        self.clamp_page_index();
        self.invalidate_layout();
        self.commit();
        Ok(())
    }

    pub fn is_expanded(&self, row_id: &str) -> bool {
        self.state.expanded.contains(row_id)
    }

    pub fn toggle_expanded(&mut self, row_id: &str) {
        if !self.state.expanded.remove(row_id) {
            self.state.expanded.insert(row_id.to_string());
        }
        self.clamp_page_index();
        self.commit();
    }

    pub fn set_global_filter(&mut self, filter: impl Into<String>) {
        self.state.global_filter = filter.into();
        self.after_filter_change();
    }

    pub fn set_column_filters(&mut self, filters: Vec<ColumnFilter>) -> Result<()> {
        for filter in &filters {
            self.node_index(&filter.id)?;
        }
        self.state.column_filters = filters;
        self.after_filter_change();
        Ok(())
    }

    fn after_filter_change(&mut self) {
        if !self.is_manual_pagination() {
            self.state.pagination.page_index = 0;
        }
        self.commit();
    }

    // Data events.

    pub fn set_data(&mut self, data: Vec<T>) {
        self.data = data;
        self.settle_page_index();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Marks the grid as loading and describes the page the caller should fetch.
    pub fn begin_fetch(&mut self) -> PageRequest {
        self.loading = true;
        PageRequest {
            page_index: self.state.pagination.page_index,
            page_size: self.state.pagination.page_size,
            sorting: self.state.sorting.clone(),
        }
    }

    /// Delivers a fetched page. Responses are applied in arrival order; a late response for an
    /// older request overwrites newer rows.
    pub fn receive_page<E: core::fmt::Display>(
        &mut self,
        response: core::result::Result<PageResponse<T>, E>,
    ) {
        self.loading = false;
        match response {
            Ok(page) => {
                let size = self.state.pagination.page_size.max(1);
                self.page_count = Some(page.total_count.div_ceil(size));
                gtrace!(
                    rows = page.rows.len(),
                    total = page.total_count,
                    "GridStore::receive_page"
                );
                self.data = page.rows;
                self.settle_page_index();
            }
            Err(_err) => {
                gwarn!(error = %_err, "page fetch failed; showing an empty page");
                self.data.clear();
            }
        }
    }

    // Derived data.

    /// Raw data as seen by the row model: empty while loading.
    fn effective_data(&self) -> &[T] {
        if self.loading { &[] } else { &self.data }
    }

    fn pipeline(&self) -> RowPipeline<'_, T> {
        RowPipeline {
            data: self.effective_data(),
            model: &self.model,
            state: &self.state,
            manual_sorting: self.is_manual_sorting(),
            manual_pagination: self.is_manual_pagination(),
            enable_filtering: self.options.enable_filtering,
            get_row_id: self.options.get_row_id.as_ref(),
        }
    }

    pub fn row_model(&self) -> RowModel {
        self.pipeline().run()
    }

    /// Raw data length in manual pagination, otherwise the length of the row model.
    pub fn total_rows(&self) -> usize {
        if self.is_manual_pagination() {
            self.effective_data().len()
        } else {
            self.row_model().len()
        }
    }

    pub fn original(&self, row: &Row) -> Option<&T> {
        self.data.get(row.source_index()?)
    }

    fn invalidate_layout(&mut self) {
        self.layout_revision += 1;
    }

    /// Column placements, recomputed only after order, sizing, pinning, visibility or grouping
    /// changed. Empty before [`Self::mount`].
    pub fn layout(&self) -> Arc<ColumnLayout> {
        if !self.mounted {
            return Arc::new(ColumnLayout::default());
        }
        let mut cache = self.layout_cache.borrow_mut();
        if let Some((revision, layout)) = cache.as_ref() {
            if *revision == self.layout_revision {
                return Arc::clone(layout);
            }
        }
        let layout = Arc::new(ColumnLayout::compute(
            &self.model,
            &self.state,
            self.options.right_pin_formula,
        ));
        *cache = Some((self.layout_revision, Arc::clone(&layout)));
        layout
    }

    pub fn column_offset(&self, column_id: &str, side: PinSide) -> u64 {
        self.layout().offset(column_id, side)
    }

    pub fn total_width(&self) -> u64 {
        self.layout().total_width()
    }

    pub fn header_groups(&self) -> Vec<HeaderGroup> {
        if !self.mounted {
            return Vec::new();
        }
        build_header_groups(&self.model, &self.layout())
    }

    // Drag and drop.

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn begin_column_drag(&mut self, header: &Header) -> bool {
        self.drag.begin(header.drag_payload(), header.is_draggable())
    }

    pub fn can_drop_on(&self, header: &Header) -> bool {
        self.drag.can_drop(&header.drop_target())
    }

    /// Ends the active drag over `header` and applies the new column order on success.
    pub fn drop_column(&mut self, header: &Header) -> DropOutcome {
        let outcome = self.drag.drop(&header.drop_target(), &self.state.column_order);
        if let DropOutcome::Dropped(order) = &outcome {
            self.set_column_order(order.iter().cloned());
        }
        outcome
    }

    pub fn cancel_column_drag(&mut self) {
        self.drag.cancel();
    }

    fn pin_synthetic_columns(&mut self) {
        if self.options.selectable
            && self.model.contains(SELECT_COLUMN_ID)
            && !self.state.leaf_pin(SELECT_COLUMN_ID).is_pinned()
        {
            apply_pin(&mut self.state, SELECT_COLUMN_ID.to_string(), ColumnPin::Left);
        }
        if self.model.contains(ACTIONS_COLUMN_ID)
            && !self.state.leaf_pin(ACTIONS_COLUMN_ID).is_pinned()
        {
            apply_pin(&mut self.state, ACTIONS_COLUMN_ID.to_string(), ColumnPin::Right);
        }
    }

    /// Writes the state through to storage. Failures are logged and dropped.
    fn commit(&self) {
        if !self.mounted || !self.options.persisted {
            return;
        }
        let storage = self.options.storage.as_ref();
        if let Err(_err) = save_state(storage, &self.options.table_id, &self.state) {
            gwarn!(
                table_id = %self.options.table_id,
                error = %_err,
                "failed to persist grid state"
            );
        }
    }
}

impl<T> core::fmt::Debug for GridStore<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GridStore")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("rows", &self.data.len())
            .field("loading", &self.loading)
            .field("mounted", &self.mounted)
            .field("page_count", &self.page_count)
            .finish_non_exhaustive()
    }
}

fn apply_pin(state: &mut GridState, id: String, pin: ColumnPin) {
    if pin.is_pinned() {
        state.column_pinning.insert(id, pin);
    } else {
        state.column_pinning.remove(&id);
    }
}

fn default_state<T>(model: &ColumnModel<T>, options: &GridOptions<T>) -> GridState {
    GridState {
        column_order: model.identity_order(),
        pagination: options.default_pagination,
        ..GridState::default()
    }
}

fn normalize_order<T>(order: &[String], model: &ColumnModel<T>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(model.len());
    let mut out = Vec::with_capacity(model.len());
    for id in order {
        if model.contains(id) && seen.insert(id.as_str()) {
            out.push(id.clone());
        }
    }
    for node in model.nodes() {
        if !seen.contains(node.id.as_str()) {
            out.push(node.id.clone());
        }
    }
    out
}

/// Aligns a stored state with the column model: unknown ids are dropped, group entries are
/// expanded onto their leaves and values out of range are reset.
fn normalize_state<T>(
    mut state: GridState,
    model: &ColumnModel<T>,
    options: &GridOptions<T>,
) -> GridState {
    state.column_order = normalize_order(&state.column_order, model);

    let mut visibility = core::mem::take(&mut state.column_visibility);
    let mut pinning = core::mem::take(&mut state.column_pinning);
    for (idx, node) in model.nodes().iter().enumerate() {
        if node.is_leaf() {
            continue;
        }
        let group_visible = visibility.remove(&node.id);
        let group_pin = pinning.remove(&node.id);
        for leaf in model.descendant_leaves(idx) {
            let leaf_id = &model.nodes()[leaf].id;
            if let Some(v) = group_visible {
                visibility.entry(leaf_id.clone()).or_insert(v);
            }
            if let Some(p) = group_pin {
                pinning.entry(leaf_id.clone()).or_insert(p);
            }
        }
    }
    state.column_visibility = visibility
        .into_iter()
        .filter(|(id, visible)| {
            model
                .get(id)
                .is_some_and(|n| n.is_leaf() && (*visible || n.capabilities.can_hide))
        })
        .collect();
    state.column_pinning = pinning
        .into_iter()
        .filter(|(id, pin)| pin.is_pinned() && model.get(id).is_some_and(|n| n.is_leaf()))
        .collect();
    state.column_sizing = core::mem::take(&mut state.column_sizing)
        .into_iter()
        .filter(|(id, _)| model.get(id).is_some_and(|n| n.is_leaf()))
        .map(|(id, size)| (id, size.clamp(MIN_COLUMN_SIZE, MAX_COLUMN_SIZE)))
        .collect();

    let mut seen = HashSet::new();
    state.sorting.retain(|entry| {
        model
            .get(&entry.id)
            .is_some_and(|n| n.is_leaf() && n.capabilities.can_sort)
            && seen.insert(entry.id.clone())
    });
    state.column_filters.retain(|f| model.contains(&f.id));
    let mut seen = HashSet::new();
    state
        .grouping
        .retain(|id| model.get(id).is_some_and(|n| n.has_accessor()) && seen.insert(id.clone()));

    if state.pagination.page_size == 0 {
        state.pagination.page_size = options.default_pagination.page_size.max(1);
    }
    state.column_sizing_info = Default::default();
    state
}
