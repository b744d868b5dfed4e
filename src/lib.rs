//! A headless data-grid engine.
//!
//! The crate owns the state and the math behind an interactive table: column trees with
//! synthetic select/actions columns, visibility cascades, pinning, resizing, drag-to-reorder,
//! client or server driven sorting and pagination, row virtualization, and view state persisted
//! through a pluggable key-value store.
//!
//! It is UI-agnostic. A presentation layer is expected to provide:
//! - the raw rows (or fetch them page by page)
//! - viewport size and scroll offset
//! - pointer events for resizing and dragging headers
//!
//! and draws the [`RenderPlan`], [`HeaderGroup`]s and [`MenuEntry`] lists it gets back.
#![forbid(unsafe_code)]

extern crate alloc;

#[macro_use]
mod macros;

mod actions;
mod builder;
mod column;
mod drag;
mod error;
mod header;
mod height_index;
mod layout;
mod render;
mod row;
mod state;
mod storage;
mod store;
mod value;
mod virtualizer;

#[cfg(test)]
mod tests;

pub use actions::{
    ActionMenu, DEFAULT_ACTIONS_LABEL, Flag, MenuEntry, RowAction, RowCallback, RowPredicate,
};
pub use builder::{ACTIONS_COLUMN_ID, ColumnModel, ColumnModelBuilder, ColumnNode, SELECT_COLUMN_ID};
pub use column::{
    AccessorFn, ColumnCapabilities, ColumnDef, ColumnKind, DEFAULT_COLUMN_SIZE, MAX_COLUMN_SIZE,
    MIN_COLUMN_SIZE, RowRef, SortFn,
};
pub use drag::{
    DragController, DragPayload, DragState, DropOutcome, DropTarget, accepts, can_drag, reorder,
};
pub use error::{GridError, Result, StorageError};
pub use header::{Header, HeaderGroup};
pub use layout::{ColumnLayout, ColumnPlacement, PinSide, RightPinFormula};
pub use render::RenderPlan;
pub use row::{Row, RowIdFn, RowKind, RowModel};
pub use state::{
    ColumnFilter, ColumnPin, ColumnSizingInfo, DEFAULT_PAGE_SIZE, GridState, PAGE_SIZE_OPTIONS,
    Pagination, SortEntry,
};
pub use storage::{
    KeyValueStore, MemoryStore, NoopStore, STORAGE_KEY_PREFIX, load_state, save_state, storage_key,
};
pub use store::{
    DEFAULT_LOADING_ROWS, Delegation, GridOptions, GridStore, PageRequest, PageResponse,
    PaginationHandler, SortingHandler,
};
pub use value::{CellValue, RowRecord};
pub use virtualizer::{
    DEFAULT_OVERSCAN, DEFAULT_ROW_HEIGHT, EstimateRowHeight, RowKeyFn, RowVirtualizer, Viewport,
    VirtualizerOptions, VisibleRow, VisibleWindow, visible_window,
};
