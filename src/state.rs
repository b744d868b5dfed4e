use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Page sizes offered by the pagination control.
pub const PAGE_SIZE_OPTIONS: [usize; 6] = [10, 20, 30, 40, 50, 100];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPin {
    #[default]
    None,
    Left,
    Right,
}

impl ColumnPin {
    pub fn is_pinned(self) -> bool {
        self != Self::None
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub id: String,
    pub desc: bool,
}

impl SortEntry {
    pub fn asc(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: false,
        }
    }

    pub fn desc(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub id: String,
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Index of the first row on the current page.
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }
}

/// An in-progress column resize (pointer positions in pixels).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnSizingInfo {
    pub is_resizing_column: Option<String>,
    pub start_offset: Option<i64>,
    pub start_size: Option<u32>,
    pub delta_offset: Option<i64>,
}

/// The persisted view state of one grid.
///
/// Every field defaults on its own, so a stored object missing some keys still restores the
/// others.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridState {
    pub sorting: Vec<SortEntry>,
    pub column_filters: Vec<ColumnFilter>,
    pub column_order: Vec<String>,
    /// Leaf columns only; group visibility is derived.
    pub column_visibility: BTreeMap<String, bool>,
    /// Leaf columns only; unpinned columns have no entry.
    pub column_pinning: BTreeMap<String, ColumnPin>,
    pub column_sizing: BTreeMap<String, u32>,
    pub column_sizing_info: ColumnSizingInfo,
    pub pagination: Pagination,
    pub row_selection: BTreeSet<String>,
    pub grouping: Vec<String>,
    pub expanded: BTreeSet<String>,
    pub global_filter: String,
}

impl GridState {
    pub fn is_leaf_visible(&self, id: &str) -> bool {
        self.column_visibility.get(id).copied().unwrap_or(true)
    }

    pub fn leaf_pin(&self, id: &str) -> ColumnPin {
        self.column_pinning.get(id).copied().unwrap_or_default()
    }

    pub fn sort_entry(&self, id: &str) -> Option<&SortEntry> {
        self.sorting.iter().find(|s| s.id == id)
    }

    pub fn is_grouped_by(&self, id: &str) -> bool {
        self.grouping.iter().any(|g| g == id)
    }
}
