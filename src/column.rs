use alloc::sync::Arc;
use core::cmp::Ordering;

use crate::{CellValue, RowRecord};

/// Default column width when neither the descriptor nor the sizing state sets one.
pub const DEFAULT_COLUMN_SIZE: u32 = 150;
/// Lower bound applied to every resize.
pub const MIN_COLUMN_SIZE: u32 = 20;
pub const MAX_COLUMN_SIZE: u32 = u32::MAX;

/// A source row handed to custom sort comparators.
#[derive(Debug)]
pub struct RowRef<'a, T> {
    /// Position in the raw data slice.
    pub index: usize,
    pub original: &'a T,
}

impl<T> Clone for RowRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RowRef<'_, T> {}

pub type AccessorFn<T> = Arc<dyn Fn(&T) -> CellValue + Send + Sync>;
pub type SortFn<T> = Arc<dyn Fn(RowRef<'_, T>, RowRef<'_, T>) -> Ordering + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnCapabilities {
    pub can_sort: bool,
    pub can_hide: bool,
    pub can_pin: bool,
    pub can_resize: bool,
    pub can_filter: bool,
}

impl ColumnCapabilities {
    pub const ALL: Self = Self {
        can_sort: true,
        can_hide: true,
        can_pin: true,
        can_resize: true,
        can_filter: true,
    };

    pub const NONE: Self = Self {
        can_sort: false,
        can_hide: false,
        can_pin: false,
        can_resize: false,
        can_filter: false,
    };
}

impl Default for ColumnCapabilities {
    fn default() -> Self {
        Self::ALL
    }
}

/// What a column stands for. Synthetic columns are injected by the column model builder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnKind {
    #[default]
    Data,
    Select,
    Actions,
}

/// A declarative column (or column group, when `children` is non-empty).
pub struct ColumnDef<T> {
    pub id: String,
    pub header: String,
    pub accessor: Option<AccessorFn<T>>,
    /// The dot-path the accessor reads, when it was built from one.
    pub accessor_path: Option<String>,
    pub size: Option<u32>,
    pub capabilities: ColumnCapabilities,
    pub sort_fn: Option<SortFn<T>>,
    pub children: Vec<ColumnDef<T>>,
    pub kind: ColumnKind,
}

impl<T> Clone for ColumnDef<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            header: self.header.clone(),
            accessor: self.accessor.clone(),
            accessor_path: self.accessor_path.clone(),
            size: self.size,
            capabilities: self.capabilities,
            sort_fn: self.sort_fn.clone(),
            children: self.children.clone(),
            kind: self.kind,
        }
    }
}

impl<T> ColumnDef<T> {
    /// A column without an accessor (rendered entirely by the caller's cell renderer).
    pub fn display(id: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            header: header.into(),
            accessor: None,
            accessor_path: None,
            size: None,
            capabilities: ColumnCapabilities::ALL,
            sort_fn: None,
            children: Vec::new(),
            kind: ColumnKind::Data,
        }
    }

    pub fn group(
        id: impl Into<String>,
        header: impl Into<String>,
        children: impl IntoIterator<Item = ColumnDef<T>>,
    ) -> Self {
        let mut def = Self::display(id, header);
        def.children = children.into_iter().collect();
        def
    }

    pub fn with_accessor(mut self, f: impl Fn(&T) -> CellValue + Send + Sync + 'static) -> Self {
        self.accessor = Some(Arc::new(f));
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_capabilities(mut self, capabilities: ColumnCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_sorting(mut self, enabled: bool) -> Self {
        self.capabilities.can_sort = enabled;
        self
    }

    pub fn with_hiding(mut self, enabled: bool) -> Self {
        self.capabilities.can_hide = enabled;
        self
    }

    pub fn with_pinning(mut self, enabled: bool) -> Self {
        self.capabilities.can_pin = enabled;
        self
    }

    pub fn with_resizing(mut self, enabled: bool) -> Self {
        self.capabilities.can_resize = enabled;
        self
    }

    pub fn with_filtering(mut self, enabled: bool) -> Self {
        self.capabilities.can_filter = enabled;
        self
    }

    pub fn with_sort_fn(
        mut self,
        f: impl Fn(RowRef<'_, T>, RowRef<'_, T>) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.sort_fn = Some(Arc::new(f));
        self
    }

    pub(crate) fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Reads this column's value from a row. Columns without an accessor yield `Null`.
    pub fn value(&self, row: &T) -> CellValue {
        self.accessor.as_ref().map_or(CellValue::Null, |f| f(row))
    }
}

impl<T: RowRecord + 'static> ColumnDef<T> {
    /// A column reading a dot-path from the record. The path doubles as the column id.
    pub fn accessor(path: impl Into<String>, header: impl Into<String>) -> Self {
        let path = path.into();
        let read = path.clone();
        let mut def =
            Self::display(path.clone(), header).with_accessor(move |row: &T| row.field(&read));
        def.accessor_path = Some(path);
        def
    }
}

impl<T> core::fmt::Debug for ColumnDef<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ColumnDef")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("accessor_path", &self.accessor_path)
            .field("size", &self.size)
            .field("capabilities", &self.capabilities)
            .field("kind", &self.kind)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}
