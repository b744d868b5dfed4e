use crate::column::{MAX_COLUMN_SIZE, MIN_COLUMN_SIZE};
use crate::{ColumnModel, ColumnPin, ColumnSizingInfo, GridState};

/// The edge a pinned offset is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PinSide {
    Left,
    Right,
}

/// How right-pinned offsets are derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RightPinFormula {
    /// `(total_width - start) * columns_after`. Stacks correctly only when a single column is
    /// pinned right.
    #[default]
    Legacy,
    /// Sum of the sizes of the right-pinned columns after this one.
    SuffixSum,
}

/// One visible leaf column placed on the horizontal axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnPlacement {
    pub column_id: String,
    pub pin: ColumnPin,
    /// Offset from the left edge of the table.
    pub start: u64,
    pub size: u32,
}

impl ColumnPlacement {
    pub fn end(&self) -> u64 {
        self.start + self.size as u64
    }
}

/// Visible leaf columns in display order: left-pinned, center, right-pinned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<ColumnPlacement>,
    left_count: usize,
    right_count: usize,
    total_width: u64,
    formula: RightPinFormula,
}

impl ColumnLayout {
    /// Columns the table is grouped by are left out (they are represented by group rows).
    pub fn compute<T>(model: &ColumnModel<T>, state: &GridState, formula: RightPinFormula) -> Self {
        let mut left = Vec::new();
        let mut center = Vec::new();
        let mut right = Vec::new();
        for idx in model.ordered_leaves(&state.column_order) {
            let node = &model.nodes()[idx];
            if !state.is_leaf_visible(&node.id) || state.is_grouped_by(&node.id) {
                continue;
            }
            let pin = state.leaf_pin(&node.id);
            let bucket = match pin {
                ColumnPin::Left => &mut left,
                ColumnPin::None => &mut center,
                ColumnPin::Right => &mut right,
            };
            bucket.push((node.id.clone(), pin, model.leaf_size(idx, state)));
        }

        let left_count = left.len();
        let right_count = right.len();
        let mut columns = Vec::with_capacity(left_count + center.len() + right_count);
        let mut start = 0u64;
        for (column_id, pin, size) in left.into_iter().chain(center).chain(right) {
            columns.push(ColumnPlacement {
                column_id,
                pin,
                start,
                size,
            });
            start += size as u64;
        }

        gtrace!(
            columns = columns.len(),
            left = left_count,
            right = right_count,
            total_width = start,
            "ColumnLayout::compute"
        );
        Self {
            columns,
            left_count,
            right_count,
            total_width: start,
            formula,
        }
    }

    pub fn columns(&self) -> &[ColumnPlacement] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.column_id == column_id)
    }

    pub fn get(&self, column_id: &str) -> Option<&ColumnPlacement> {
        self.position(column_id).map(|i| &self.columns[i])
    }

    pub fn formula(&self) -> RightPinFormula {
        self.formula
    }

    pub fn total_width(&self) -> u64 {
        self.total_width
    }

    pub fn left_columns(&self) -> &[ColumnPlacement] {
        &self.columns[..self.left_count]
    }

    pub fn center_columns(&self) -> &[ColumnPlacement] {
        &self.columns[self.left_count..self.columns.len() - self.right_count]
    }

    pub fn right_columns(&self) -> &[ColumnPlacement] {
        &self.columns[self.columns.len() - self.right_count..]
    }

    pub fn left_width(&self) -> u64 {
        section_width(self.left_columns())
    }

    pub fn center_width(&self) -> u64 {
        section_width(self.center_columns())
    }

    pub fn right_width(&self) -> u64 {
        section_width(self.right_columns())
    }

    /// Sticky offset of `column_id` from `side`.
    ///
    /// Columns that are not visible yield 0, as do columns pinned to the other side.
    pub fn offset(&self, column_id: &str, side: PinSide) -> u64 {
        let Some(pos) = self.position(column_id) else {
            return 0;
        };
        let column = &self.columns[pos];
        match side {
            PinSide::Left => self.columns[..pos]
                .iter()
                .filter(|c| c.pin == ColumnPin::Left)
                .map(|c| c.size as u64)
                .sum(),
            PinSide::Right => match self.formula {
                RightPinFormula::Legacy => {
                    let after = (self.columns.len() - pos - 1) as u64;
                    (self.total_width - column.start).saturating_mul(after)
                }
                RightPinFormula::SuffixSum => self.columns[pos + 1..]
                    .iter()
                    .filter(|c| c.pin == ColumnPin::Right)
                    .map(|c| c.size as u64)
                    .sum(),
            },
        }
    }
}

fn section_width(columns: &[ColumnPlacement]) -> u64 {
    columns.iter().map(|c| c.size as u64).sum()
}

/// Starts a resize session for `column_id` at pointer position `pointer_x`.
pub(crate) fn begin_resize(
    info: &mut ColumnSizingInfo,
    column_id: &str,
    pointer_x: i64,
    size: u32,
) {
    *info = ColumnSizingInfo {
        is_resizing_column: Some(column_id.to_string()),
        start_offset: Some(pointer_x),
        start_size: Some(size),
        delta_offset: Some(0),
    };
}

/// Moves the pointer of the active session. Returns the column and its new width when the
/// width changed.
pub(crate) fn update_resize(
    info: &mut ColumnSizingInfo,
    pointer_x: i64,
    current: u32,
) -> Option<(String, u32)> {
    let column_id = info.is_resizing_column.clone()?;
    let start_offset = info.start_offset?;
    let start_size = info.start_size?;
    let delta = pointer_x.saturating_sub(start_offset);
    info.delta_offset = Some(delta);
    let size = i64::from(start_size)
        .saturating_add(delta)
        .clamp(i64::from(MIN_COLUMN_SIZE), i64::from(MAX_COLUMN_SIZE)) as u32;
    (size != current).then_some((column_id, size))
}

pub(crate) fn end_resize(info: &mut ColumnSizingInfo) -> Option<String> {
    let column_id = info.is_resizing_column.take();
    *info = ColumnSizingInfo::default();
    column_id
}
