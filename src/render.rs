use core::hash::Hash;

use crate::{GridStore, Row, RowVirtualizer, VisibleWindow};

/// What the body of the grid should draw.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderPlan {
    /// Data is loading: draw skeleton rows, the virtualizer is not consulted.
    Loading { placeholder_rows: usize },
    /// A single row spanning every visible column.
    Empty { col_span: usize },
    Rows {
        window: VisibleWindow,
        rows: Vec<Row>,
        /// Spacer rows standing in for the rows above and below the window.
        top_placeholder_rows: usize,
        bottom_placeholder_rows: usize,
    },
}

impl RenderPlan {
    /// Syncs the virtualizer's row count with the row model and cuts the visible window.
    pub fn compute<T, K: Hash + Eq>(
        store: &GridStore<T>,
        virtualizer: &mut RowVirtualizer<K>,
    ) -> Self {
        if store.is_loading() {
            return Self::Loading {
                placeholder_rows: store.options().loading_rows,
            };
        }
        let model = store.row_model();
        if model.is_empty() {
            return Self::Empty {
                col_span: store.layout().len().max(1),
            };
        }

        virtualizer.set_count(model.len());
        let window = virtualizer.window();
        let estimate = virtualizer.estimate_row_height(window.end_index).max(1) as u64;
        let rows = model.rows[window.indices()].to_vec();
        gtrace!(
            start = window.start_index,
            end = window.end_index,
            rows = rows.len(),
            "RenderPlan::compute"
        );
        Self::Rows {
            window,
            rows,
            top_placeholder_rows: window.top_padding_px.div_ceil(estimate) as usize,
            bottom_placeholder_rows: window.bottom_padding_px.div_ceil(estimate) as usize,
        }
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Rows { rows, .. } => rows,
            _ => &[],
        }
    }
}
