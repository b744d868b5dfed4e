use crate::drag::{self, DragPayload, DropTarget};
use crate::{ColumnLayout, ColumnModel, ColumnPin, ColumnPlacement};

/// One header cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub id: String,
    pub column_id: String,
    pub label: String,
    /// Header row this cell sits in.
    pub depth: usize,
    /// Depth of the column in the column tree.
    pub column_depth: usize,
    /// Position within its header row.
    pub index: usize,
    pub col_span: usize,
    /// Stands in for a leaf that is shallower than the deepest level.
    pub is_placeholder: bool,
    pub start: u64,
    pub size: u64,
    pub pin: ColumnPin,
    pub can_resize: bool,
    pub can_sort: bool,
}

impl Header {
    pub fn drag_payload(&self) -> DragPayload {
        DragPayload::Column {
            column_id: self.column_id.clone(),
            pin: self.pin,
            depth: self.column_depth,
        }
    }

    pub fn drop_target(&self) -> DropTarget {
        DropTarget {
            payload: self.drag_payload(),
            is_placeholder: self.is_placeholder,
        }
    }

    pub fn is_draggable(&self) -> bool {
        drag::can_drag(self.can_resize, self.pin, self.is_placeholder)
    }
}

/// A row of header cells. Spans in each row add up to the number of visible leaves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderGroup {
    pub depth: usize,
    pub id: String,
    pub headers: Vec<Header>,
}

impl HeaderGroup {
    /// False for a row made only of placeholders.
    pub fn is_renderable(&self) -> bool {
        self.headers.iter().any(|h| !h.is_placeholder)
    }
}

pub(crate) fn build_header_groups<T>(
    model: &ColumnModel<T>,
    layout: &ColumnLayout,
) -> Vec<HeaderGroup> {
    let max_depth = model.max_depth();
    let mut groups: Vec<HeaderGroup> = (0..=max_depth)
        .map(|depth| HeaderGroup {
            depth,
            id: depth.to_string(),
            headers: Vec::new(),
        })
        .collect();

    let sections = [
        ("left", layout.left_columns()),
        ("center", layout.center_columns()),
        ("right", layout.right_columns()),
    ];
    for (section, columns) in sections {
        if columns.is_empty() {
            continue;
        }
        let chains: Vec<Vec<usize>> = columns.iter().map(|c| column_chain(model, c)).collect();
        for (depth, group) in groups.iter_mut().enumerate() {
            push_section_row(
                model,
                section,
                depth,
                max_depth,
                columns,
                &chains,
                &mut group.headers,
            );
        }
    }

    for group in &mut groups {
        for (index, header) in group.headers.iter_mut().enumerate() {
            header.index = index;
        }
    }
    gtrace!(rows = groups.len(), "build_header_groups");
    groups
}

/// Node indexes from the root group down to the leaf.
fn column_chain<T>(model: &ColumnModel<T>, column: &ColumnPlacement) -> Vec<usize> {
    let Some(leaf) = model.index_of(&column.column_id) else {
        return Vec::new();
    };
    let mut chain: Vec<usize> = model.ancestors(leaf).collect();
    chain.reverse();
    chain.push(leaf);
    chain
}

fn push_section_row<T>(
    model: &ColumnModel<T>,
    section: &str,
    depth: usize,
    max_depth: usize,
    columns: &[ColumnPlacement],
    chains: &[Vec<usize>],
    out: &mut Vec<Header>,
) {
    let mut open: Option<(usize, bool)> = None;
    for (column, chain) in columns.iter().zip(chains) {
        let Some(&leaf) = chain.last() else {
            continue;
        };
        let leaf_depth = chain.len() - 1;
        let (node, is_placeholder) = if depth < leaf_depth {
            (chain[depth], false)
        } else if depth < max_depth {
            (leaf, true)
        } else {
            (leaf, false)
        };

        // Adjacent leaves under the same group share one spanning cell.
        if let (Some((prev, false)), false) = (open, is_placeholder) {
            if prev == node && !model.nodes()[node].is_leaf() {
                if let Some(last) = out.last_mut() {
                    last.col_span += 1;
                    last.size += column.size as u64;
                }
                continue;
            }
        }

        let n = &model.nodes()[node];
        out.push(Header {
            id: format!("{section}_{depth}_{}", n.id),
            column_id: n.id.clone(),
            label: if is_placeholder { String::new() } else { n.header.clone() },
            depth,
            column_depth: n.depth,
            index: 0,
            col_span: 1,
            is_placeholder,
            start: column.start,
            size: column.size as u64,
            pin: column.pin,
            can_resize: n.capabilities.can_resize,
            can_sort: n.capabilities.can_sort,
        });
        open = Some((node, is_placeholder));
    }
}
