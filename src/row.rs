use alloc::sync::Arc;
use core::cmp::Ordering;

use crate::column::RowRef;
use crate::{CellValue, ColumnModel, GridState};

/// Derives a stable row id from a record and its position in the raw data.
pub type RowIdFn<T> = Arc<dyn Fn(&T, usize) -> String + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
pub enum RowKind {
    Leaf {
        /// Position in the raw data slice.
        source_index: usize,
    },
    Group {
        column_id: String,
        value: CellValue,
        leaf_count: usize,
    },
}

/// One row of the computed row model.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub id: String,
    /// Position in the current row model.
    pub index: usize,
    pub depth: usize,
    pub kind: RowKind,
}

impl Row {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, RowKind::Group { .. })
    }

    pub fn source_index(&self) -> Option<usize> {
        match self.kind {
            RowKind::Leaf { source_index } => Some(source_index),
            RowKind::Group { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowModel {
    pub rows: Vec<Row>,
    /// Row count after filtering, grouping and sorting, before the page is cut.
    pub pre_pagination_len: usize,
}

impl RowModel {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn leaf_rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.rows.iter().filter(|r| !r.is_group())
    }
}

pub(crate) struct RowPipeline<'a, T> {
    pub data: &'a [T],
    pub model: &'a ColumnModel<T>,
    pub state: &'a GridState,
    pub manual_sorting: bool,
    pub manual_pagination: bool,
    pub enable_filtering: bool,
    pub get_row_id: Option<&'a RowIdFn<T>>,
}

impl<T> RowPipeline<'_, T> {
    /// filter -> group -> sort -> paginate.
    pub(crate) fn run(&self) -> RowModel {
        let mut indices: Vec<usize> = (0..self.data.len()).collect();
        if self.enable_filtering {
            indices.retain(|&i| self.passes_filters(&self.data[i]));
        }

        let grouping = self.grouping_columns();
        let mut rows = Vec::with_capacity(indices.len());
        if grouping.is_empty() {
            self.sort_leaves(&mut indices);
            rows.extend(indices.into_iter().map(|i| self.leaf_row(i, 0)));
        } else {
            self.group(&grouping, indices, 0, None, &mut rows);
        }

        let pre_pagination_len = rows.len();
        if !self.manual_pagination {
            rows = paginate(rows, self.state);
        }
        for (index, row) in rows.iter_mut().enumerate() {
            row.index = index;
        }
        RowModel {
            rows,
            pre_pagination_len,
        }
    }

    pub(crate) fn row_id(&self, source_index: usize) -> String {
        match self.get_row_id {
            Some(f) => f(&self.data[source_index], source_index),
            None => source_index.to_string(),
        }
    }

    fn leaf_row(&self, source_index: usize, depth: usize) -> Row {
        Row {
            id: self.row_id(source_index),
            index: 0,
            depth,
            kind: RowKind::Leaf { source_index },
        }
    }

    fn passes_filters(&self, row: &T) -> bool {
        for filter in &self.state.column_filters {
            let Some(node) = self.model.get(&filter.id) else {
                continue;
            };
            if !node.capabilities.can_filter || !node.has_accessor() {
                continue;
            }
            if !node.value(row).contains_lowercase(&filter.value.to_lowercase()) {
                return false;
            }
        }
        let needle = self.state.global_filter.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.model.leaves().any(|idx| {
            let node = &self.model.nodes()[idx];
            node.capabilities.can_filter
                && node.has_accessor()
                && node.value(row).contains_lowercase(&needle)
        })
    }

    fn grouping_columns(&self) -> Vec<usize> {
        self.state
            .grouping
            .iter()
            .filter_map(|id| self.model.index_of(id))
            .filter(|&idx| self.model.nodes()[idx].has_accessor())
            .collect()
    }

    fn group(
        &self,
        grouping: &[usize],
        indices: Vec<usize>,
        depth: usize,
        parent_id: Option<&str>,
        out: &mut Vec<Row>,
    ) {
        let Some((&column, rest)) = grouping.split_first() else {
            let mut indices = indices;
            self.sort_leaves(&mut indices);
            out.extend(indices.into_iter().map(|i| self.leaf_row(i, depth)));
            return;
        };
        let node = &self.model.nodes()[column];

        // Buckets in first-appearance order.
        let mut buckets: Vec<(CellValue, Vec<usize>)> = Vec::new();
        for i in indices {
            let value = node.value(&self.data[i]);
            match buckets.iter_mut().find(|(v, _)| v.total_cmp(&value) == Ordering::Equal) {
                Some((_, members)) => members.push(i),
                None => buckets.push((value, vec![i])),
            }
        }
        if !self.manual_sorting {
            if let Some(entry) = self.state.sort_entry(&node.id) {
                buckets.sort_by(|(a, _), (b, _)| directed(a.total_cmp(b), entry.desc));
            }
        }

        for (value, members) in buckets {
            let key = format!("{}:{}", node.id, value.tagged_key());
            let id = match parent_id {
                Some(parent) => format!("{parent}>{key}"),
                None => key,
            };
            let expanded = self.state.expanded.contains(&id);
            out.push(Row {
                id: id.clone(),
                index: 0,
                depth,
                kind: RowKind::Group {
                    column_id: node.id.clone(),
                    value,
                    leaf_count: members.len(),
                },
            });
            if expanded {
                self.group(rest, members, depth + 1, Some(&id), out);
            }
        }
    }

    /// Stable multi-key sort. Custom comparators win over the accessor order.
    fn sort_leaves(&self, indices: &mut [usize]) {
        if self.manual_sorting || self.state.sorting.is_empty() {
            return;
        }
        let keys: Vec<_> = self
            .state
            .sorting
            .iter()
            .filter_map(|entry| {
                let node = self.model.get(&entry.id)?;
                (node.is_leaf() && node.capabilities.can_sort).then_some((node, entry.desc))
            })
            .collect();
        if keys.is_empty() {
            return;
        }
        indices.sort_by(|&a, &b| {
            for (node, desc) in &keys {
                let ord = match &node.sort_fn {
                    Some(f) => f(
                        RowRef {
                            index: a,
                            original: &self.data[a],
                        },
                        RowRef {
                            index: b,
                            original: &self.data[b],
                        },
                    ),
                    None => node.value(&self.data[a]).total_cmp(&node.value(&self.data[b])),
                };
                let ord = directed(ord, *desc);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

fn directed(ord: Ordering, desc: bool) -> Ordering {
    if desc { ord.reverse() } else { ord }
}

/// Number of pages for `rows` rows. An empty model still has one page.
pub(crate) fn page_count_for(rows: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    rows.div_ceil(page_size).max(1)
}

fn paginate(rows: Vec<Row>, state: &GridState) -> Vec<Row> {
    let size = state.pagination.page_size;
    if size == 0 {
        return rows;
    }
    let last_page = page_count_for(rows.len(), size) - 1;
    let start = state.pagination.page_index.min(last_page) * size;
    rows.into_iter().skip(start).take(size).collect()
}
