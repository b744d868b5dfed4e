use alloc::sync::Arc;
use std::collections::HashMap;

use crate::column::{
    AccessorFn, ColumnCapabilities, ColumnDef, ColumnKind, DEFAULT_COLUMN_SIZE, MAX_COLUMN_SIZE,
    MIN_COLUMN_SIZE, SortFn,
};
use crate::{ActionMenu, GridError, GridState, Result};

pub const SELECT_COLUMN_ID: &str = "select";
pub const ACTIONS_COLUMN_ID: &str = "actions";

const SELECT_COLUMN_SIZE: u32 = 40;
const ACTIONS_COLUMN_SIZE: u32 = 30;

/// A column flattened out of the declarative tree.
pub struct ColumnNode<T> {
    pub id: String,
    pub header: String,
    pub depth: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Declared size, before the sizing state is applied.
    pub size: Option<u32>,
    pub capabilities: ColumnCapabilities,
    pub kind: ColumnKind,
    pub accessor: Option<AccessorFn<T>>,
    pub sort_fn: Option<SortFn<T>>,
}

impl<T> ColumnNode<T> {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn has_accessor(&self) -> bool {
        self.accessor.is_some()
    }

    pub fn value(&self, row: &T) -> crate::CellValue {
        self.accessor.as_ref().map_or(crate::CellValue::Null, |f| f(row))
    }
}

impl<T> core::fmt::Debug for ColumnNode<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ColumnNode")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("size", &self.size)
            .field("capabilities", &self.capabilities)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The final column list consumed by the store: the declared tree plus synthetic columns,
/// flattened in pre-order.
pub struct ColumnModel<T> {
    nodes: Vec<ColumnNode<T>>,
    roots: Vec<usize>,
    by_id: HashMap<String, usize>,
    max_depth: usize,
}

impl<T> ColumnModel<T> {
    pub fn new(columns: &[ColumnDef<T>]) -> Result<Self> {
        let mut model = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            by_id: HashMap::new(),
            max_depth: 0,
        };
        for def in columns {
            let idx = model.push(def, None, 0)?;
            model.roots.push(idx);
        }
        Ok(model)
    }

    fn push(&mut self, def: &ColumnDef<T>, parent: Option<usize>, depth: usize) -> Result<usize> {
        if self.by_id.contains_key(&def.id) {
            return Err(GridError::DuplicateColumnId(def.id.clone()));
        }
        let idx = self.nodes.len();
        self.by_id.insert(def.id.clone(), idx);
        self.max_depth = self.max_depth.max(depth);
        self.nodes.push(ColumnNode {
            id: def.id.clone(),
            header: def.header.clone(),
            depth,
            parent,
            children: Vec::new(),
            size: def.size,
            capabilities: def.capabilities,
            kind: def.kind,
            accessor: def.accessor.clone(),
            sort_fn: def.sort_fn.clone(),
        });
        for child in &def.children {
            let child_idx = self.push(child, Some(idx), depth + 1)?;
            self.nodes[idx].children.push(child_idx);
        }
        Ok(idx)
    }

    pub fn nodes(&self) -> &[ColumnNode<T>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&ColumnNode<T>> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Depth of the deepest column (0 for a flat column list).
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Leaf indexes in definition order.
    pub fn leaves(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&i| self.nodes[i].is_leaf())
    }

    /// Every leaf under `idx` (the node itself when it is a leaf), in definition order.
    pub fn descendant_leaves(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaves(idx, &mut out);
        out
    }

    fn collect_leaves(&self, idx: usize, out: &mut Vec<usize>) {
        let node = &self.nodes[idx];
        if node.is_leaf() {
            out.push(idx);
            return;
        }
        for &child in &node.children {
            self.collect_leaves(child, out);
        }
    }

    /// Ancestors of `idx`, nearest first.
    pub fn ancestors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        core::iter::successors(self.nodes[idx].parent, |&p| self.nodes[p].parent)
    }

    /// Pre-order list of every column id, groups included.
    pub fn identity_order(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Orders sibling lists by their position in `order`. Ids missing from `order` keep their
    /// definition order after the listed ones.
    pub fn ordered(&self, siblings: &[usize], order: &[String]) -> Vec<usize> {
        let mut out = siblings.to_vec();
        out.sort_by_key(|&i| {
            order
                .iter()
                .position(|id| *id == self.nodes[i].id)
                .unwrap_or(usize::MAX)
        });
        out
    }

    /// Leaf indexes with `order` applied at every level of the tree.
    pub fn ordered_leaves(&self, order: &[String]) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in self.ordered(&self.roots, order) {
            self.collect_ordered_leaves(root, order, &mut out);
        }
        out
    }

    fn collect_ordered_leaves(&self, idx: usize, order: &[String], out: &mut Vec<usize>) {
        let node = &self.nodes[idx];
        if node.is_leaf() {
            out.push(idx);
            return;
        }
        for child in self.ordered(&node.children, order) {
            self.collect_ordered_leaves(child, order, out);
        }
    }

    /// Width of a leaf after applying the sizing state.
    pub fn leaf_size(&self, idx: usize, state: &GridState) -> u32 {
        let node = &self.nodes[idx];
        state
            .column_sizing
            .get(&node.id)
            .copied()
            .or(node.size)
            .unwrap_or(DEFAULT_COLUMN_SIZE)
            .clamp(MIN_COLUMN_SIZE, MAX_COLUMN_SIZE)
    }
}

impl<T> core::fmt::Debug for ColumnModel<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ColumnModel")
            .field("nodes", &self.nodes)
            .field("roots", &self.roots)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

fn select_column<T>() -> ColumnDef<T> {
    ColumnDef::display(SELECT_COLUMN_ID, "")
        .with_size(SELECT_COLUMN_SIZE)
        .with_capabilities(ColumnCapabilities::NONE)
        .with_kind(ColumnKind::Select)
}

fn actions_column<T>(label: &str) -> ColumnDef<T> {
    ColumnDef::display(ACTIONS_COLUMN_ID, label)
        .with_size(ACTIONS_COLUMN_SIZE)
        .with_capabilities(ColumnCapabilities::NONE)
        .with_kind(ColumnKind::Actions)
}

struct BuiltModel<T> {
    selectable: bool,
    actions: Option<Arc<ActionMenu<T>>>,
    model: Arc<ColumnModel<T>>,
}

/// Builds the final column list, memoized on `selectable` and the identity of the action menu.
///
/// The declared columns are deliberately not part of the memo key: callers that rebuild their
/// descriptor list on every data refresh keep the same model (and the column state bound to it).
pub struct ColumnModelBuilder<T> {
    cached: Option<BuiltModel<T>>,
    builds: usize,
}

impl<T> Default for ColumnModelBuilder<T> {
    fn default() -> Self {
        Self {
            cached: None,
            builds: 0,
        }
    }
}

impl<T> ColumnModelBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times a model was actually rebuilt.
    pub fn build_count(&self) -> usize {
        self.builds
    }

    pub fn build(
        &mut self,
        columns: &[ColumnDef<T>],
        selectable: bool,
        actions: Option<&Arc<ActionMenu<T>>>,
    ) -> Result<Arc<ColumnModel<T>>> {
        if let Some(cached) = &self.cached {
            let same_actions = match (&cached.actions, actions) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            };
            if cached.selectable == selectable && same_actions {
                return Ok(Arc::clone(&cached.model));
            }
        }

        let mut defs = Vec::with_capacity(columns.len() + 2);
        if selectable {
            defs.push(select_column());
        }
        defs.extend(columns.iter().cloned());
        if let Some(menu) = actions.filter(|m| !m.is_empty()) {
            defs.push(actions_column(menu.label()));
        }

        let model = Arc::new(ColumnModel::new(&defs)?);
        self.builds += 1;
        gdebug!(
            columns = model.len(),
            selectable,
            actions = actions.map_or(0, |m| m.len()),
            "ColumnModelBuilder::build"
        );
        self.cached = Some(BuiltModel {
            selectable,
            actions: actions.cloned(),
            model: Arc::clone(&model),
        });
        Ok(model)
    }
}
