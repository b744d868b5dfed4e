use alloc::sync::Arc;
use core::hash::Hash;
use std::collections::HashMap;

use crate::height_index::HeightIndex;

pub const DEFAULT_OVERSCAN: usize = 10;
pub const DEFAULT_ROW_HEIGHT: u32 = 40;

pub type EstimateRowHeight = Arc<dyn Fn(usize) -> u32 + Send + Sync>;
pub type RowKeyFn<K> = Arc<dyn Fn(usize) -> K + Send + Sync>;

/// Scroll geometry of a mounted scroll container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub scroll_offset: u64,
    pub height: u32,
}

impl Viewport {
    pub fn new(scroll_offset: u64, height: u32) -> Self {
        Self {
            scroll_offset,
            height,
        }
    }
}

/// The slice of rows to render, plus the padding that stands in for everything else.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibleWindow {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    pub top_padding_px: u64,
    pub bottom_padding_px: u64,
    /// Row count the window was computed for.
    pub count: usize,
}

impl VisibleWindow {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end_index + 1 - self.start_index
        }
    }

    pub fn indices(&self) -> core::ops::Range<usize> {
        if self.is_empty() {
            0..0
        } else {
            self.start_index..self.end_index + 1
        }
    }
}

/// A rendered row and its position in the scroll axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleRow {
    pub index: usize,
    pub start: u64,
    pub height: u32,
}

impl VisibleRow {
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.height as u64)
    }
}

/// Computes the window for `total_rows` rows without keeping any state.
///
/// `viewport = None` means the scroll container is not mounted yet: every row is rendered and
/// both paddings are zero.
pub fn visible_window(
    total_rows: usize,
    viewport: Option<Viewport>,
    estimate_row_height: impl Fn(usize) -> u32,
    overscan: usize,
) -> VisibleWindow {
    let heights: Vec<u32> = (0..total_rows).map(estimate_row_height).collect();
    let index = HeightIndex::from_heights(&heights);
    compute_window(&index, total_rows, viewport, overscan)
}

fn compute_window(
    index: &HeightIndex,
    count: usize,
    viewport: Option<Viewport>,
    overscan: usize,
) -> VisibleWindow {
    if count == 0 {
        return VisibleWindow::default();
    }
    let last_row = count - 1;
    let Some(viewport) = viewport else {
        return VisibleWindow {
            start_index: 0,
            end_index: last_row,
            top_padding_px: 0,
            bottom_padding_px: 0,
            count,
        };
    };

    let total = index.total();
    let view = viewport.height as u64;
    let offset = viewport.scroll_offset.min(total.saturating_sub(view));
    let last_visible_offset = offset.saturating_add(view.saturating_sub(1));

    let first = index.rows_within(offset).min(last_row);
    let last = index.rows_within(last_visible_offset).min(last_row).max(first);

    let start_index = first.saturating_sub(overscan);
    let end_index = last.saturating_add(overscan).min(last_row);
    let top_padding_px = index.prefix(start_index);
    let bottom_padding_px = total.saturating_sub(index.prefix(end_index + 1));

    VisibleWindow {
        start_index,
        end_index,
        top_padding_px,
        bottom_padding_px,
        count,
    }
}

/// Configuration for [`RowVirtualizer`].
pub struct VirtualizerOptions<K = u64> {
    pub count: usize,
    pub estimate_row_height: EstimateRowHeight,
    /// Stable identity per row index; measured heights follow keys across re-sorting.
    pub get_row_key: RowKeyFn<K>,
    pub overscan: usize,
}

impl<K> Clone for VirtualizerOptions<K> {
    fn clone(&self) -> Self {
        Self {
            count: self.count,
            estimate_row_height: Arc::clone(&self.estimate_row_height),
            get_row_key: Arc::clone(&self.get_row_key),
            overscan: self.overscan,
        }
    }
}

impl VirtualizerOptions<u64> {
    /// Rows keyed by index.
    pub fn new(
        count: usize,
        estimate_row_height: impl Fn(usize) -> u32 + Send + Sync + 'static,
    ) -> Self {
        Self::new_with_key(count, estimate_row_height, |i| i as u64)
    }

    /// Rows of a fixed estimated height.
    pub fn fixed(count: usize, row_height: u32) -> Self {
        Self::new(count, move |_| row_height)
    }
}

impl<K> VirtualizerOptions<K> {
    pub fn new_with_key(
        count: usize,
        estimate_row_height: impl Fn(usize) -> u32 + Send + Sync + 'static,
        get_row_key: impl Fn(usize) -> K + Send + Sync + 'static,
    ) -> Self {
        Self {
            count,
            estimate_row_height: Arc::new(estimate_row_height),
            get_row_key: Arc::new(get_row_key),
            overscan: DEFAULT_OVERSCAN,
        }
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_get_row_key(
        mut self,
        get_row_key: impl Fn(usize) -> K + Send + Sync + 'static,
    ) -> Self {
        self.get_row_key = Arc::new(get_row_key);
        self
    }
}

impl<K> core::fmt::Debug for VirtualizerOptions<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VirtualizerOptions")
            .field("count", &self.count)
            .field("overscan", &self.overscan)
            .finish_non_exhaustive()
    }
}

/// Row virtualization over a prefix-sum index of row heights.
///
/// Heights start from `estimate_row_height` and may be replaced by real measurements, which
/// are cached by row key.
pub struct RowVirtualizer<K = u64> {
    options: VirtualizerOptions<K>,
    viewport: Option<Viewport>,
    heights: Vec<u32>,
    measured: Vec<bool>,
    index: HeightIndex,
    key_heights: HashMap<K, u32>,
}

impl<K: Hash + Eq> RowVirtualizer<K> {
    pub fn new(options: VirtualizerOptions<K>) -> Self {
        gdebug!(count = options.count, overscan = options.overscan, "RowVirtualizer::new");
        let mut v = Self {
            options,
            viewport: None,
            heights: Vec::new(),
            measured: Vec::new(),
            index: HeightIndex::default(),
            key_heights: HashMap::new(),
        };
        v.rebuild_heights();
        v
    }

    pub fn options(&self) -> &VirtualizerOptions<K> {
        &self.options
    }

    /// Replaces the options, rebuilding heights only when count, estimator or key mapping
    /// changed.
    pub fn set_options(&mut self, options: VirtualizerOptions<K>) {
        let rebuild = options.count != self.options.count
            || !Arc::ptr_eq(&options.estimate_row_height, &self.options.estimate_row_height)
            || !Arc::ptr_eq(&options.get_row_key, &self.options.get_row_key);
        self.options = options;
        if rebuild {
            self.rebuild_heights();
        }
    }

    pub fn count(&self) -> usize {
        self.options.count
    }

    pub fn set_count(&mut self, count: usize) {
        if self.options.count == count {
            return;
        }
        gtrace!(count, "RowVirtualizer::set_count");
        self.options.count = count;
        self.rebuild_heights();
    }

    pub fn overscan(&self) -> usize {
        self.options.overscan
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.options.overscan = overscan;
    }

    pub fn set_estimate_row_height(&mut self, f: impl Fn(usize) -> u32 + Send + Sync + 'static) {
        self.options.estimate_row_height = Arc::new(f);
        self.rebuild_heights();
    }

    pub fn estimate_row_height(&self, index: usize) -> u32 {
        (self.options.estimate_row_height)(index)
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn is_mounted(&self) -> bool {
        self.viewport.is_some()
    }

    pub fn set_viewport(&mut self, viewport: Option<Viewport>) {
        self.viewport = viewport;
    }

    /// Attaches (or resizes) the scroll container, keeping the current scroll offset.
    pub fn mount(&mut self, height: u32) {
        let scroll_offset = self.viewport.map_or(0, |v| v.scroll_offset);
        self.viewport = Some(Viewport::new(scroll_offset, height));
    }

    pub fn unmount(&mut self) {
        self.viewport = None;
    }

    /// Applies a scroll event. Ignored while the container is not mounted.
    pub fn set_scroll_offset(&mut self, offset: u64) {
        if let Some(viewport) = &mut self.viewport {
            viewport.scroll_offset = offset;
        }
    }

    pub fn scroll_offset(&self) -> u64 {
        self.viewport.map_or(0, |v| v.scroll_offset)
    }

    pub fn total_height(&self) -> u64 {
        self.index.total()
    }

    pub fn max_scroll_offset(&self) -> u64 {
        let view = self.viewport.map_or(0, |v| v.height as u64);
        self.total_height().saturating_sub(view)
    }

    pub fn clamp_scroll_offset(&self, offset: u64) -> u64 {
        offset.min(self.max_scroll_offset())
    }

    pub fn row_height(&self, index: usize) -> Option<u32> {
        self.heights.get(index).copied()
    }

    pub fn row_start(&self, index: usize) -> Option<u64> {
        (index < self.options.count).then(|| self.index.prefix(index))
    }

    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        let count = self.options.count;
        if count == 0 {
            return None;
        }
        Some(self.index.rows_within(offset).min(count - 1))
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.measured.get(index).copied().unwrap_or(false)
    }

    /// Number of row keys with a cached measurement.
    pub fn cached_measurements(&self) -> usize {
        self.key_heights.len()
    }

    pub fn key_for(&self, index: usize) -> K {
        (self.options.get_row_key)(index)
    }

    /// Records the rendered height of a row.
    pub fn measure(&mut self, index: usize, height: u32) {
        if index >= self.options.count {
            return;
        }
        let key = self.key_for(index);
        self.key_heights.insert(key, height);
        self.measured[index] = true;
        let cur = self.heights[index];
        if cur != height {
            self.heights[index] = height;
            self.index.add(index, height as i64 - cur as i64);
        }
    }

    /// Drops every measured height and returns to estimates.
    pub fn reset_measurements(&mut self) {
        self.key_heights.clear();
        self.rebuild_heights();
    }

    /// Re-reads heights from the key cache after the rows were reordered or replaced.
    /// Cached heights whose key is no longer in range are dropped.
    pub fn sync_row_keys(&mut self) {
        self.rebuild_heights();
    }

    pub fn window(&self) -> VisibleWindow {
        compute_window(&self.index, self.options.count, self.viewport, self.options.overscan)
    }

    pub fn for_each_visible_row(&self, mut f: impl FnMut(VisibleRow)) {
        let window = self.window();
        let mut start = window.top_padding_px;
        for index in window.indices() {
            let height = self.heights[index];
            f(VisibleRow {
                index,
                start,
                height,
            });
            start = start.saturating_add(height as u64);
        }
    }

    /// Collects the rendered rows into `out` (clears `out` first).
    pub fn collect_visible_rows(&self, out: &mut Vec<VisibleRow>) {
        out.clear();
        self.for_each_visible_row(|row| out.push(row));
    }

    fn rebuild_heights(&mut self) {
        let count = self.options.count;
        self.heights.clear();
        self.measured.clear();
        self.heights.reserve_exact(count);
        self.measured.reserve_exact(count);
        // Keys that no longer map to a row in `0..count` are dropped.
        let mut kept = HashMap::with_capacity(self.key_heights.len().min(count));
        for i in 0..count {
            let key = self.key_for(i);
            let cached = match self.key_heights.remove_entry(&key) {
                Some((key, h)) => {
                    kept.insert(key, h);
                    Some(h)
                }
                None => kept.get(&key).copied(),
            };
            match cached {
                Some(h) => {
                    self.heights.push(h);
                    self.measured.push(true);
                }
                None => {
                    self.heights.push((self.options.estimate_row_height)(i));
                    self.measured.push(false);
                }
            }
        }
        self.key_heights = kept;
        self.index = HeightIndex::from_heights(&self.heights);
        gtrace!(count, cached = self.key_heights.len(), "RowVirtualizer::rebuild_heights");
    }
}

impl<K> core::fmt::Debug for RowVirtualizer<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RowVirtualizer")
            .field("options", &self.options)
            .field("viewport", &self.viewport)
            .field("total_height", &self.index.total())
            .finish_non_exhaustive()
    }
}
