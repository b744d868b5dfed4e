use core::cmp;

/// Prefix sums over row heights (a Fenwick tree), with `O(log n)` updates and
/// offset → row lookups.
#[derive(Clone, Debug, Default)]
pub(crate) struct HeightIndex {
    tree: Vec<u64>, // 1-indexed
    total: u64,
    top_bit: usize,
}

impl HeightIndex {
    pub(crate) fn from_heights(heights: &[u32]) -> Self {
        let n = heights.len();
        let mut tree = vec![0u64; n + 1];
        let mut total = 0u64;
        for i in 1..=n {
            let h = heights[i - 1] as u64;
            total = total.saturating_add(h);
            tree[i] = tree[i].saturating_add(h);
            let parent = i + lowest_bit(i);
            if parent <= n {
                tree[parent] = tree[parent].saturating_add(tree[i]);
            }
        }
        Self {
            tree,
            total,
            top_bit: top_bit(n),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len().saturating_sub(1)
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    /// Adjusts the height of row `index` by `delta`.
    pub(crate) fn add(&mut self, index: usize, delta: i64) {
        let n = self.len();
        if index >= n || delta == 0 {
            return;
        }
        self.total = apply_delta(self.total, delta);
        let mut i = index + 1;
        while i <= n {
            self.tree[i] = apply_delta(self.tree[i], delta);
            i += lowest_bit(i);
        }
    }

    /// Sum of the heights of the first `count` rows.
    pub(crate) fn prefix(&self, count: usize) -> u64 {
        let mut i = cmp::min(count, self.len());
        let mut sum = 0u64;
        while i > 0 {
            sum = sum.saturating_add(self.tree[i]);
            i &= i - 1;
        }
        sum
    }

    /// Number of leading rows whose cumulative height is `<= offset`, i.e. the index of the row
    /// containing `offset` (or `len()` when `offset` is past the end).
    pub(crate) fn rows_within(&self, mut offset: u64) -> usize {
        let n = self.len();
        let mut idx = 0usize;
        let mut bit = self.top_bit;
        while bit != 0 {
            let next = idx + bit;
            if next <= n && self.tree[next] <= offset {
                offset -= self.tree[next];
                idx = next;
            }
            bit >>= 1;
        }
        idx
    }
}

fn apply_delta(v: u64, delta: i64) -> u64 {
    if delta >= 0 {
        v.saturating_add(delta as u64)
    } else {
        v.saturating_sub(delta.unsigned_abs())
    }
}

fn lowest_bit(i: usize) -> usize {
    i & i.wrapping_neg()
}

fn top_bit(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut p = 1usize;
    while p <= n / 2 {
        p <<= 1;
    }
    p
}
