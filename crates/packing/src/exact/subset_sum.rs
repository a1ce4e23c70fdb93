//! Subset sums of rectangle sides.
//!
//! In a packing pushed as far left as possible, every left edge is the sum
//! of the widths of some rectangles; the same holds for bottom edges and
//! heights. The exact packer and the bounding-box search therefore only
//! ever consider coordinates and box sides from these sets.

/// All subset sums `<= limit` of a collection of items, where each item
/// contributes nothing or one of its allowed lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetSums {
    reachable: Vec<bool>,
    sums: Vec<u32>,
}

impl SubsetSums {
    /// Sums of plain lengths.
    pub fn new<I: IntoIterator<Item = u32>>(lengths: I, limit: u32) -> Self {
        Self::with_choices(lengths.into_iter().map(|l| (l, l)), limit)
    }

    /// Sums where each item contributes nothing, `a` or `b` (an item that
    /// may be rotated contributes its width or its height).
    pub fn with_choices<I: IntoIterator<Item = (u32, u32)>>(items: I, limit: u32) -> Self {
        let size = limit as usize + 1;
        let mut reachable = vec![false; size];
        reachable[0] = true;
        for (a, b) in items {
            let (a, b) = (a as usize, b as usize);
            // descending so each item is used at most once
            for s in (0..size).rev() {
                if reachable[s] {
                    continue;
                }
                reachable[s] = (a > 0 && s >= a && reachable[s - a])
                    || (b > 0 && s >= b && reachable[s - b]);
            }
        }
        let sums = reachable
            .iter()
            .enumerate()
            .filter(|(_, &r)| r)
            .map(|(s, _)| s as u32)
            .collect();
        Self { reachable, sums }
    }

    /// Largest value the set can hold.
    pub fn limit(&self) -> u32 {
        (self.reachable.len() - 1) as u32
    }

    /// Returns true if `value` is a subset sum.
    pub fn contains(&self, value: u32) -> bool {
        self.reachable
            .get(value as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Sums in increasing order.
    pub fn as_slice(&self) -> &[u32] {
        &self.sums
    }

    /// Sums in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.sums.iter().copied()
    }

    /// Sums within `[low, high]`.
    pub fn range(&self, low: u32, high: u32) -> impl Iterator<Item = u32> + '_ {
        let start = self.sums.partition_point(|&s| s < low);
        self.sums[start..].iter().copied().take_while(move |&s| s <= high)
    }

    /// Smallest sum `>= value`.
    pub fn next_at_least(&self, value: u32) -> Option<u32> {
        let index = self.sums.partition_point(|&s| s < value);
        self.sums.get(index).copied()
    }

    /// Smallest sum `> value`.
    pub fn next_above(&self, value: u32) -> Option<u32> {
        value.checked_add(1).and_then(|v| self.next_at_least(v))
    }

    /// Number of sums.
    pub fn len(&self) -> usize {
        self.sums.len()
    }

    /// Always false: 0 is a subset sum.
    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}
