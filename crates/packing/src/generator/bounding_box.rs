//! Optimal bounding-box search.
//!
//! Candidate boxes come out of a [`BoxQueue`] in order of non-decreasing
//! area. Each is handed to the exact packer; the first box that admits a
//! packing is therefore of minimum area. The greedy upper bound caps the
//! queue: once the next box is no smaller than the greedy packing, that
//! packing is optimal.
//!
//! Box sides are restricted to subset sums of the entry sides (a packing
//! pushed down and left has such an extent). For each width the first
//! height tried is the smallest sum at or above a lower bound made of the
//! tallest entry that must stand in that width, the area bound, and the
//! pairwise-stacking bound: two entries too wide to stand side by side
//! must be stacked.

use super::finish;
use super::upper_bound::upper_bound;
use crate::exact::{ExactPacker, SubsetSums};
use rectpack_core::{
    Config, Error, ExactConfig, Generator, Instance, PackResult, Packer, Result, SearchContext,
    SolutionStatus,
};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A candidate box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Candidate {
    /// `width * height`; compared first.
    pub area: u64,
    /// Box width.
    pub width: u32,
    /// Box height.
    pub height: u32,
}

impl Candidate {
    fn new(width: u32, height: u32) -> Self {
        Self {
            area: width as u64 * height as u64,
            width,
            height,
        }
    }
}

/// Min-heap of candidate boxes with area below a cap.
#[derive(Debug, Clone)]
pub struct BoxQueue {
    heap: BinaryHeap<Reverse<Candidate>>,
    sides: Vec<(u32, u32)>,
    rotatable: bool,
    fixed_height: Option<u32>,
    total_area: u64,
    heights: SubsetSums,
    cap: u64,
    last: u64,
}

impl BoxQueue {
    /// Enumerates the first candidate of every admissible width of
    /// `instance`, keeping only boxes of area strictly below `cap`.
    pub fn new(instance: &Instance, cap: u64) -> Self {
        let rotatable = instance.allows_rotation();
        let fixed_height = instance.fixed_height();
        let sides: Vec<(u32, u32)> = instance
            .entries()
            .iter()
            .map(|e| (e.raw_width(), e.raw_height()))
            .collect();
        let total_area = instance.total_area();

        let min_height = fixed_height.unwrap_or_else(|| instance.min_feasible_height()).max(1);
        let mut min_width = instance.min_feasible_width().max(1);
        if let Some(height) = fixed_height {
            min_width = min_width.max(div_ceil(total_area, height as u64) as u32);
        }

        let choices = |(w, h): (u32, u32), first: bool| {
            let main = if first { w } else { h };
            if rotatable {
                (main, if first { h } else { w })
            } else {
                (main, main)
            }
        };
        let width_limit = side_limit(sides.iter().map(|&(w, h)| w.max(h)), cap, min_height);
        let height_limit = side_limit(sides.iter().map(|&(w, h)| w.max(h)), cap, min_width);
        let widths =
            SubsetSums::with_choices(sides.iter().map(|&s| choices(s, true)), width_limit);
        let heights =
            SubsetSums::with_choices(sides.iter().map(|&s| choices(s, false)), height_limit);

        let mut queue = Self {
            heap: BinaryHeap::new(),
            sides,
            rotatable,
            fixed_height,
            total_area,
            heights,
            cap,
            last: 0,
        };
        for width in widths.range(min_width, width_limit) {
            if let Some(height) = queue.first_height(width) {
                queue.push(Candidate::new(width, height));
            }
        }
        queue
    }

    /// Removes the smallest candidate.
    pub fn pop(&mut self) -> Option<Candidate> {
        let Reverse(candidate) = self.heap.pop()?;
        debug_assert!(candidate.area >= self.last);
        self.last = candidate.area;
        Some(candidate)
    }

    /// Queues the next taller box of a width that did not admit a packing.
    pub fn advance(&mut self, failed: Candidate) {
        if self.fixed_height.is_some() {
            return;
        }
        if let Some(height) = self.heights.next_above(failed.height) {
            self.push(Candidate::new(failed.width, height));
        }
    }

    /// Number of queued candidates.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true when no candidate is left.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn push(&mut self, candidate: Candidate) {
        if candidate.area < self.cap {
            self.heap.push(Reverse(candidate));
        }
    }

    fn first_height(&self, width: u32) -> Option<u32> {
        let lower = self.height_bound(width)?;
        match self.fixed_height {
            Some(height) => (lower <= height).then_some(height),
            None => self.heights.next_at_least(lower),
        }
    }

    /// Lower bound on the height of any packing of the given width, or
    /// `None` if some entry fits the width in no orientation.
    pub fn height_bound(&self, width: u32) -> Option<u32> {
        let mut bound = div_ceil(self.total_area, width as u64) as u32;
        if self.rotatable && self.fixed_height.is_none() {
            // a packing and its transpose are equally good
            bound = bound.max(width);
        }
        for &side in &self.sides {
            let lowest = self.orientations(side, width).map(|(_, h)| h).min()?;
            bound = bound.max(lowest);
        }
        for (i, &a) in self.sides.iter().enumerate() {
            for &b in &self.sides[i + 1..] {
                bound = bound.max(self.pair_bound(a, b, width));
            }
        }
        Some(bound)
    }

    /// Lowest height two entries can share within `width`.
    fn pair_bound(&self, a: (u32, u32), b: (u32, u32), width: u32) -> u32 {
        let mut lowest = u32::MAX;
        for (aw, ah) in self.orientations(a, width) {
            for (bw, bh) in self.orientations(b, width) {
                let height = if aw + bw > width { ah + bh } else { ah.max(bh) };
                lowest = lowest.min(height);
            }
        }
        if lowest == u32::MAX {
            0
        } else {
            lowest
        }
    }

    fn orientations(&self, (w, h): (u32, u32), width: u32) -> impl Iterator<Item = (u32, u32)> {
        let turned = if self.rotatable && w != h {
            Some((h, w))
        } else {
            None
        };
        std::iter::once((w, h))
            .chain(turned)
            .filter(move |&(ow, _)| ow <= width)
    }
}

fn div_ceil(a: u64, b: u64) -> u64 {
    if b == 0 {
        0
    } else {
        (a + b - 1) / b
    }
}

/// Largest side worth enumerating: all entries in a row, and no box of
/// area `cap` or more.
fn side_limit<I: Iterator<Item = u32>>(sides: I, cap: u64, other_min: u32) -> u32 {
    let row: u64 = sides.map(u64::from).sum();
    let by_area = cap.saturating_sub(1) / other_min.max(1) as u64;
    row.min(by_area).min(u32::MAX as u64) as u32
}

/// Minimum-area search over candidate boxes with the exact packer.
#[derive(Debug, Clone, Default)]
pub struct BoundingBoxGenerator {
    exact: ExactConfig,
}

impl BoundingBoxGenerator {
    /// Creates a generator with the given exact-packer switches.
    pub fn new(exact: ExactConfig) -> Self {
        Self { exact }
    }

    /// Creates a generator from a run configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(ExactConfig::default().with_max_entries(config.exact_max_entries))
    }
}

impl Generator for BoundingBoxGenerator {
    fn name(&self) -> &'static str {
        "bounding-box"
    }

    fn generate(&mut self, instance: &Instance, ctx: &SearchContext) -> Result<PackResult> {
        instance.validate()?;
        if !self.exact.is_within_limit(instance.size()) {
            log::warn!(
                "{}: {} entries exceed the exact limit of {}, search may not finish",
                ctx.label(),
                instance.size(),
                self.exact.max_entries
            );
        }

        let mut result = PackResult::new(self.name());
        let greedy = upper_bound(instance, ctx).ok_or(Error::Cancelled)?;
        ctx.offer(&mut result, greedy);
        let cap = result.area().unwrap_or(u64::MAX);

        let mut queue = BoxQueue::new(instance, cap);
        let mut packer = ExactPacker::new(self.exact.clone());
        log::debug!(
            "{}: greedy area {}, {} widths queued",
            ctx.label(),
            cap,
            queue.len()
        );

        while let Some(candidate) = queue.pop() {
            if ctx.is_cancelled() {
                result.cancelled = true;
                break;
            }
            log::trace!(
                "{}: trying {}x{} (area {})",
                ctx.label(),
                candidate.width,
                candidate.height,
                candidate.area
            );
            let mut trial = instance.clone().with_box(candidate.width, candidate.height);
            match packer.pack(&mut trial, ctx) {
                Some(placed) => {
                    log::debug!(
                        "{}: packed {}x{}",
                        ctx.label(),
                        candidate.width,
                        candidate.height
                    );
                    ctx.offer(&mut result, placed);
                    break;
                }
                None if ctx.is_cancelled() => {
                    result.cancelled = true;
                    break;
                }
                None => queue.advance(candidate),
            }
        }

        if result.cancelled {
            log::info!("{}: bounding-box search cancelled", ctx.label());
        } else {
            result.status = SolutionStatus::Optimal;
        }
        Ok(finish(result, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_bound_pairs() {
        // two 3-wide entries cannot sit side by side in width 5
        let instance = Instance::from_dimensions(false, None, &[(3, 2), (3, 2)]);
        let queue = BoxQueue::new(&instance, u64::MAX);
        assert_eq!(queue.height_bound(5), Some(4));
        assert_eq!(queue.height_bound(6), Some(2));
        assert_eq!(queue.height_bound(2), None);
    }

    #[test]
    fn test_queue_is_monotone() {
        let instance = Instance::from_dimensions(false, None, &[(2, 6), (2, 6), (4, 3), (3, 4)]);
        let mut queue = BoxQueue::new(&instance, 200);
        let mut last = 0;
        let mut popped = 0;
        while let Some(candidate) = queue.pop() {
            assert!(candidate.area >= last);
            assert!(candidate.area >= instance.total_area());
            last = candidate.area;
            queue.advance(candidate);
            popped += 1;
        }
        assert!(popped > 0);
    }

    #[test]
    fn test_fixed_height_queue() {
        let instance = Instance::from_dimensions(false, Some(4), &[(2, 4), (2, 2), (2, 2)]);
        let mut queue = BoxQueue::new(&instance, u64::MAX);
        let first = queue.pop().unwrap();
        assert_eq!((first.width, first.height), (4, 4));
        queue.advance(first);
        let second = queue.pop().unwrap();
        assert_eq!((second.width, second.height), (6, 4));
    }

    #[test]
    fn test_finds_optimal_box() {
        let instance = Instance::from_dimensions(false, None, &[(2, 6), (2, 6), (4, 3), (4, 3)]);
        let result = BoundingBoxGenerator::default()
            .generate(&instance, &SearchContext::unbounded())
            .unwrap();
        assert_eq!(result.status, SolutionStatus::Optimal);
        let best = result.best.unwrap();
        assert!(best.verify_matches(&instance).is_ok());
        assert_eq!(best.area(), 48);
    }

    #[test]
    fn test_perfect_square() {
        let instance = Instance::from_dimensions(true, None, &[(1, 2), (2, 1), (1, 1), (2, 2)]);
        let result = BoundingBoxGenerator::default()
            .generate(&instance, &SearchContext::unbounded())
            .unwrap();
        assert_eq!(result.status, SolutionStatus::Optimal);
        assert_eq!(result.area(), Some(9));
    }
}
