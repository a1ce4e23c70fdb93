//! X-assignment backtracking.
//!
//! Items are taken widest first. Each one is tried at every candidate left
//! edge, lowest first, where all the columns it would cover still have
//! enough free height; the free height is then charged to those columns
//! and the wasted-space test decides whether the branch stays open. Once
//! every item has an x, the filler cells (if any) are dealt out to the
//! columns and the y-stage gets to place the lot.

use super::columns::Columns;
use super::subset_sum::SubsetSums;
use super::y_stage::{YAssignment, YStage};
use super::Item;
use rectpack_core::{ExactConfig, SearchContext};

/// Outcome of a successful search.
#[derive(Debug, Clone)]
pub(crate) struct Solution {
    /// Items with their final orientation and coordinates.
    pub items: Vec<Item>,
    /// Filler cells.
    pub fillers: Vec<(u32, u32)>,
}

/// X-stage search state.
pub(crate) struct XStage<'a> {
    config: &'a ExactConfig,
    ctx: &'a SearchContext,
    width: u32,
    height: u32,
    items: Vec<Item>,
    filler_count: u64,
    columns: Columns,
    lefts: SubsetSums,
    solution: Option<Solution>,
}

impl<'a> XStage<'a> {
    /// Prepares the search for a `width × height` box.
    pub fn new(
        config: &'a ExactConfig,
        ctx: &'a SearchContext,
        mut items: Vec<Item>,
        filler_count: u64,
        width: u32,
        height: u32,
    ) -> Self {
        items.sort_by(|a, b| {
            b.width
                .cmp(&a.width)
                .then(b.height.cmp(&a.height))
                .then(a.index.cmp(&b.index))
        });
        let lefts = SubsetSums::with_choices(
            items.iter().map(|item| {
                if item.rotatable {
                    (item.width, item.height)
                } else {
                    (item.width, item.width)
                }
            }),
            width,
        );
        let mut columns = Columns::new(width, height);
        for item in &items {
            columns.add_unplaced(item.key(), item.area());
        }
        columns.add_unplaced(1, filler_count);

        Self {
            config,
            ctx,
            width,
            height,
            items,
            filler_count,
            columns,
            lefts,
            solution: None,
        }
    }

    /// Runs the search.
    pub fn solve(mut self) -> Option<Solution> {
        let needed = self.items.iter().map(Item::area).sum::<u64>() + self.filler_count;
        if needed > self.width as u64 * self.height as u64 {
            return None;
        }
        if self.assign(0) {
            self.solution
        } else {
            None
        }
    }

    fn assign(&mut self, depth: usize) -> bool {
        if self.ctx.tick() {
            return false;
        }
        if depth == self.items.len() {
            return self.finish();
        }

        let orientations: &[bool] = if self.items[depth].rotatable {
            &[false, true]
        } else {
            &[false]
        };
        for &rotated in orientations {
            self.items[depth].rotated = rotated;
            let (w, h) = self.items[depth].size();
            if w > self.width || h > self.height {
                continue;
            }
            let (lower, upper) = self.bounds(depth, w, h);

            let mut next = self.lefts.next_at_least(lower);
            while let Some(x) = next {
                if x > upper {
                    break;
                }
                match self.columns.fits(x, w, h) {
                    Err(column) => {
                        next = self.lefts.next_above(column);
                    }
                    Ok(()) => {
                        let key = self.items[depth].key();
                        let area = self.items[depth].area();
                        self.columns.occupy(x, w, h);
                        self.columns.remove_unplaced(key, area);
                        self.items[depth].x = x;

                        let open = !self.config.use_wasted_space_pruning || self.columns.has_room();
                        if open && self.assign(depth + 1) {
                            return true;
                        }

                        self.columns.release(x, w, h);
                        self.columns.add_unplaced(key, area);
                        if self.ctx.is_cancelled() {
                            return false;
                        }
                        next = self.lefts.next_above(x);
                    }
                }
            }
        }
        self.items[depth].rotated = false;
        false
    }

    /// Range of left edges open to the item at `depth`.
    fn bounds(&self, depth: usize, width: u32, height: u32) -> (u32, u32) {
        let mut upper = self.width - width;
        let mut lower = 0;
        if self.config.use_symmetry_breaking {
            if depth == 0 {
                // the mirror image of every packing is a packing
                upper /= 2;
            } else {
                let previous = &self.items[depth - 1];
                if previous.size() == (width, height) {
                    lower = previous.x;
                }
            }
        }
        (lower, upper)
    }

    /// Deals the filler cells out to the columns and runs the y-stage.
    fn finish(&mut self) -> bool {
        let mut fillers = vec![0u32; self.width as usize];
        let mut left = self.filler_count;
        for (x, slot) in fillers.iter_mut().enumerate() {
            if left == 0 {
                break;
            }
            let take = left.min(self.columns.free(x as u32) as u64);
            *slot = take as u32;
            left -= take;
        }
        if left > 0 {
            return false;
        }

        let found = YStage::new(&self.items, fillers, self.width, self.height).solve(self.ctx);
        match found {
            Some(YAssignment { ys, fillers }) => {
                let mut items = self.items.clone();
                for (item, y) in items.iter_mut().zip(ys) {
                    item.y = y;
                }
                self.solution = Some(Solution { items, fillers });
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(items: Vec<Item>, fillers: u64, width: u32, height: u32) -> Option<Solution> {
        let config = ExactConfig::default();
        let ctx = SearchContext::unbounded();
        XStage::new(&config, &ctx, items, fillers, width, height).solve()
    }

    fn overlaps(a: &Item, b: &Item) -> bool {
        let (aw, ah) = a.size();
        let (bw, bh) = b.size();
        a.x < b.x + bw && b.x < a.x + aw && a.y < b.y + bh && b.y < a.y + ah
    }

    #[test]
    fn test_two_columns() {
        let items = vec![Item::new(0, 2, 6, false), Item::new(1, 2, 6, false)];
        let solution = solve(items, 0, 4, 6).unwrap();
        let mut xs: Vec<_> = solution.items.iter().map(|i| i.x).collect();
        xs.sort_unstable();
        assert_eq!(xs, vec![0, 2]);
        assert!(solution.items.iter().all(|i| i.y == 0));
    }

    #[test]
    fn test_rotation_is_explored() {
        // a 4x1 bar only fits a 1x4 box standing up
        let items = vec![Item::new(0, 4, 1, true)];
        let solution = solve(items, 0, 1, 4).unwrap();
        assert!(solution.items[0].rotated);
        assert_eq!(solution.items[0].size(), (1, 4));
    }

    #[test]
    fn test_infeasible_box() {
        let items = vec![Item::new(0, 3, 3, false), Item::new(1, 3, 3, false)];
        assert!(solve(items, 0, 5, 5).is_none());
    }

    #[test]
    fn test_mixed_packing_has_no_overlap() {
        let items = vec![
            Item::new(0, 2, 6, false),
            Item::new(1, 2, 6, false),
            Item::new(2, 4, 3, false),
            Item::new(3, 4, 3, false),
        ];
        // 48 cells for 48 cells of rectangles
        let solution = solve(items, 0, 8, 6).unwrap();
        for (i, a) in solution.items.iter().enumerate() {
            let (w, h) = a.size();
            assert!(a.x + w <= 8 && a.y + h <= 6);
            for b in &solution.items[i + 1..] {
                assert!(!overlaps(a, b));
            }
        }
    }

    #[test]
    fn test_fillers_complete_the_box() {
        let items = vec![Item::new(0, 2, 2, false)];
        let solution = solve(items, 5, 3, 3).unwrap();
        assert_eq!(solution.fillers.len(), 5);
        let item = &solution.items[0];
        for &(x, y) in &solution.fillers {
            assert!(!(x >= item.x && x < item.x + 2 && y >= item.y && y < item.y + 2));
        }
    }
}
