//! Y-assignment under fixed x coordinates.
//!
//! The search always works at the open corner: the lowest, then leftmost,
//! free cell of the box. Every cell below the corner's row and left of it
//! in its row is already decided, so the occupied part of each column is a
//! solid stack and the occupied-cell grid reduces to one fill level per
//! column. At the corner either an item whose x equals the corner's x is
//! anchored there, a filler cell is, or the cell is declared waste: the
//! column is closed up to the next height an item could rest at.
//!
//! The search is a depth-first walk over an explicit stack of frames; each
//! frame remembers the choice it applied so backtracking reverts choices in
//! LIFO order. Filler-heavy boxes reach depths far beyond what recursion
//! would allow.

use super::subset_sum::SubsetSums;
use super::Item;
use rectpack_core::SearchContext;

/// One way to decide the cell at the open corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Item(usize),
    Filler,
    Waste(u32),
}

#[derive(Debug)]
struct Frame {
    x: u32,
    y: u32,
    options: Vec<Choice>,
    next: usize,
    applied: Option<Choice>,
}

/// Y positions found by [`YStage::solve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct YAssignment {
    /// Bottom edge per item, in item order.
    pub ys: Vec<u32>,
    /// Lower-left cells of the filler entries, in placement order.
    pub fillers: Vec<(u32, u32)>,
}

/// Search state of one y-assignment.
pub(crate) struct YStage<'a> {
    items: &'a [Item],
    height: u32,
    levels: Vec<u32>,
    by_column: Vec<Vec<usize>>,
    fillers_left: Vec<u32>,
    placed: Vec<Option<u32>>,
    filler_spots: Vec<(u32, u32)>,
    unplaced: usize,
    remaining_area: u64,
    free_area: u64,
    rest_heights: SubsetSums,
}

impl<'a> YStage<'a> {
    /// Prepares the search for `items` (x already fixed) and `fillers[x]`
    /// filler cells per column of a `width × height` box.
    pub fn new(items: &'a [Item], fillers: Vec<u32>, width: u32, height: u32) -> Self {
        let mut by_column = vec![Vec::new(); width as usize];
        for (i, item) in items.iter().enumerate() {
            by_column[item.x as usize].push(i);
        }
        let remaining_area =
            items.iter().map(Item::area).sum::<u64>() + fillers.iter().map(|&f| f as u64).sum::<u64>();
        let rest_heights = SubsetSums::new(items.iter().map(|item| item.size().1), height);
        Self {
            items,
            height,
            levels: vec![0; width as usize],
            by_column,
            fillers_left: fillers,
            placed: vec![None; items.len()],
            filler_spots: Vec::new(),
            unplaced: items.len(),
            remaining_area,
            free_area: width as u64 * height as u64,
            rest_heights,
        }
    }

    /// Runs the search. Returns `None` when no assignment exists or the
    /// context was cancelled.
    pub fn solve(mut self, ctx: &SearchContext) -> Option<YAssignment> {
        if self.remaining_area > self.free_area {
            return None;
        }
        if self.is_done() {
            return Some(self.assignment());
        }
        let mut stack: Vec<Frame> = Vec::new();
        let first = self.frame()?;
        stack.push(first);

        loop {
            if ctx.tick() {
                return None;
            }
            let (choice, x, y) = {
                let frame = stack.last_mut()?;
                if let Some(applied) = frame.applied.take() {
                    let (x, y) = (frame.x, frame.y);
                    self.revert(applied, x, y);
                }
                if frame.next >= frame.options.len() {
                    stack.pop();
                    continue;
                }
                let choice = frame.options[frame.next];
                frame.next += 1;
                frame.applied = Some(choice);
                (choice, frame.x, frame.y)
            };
            self.apply(choice, x, y);

            if self.is_done() {
                return Some(self.assignment());
            }
            if self.free_area < self.remaining_area {
                continue;
            }
            if let Some(frame) = self.frame() {
                stack.push(frame);
            }
        }
    }

    fn is_done(&self) -> bool {
        self.unplaced == 0 && self.fillers_left.iter().all(|&f| f == 0)
    }

    fn assignment(&self) -> YAssignment {
        YAssignment {
            ys: self.placed.iter().map(|y| y.unwrap_or(0)).collect(),
            fillers: self.filler_spots.clone(),
        }
    }

    /// The open corner: lowest fill level, leftmost on ties.
    fn corner(&self) -> Option<(u32, u32)> {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, &level)| level < self.height)
            .min_by_key(|(x, &level)| (level, *x))
            .map(|(x, &level)| (x as u32, level))
    }

    /// Builds the frame of the current open corner, or `None` if nothing
    /// can be done there.
    fn frame(&self) -> Option<Frame> {
        let (x, y) = self.corner()?;
        let run = self.levels[x as usize..]
            .iter()
            .take_while(|&&level| level == y)
            .count() as u32;

        let mut options = Vec::new();
        let mut tried: Vec<(u32, u32)> = Vec::new();
        for &i in &self.by_column[x as usize] {
            if self.placed[i].is_some() {
                continue;
            }
            let (w, h) = self.items[i].size();
            if w > run || y + h > self.height || tried.contains(&(w, h)) {
                continue;
            }
            tried.push((w, h));
            options.push(Choice::Item(i));
        }
        if self.fillers_left[x as usize] > 0 {
            options.push(Choice::Filler);
        }
        let slack = self.free_area - self.remaining_area;
        if slack > 0 {
            let ends = self
                .rest_heights
                .range(y + 1, self.height)
                .chain(std::iter::once(self.height));
            let mut last = y;
            for end in ends {
                if end == last {
                    continue;
                }
                if (end - y) as u64 > slack {
                    break;
                }
                options.push(Choice::Waste(end));
                last = end;
            }
        }

        if options.is_empty() {
            None
        } else {
            Some(Frame {
                x,
                y,
                options,
                next: 0,
                applied: None,
            })
        }
    }

    fn apply(&mut self, choice: Choice, x: u32, y: u32) {
        match choice {
            Choice::Item(i) => {
                let (w, h) = self.items[i].size();
                for level in &mut self.levels[x as usize..(x + w) as usize] {
                    *level = y + h;
                }
                self.placed[i] = Some(y);
                self.unplaced -= 1;
                self.remaining_area -= self.items[i].area();
                self.free_area -= self.items[i].area();
            }
            Choice::Filler => {
                self.levels[x as usize] = y + 1;
                self.fillers_left[x as usize] -= 1;
                self.filler_spots.push((x, y));
                self.remaining_area -= 1;
                self.free_area -= 1;
            }
            Choice::Waste(end) => {
                self.levels[x as usize] = end;
                self.free_area -= (end - y) as u64;
            }
        }
    }

    fn revert(&mut self, choice: Choice, x: u32, y: u32) {
        match choice {
            Choice::Item(i) => {
                let (w, _) = self.items[i].size();
                for level in &mut self.levels[x as usize..(x + w) as usize] {
                    *level = y;
                }
                self.placed[i] = None;
                self.unplaced += 1;
                self.remaining_area += self.items[i].area();
                self.free_area += self.items[i].area();
            }
            Choice::Filler => {
                self.levels[x as usize] = y;
                self.fillers_left[x as usize] += 1;
                self.filler_spots.pop();
                self.remaining_area += 1;
                self.free_area += 1;
            }
            Choice::Waste(end) => {
                self.levels[x as usize] = y;
                self.free_area += (end - y) as u64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(x: u32, width: u32, height: u32) -> Item {
        let mut item = Item::new(0, width, height, false);
        item.x = x;
        item
    }

    #[test]
    fn test_stacks_items_in_one_column() {
        let items = vec![item(0, 2, 3), item(0, 2, 2)];
        let found = YStage::new(&items, vec![0, 0], 2, 5)
            .solve(&SearchContext::unbounded())
            .unwrap();
        let mut ys = found.ys.clone();
        ys.sort_unstable();
        assert_eq!(ys, vec![0, 3]);
    }

    #[test]
    fn test_bars_rest_on_wide_block() {
        let items = vec![item(0, 2, 1), item(0, 1, 2), item(1, 1, 2)];
        let found = YStage::new(&items, vec![0, 0], 2, 3)
            .solve(&SearchContext::unbounded())
            .unwrap();
        assert_eq!(found.ys, vec![0, 1, 1]);
    }

    #[test]
    fn test_overfull_column_fails() {
        let items = vec![item(0, 1, 3), item(0, 1, 3)];
        assert!(YStage::new(&items, vec![0], 1, 5)
            .solve(&SearchContext::unbounded())
            .is_none());
    }

    #[test]
    fn test_fillers_close_gaps() {
        let items = vec![item(0, 1, 2)];
        let found = YStage::new(&items, vec![1, 3], 2, 3)
            .solve(&SearchContext::unbounded())
            .unwrap();
        assert_eq!(found.fillers.len(), 4);
        assert!(!found.fillers.contains(&(0, found.ys[0])));
    }

    #[test]
    fn test_cancelled_search_gives_up() {
        let ctx = SearchContext::unbounded();
        ctx.token().cancel();
        let items = vec![item(0, 1, 1), item(0, 1, 1)];
        assert!(YStage::new(&items, vec![0], 1, 3).solve(&ctx).is_none());
    }
}
