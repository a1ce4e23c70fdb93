//! Column bookkeeping of the x-stage.

/// Free height per unit column, plus the two histograms used by
/// wasted-space pruning.
///
/// * `empty_space[h]`: free cells summed over columns whose free height is
///   exactly `h`.
/// * `area_by_height[h]`: area of unplaced rectangles whose height key is
///   `h` (the shorter side for rectangles that may still be rotated).
#[derive(Debug, Clone)]
pub struct Columns {
    free: Vec<u32>,
    empty_space: Vec<u64>,
    area_by_height: Vec<u64>,
}

impl Columns {
    /// All columns free in a `width × height` box.
    pub fn new(width: u32, height: u32) -> Self {
        let mut empty_space = vec![0; height as usize + 1];
        empty_space[height as usize] = width as u64 * height as u64;
        Self {
            free: vec![height; width as usize],
            empty_space,
            area_by_height: vec![0; height as usize + 1],
        }
    }

    /// Box width.
    pub fn width(&self) -> u32 {
        self.free.len() as u32
    }

    /// Free height of column `x`.
    pub fn free(&self, x: u32) -> u32 {
        self.free[x as usize]
    }

    /// Free cells over all columns.
    #[cfg(test)]
    pub fn free_area(&self) -> u64 {
        self.empty_space.iter().sum()
    }

    /// Checks that columns `x .. x + width` each have `height` free cells.
    /// On failure returns the first column that does not.
    pub fn fits(&self, x: u32, width: u32, height: u32) -> Result<(), u32> {
        if x + width > self.width() {
            return Err(self.width().saturating_sub(1));
        }
        match (x..x + width).find(|&c| self.free[c as usize] < height) {
            Some(column) => Err(column),
            None => Ok(()),
        }
    }

    /// Takes `height` cells from each column in `x .. x + width`.
    pub fn occupy(&mut self, x: u32, width: u32, height: u32) {
        for c in x..x + width {
            let before = self.free[c as usize];
            let after = before - height;
            self.empty_space[before as usize] -= before as u64;
            self.empty_space[after as usize] += after as u64;
            self.free[c as usize] = after;
        }
    }

    /// Reverts [`Columns::occupy`].
    pub fn release(&mut self, x: u32, width: u32, height: u32) {
        for c in x..x + width {
            let before = self.free[c as usize];
            let after = before + height;
            self.empty_space[before as usize] -= before as u64;
            self.empty_space[after as usize] += after as u64;
            self.free[c as usize] = after;
        }
    }

    /// Registers an unplaced rectangle.
    pub fn add_unplaced(&mut self, key: u32, area: u64) {
        if let Some(bucket) = self.area_by_height.get_mut(key as usize) {
            *bucket += area;
        }
    }

    /// Unregisters an unplaced rectangle.
    pub fn remove_unplaced(&mut self, key: u32, area: u64) {
        if let Some(bucket) = self.area_by_height.get_mut(key as usize) {
            *bucket -= area;
        }
    }

    /// Wasted-space test: scanning heights from the top, the unplaced
    /// area needing at least `h` free cells per column must never exceed
    /// the free cells in columns with at least `h` free cells.
    pub fn has_room(&self) -> bool {
        let mut available = 0u64;
        let mut needed = 0u64;
        for h in (1..self.empty_space.len()).rev() {
            available += self.empty_space[h];
            needed += self.area_by_height[h];
            if needed > available {
                return false;
            }
        }
        true
    }
}
