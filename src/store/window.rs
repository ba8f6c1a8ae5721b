//! Dense query results.

use super::cell::{GridCoord, TileCell};

/// A rectangular slice of a table, copied out for one render call.
///
/// Local index `(i, j)` maps to world coordinate
/// `((x_start + i) mod world_width, (y_start + j) mod world_height)`, so the
/// same type serves plain and wrapped queries.
#[derive(Clone, Debug)]
pub struct TileWindow {
    pub x_start: u32,
    pub y_start: u32,
    pub width: u32,
    pub height: u32,
    world_width: u32,
    world_height: u32,
    cells: Vec<Option<TileCell>>,
}

impl TileWindow {
    /// An all-empty window.
    pub fn empty(
        x_start: u32,
        y_start: u32,
        width: u32,
        height: u32,
        world_width: u32,
        world_height: u32,
    ) -> Self {
        Self {
            x_start,
            y_start,
            width,
            height,
            world_width,
            world_height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    /// Cell at local offset `(i, j)`, or `None` outside the window or for
    /// coordinates without data.
    pub fn get_local(&self, i: i64, j: i64) -> Option<&TileCell> {
        if i < 0 || j < 0 || i >= self.width as i64 || j >= self.height as i64 {
            return None;
        }
        self.cells[j as usize * self.width as usize + i as usize].as_ref()
    }

    /// Cell at a world coordinate, if the window covers it.
    pub fn get(&self, coord: GridCoord) -> Option<&TileCell> {
        let (i, j) = self.local_of(coord);
        self.get_local(i, j)
    }

    /// Local offset of a world coordinate, if it falls inside the window.
    pub fn local_offset(&self, coord: GridCoord) -> Option<(u32, u32)> {
        let (i, j) = self.local_of(coord);
        (i >= 0 && j >= 0 && i < self.width as i64 && j < self.height as i64).then_some((i as u32, j as u32))
    }

    pub(crate) fn set_local(&mut self, i: u32, j: u32, cell: Option<TileCell>) {
        if i < self.width && j < self.height {
            self.cells[j as usize * self.width as usize + i as usize] = cell;
        }
    }

    fn local_of(&self, coord: GridCoord) -> (i64, i64) {
        let wrap = |v: u32, start: u32, extent: u32| -> i64 {
            if extent == 0 {
                return -1;
            }
            (v as i64 - start as i64).rem_euclid(extent as i64)
        };
        (
            wrap(coord.x, self.x_start, self.world_width),
            wrap(coord.y, self.y_start, self.world_height),
        )
    }

    /// World coordinate of a local offset.
    pub fn world_coord(&self, i: u32, j: u32) -> GridCoord {
        GridCoord::new(
            (self.x_start + i) % self.world_width.max(1),
            (self.y_start + j) % self.world_height.max(1),
        )
    }

    /// Number of cells carrying data.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Iterate `(i, j, cell)` over cells with data, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &TileCell)> {
        let width = self.width.max(1);
        self.cells.iter().enumerate().filter_map(move |(idx, cell)| {
            cell.as_ref()
                .map(|c| (idx as u32 % width, idx as u32 / width, c))
        })
    }
}

/// Split `[start, start + len)` on a circle of size `extent` into at most two
/// inclusive, non-wrapped ranges. Each item is `(local_offset, first, last)`.
pub fn split_wrapped(start: u32, len: u32, extent: u32) -> Vec<(u32, u32, u32)> {
    if len == 0 || extent == 0 {
        return Vec::new();
    }
    let len = len.min(extent);
    let start = start % extent;
    let first_len = len.min(extent - start);
    let mut ranges = vec![(0, start, start + first_len - 1)];
    if first_len < len {
        ranges.push((first_len, 0, len - first_len - 1));
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_without_wrap() {
        assert_eq!(split_wrapped(10, 5, 100), vec![(0, 10, 14)]);
    }

    #[test]
    fn test_split_across_edge() {
        assert_eq!(split_wrapped(98, 5, 100), vec![(0, 98, 99), (2, 0, 2)]);
        // Start beyond the extent is reduced first.
        assert_eq!(split_wrapped(198, 5, 100), vec![(0, 98, 99), (2, 0, 2)]);
    }

    #[test]
    fn test_split_clamps_to_extent() {
        assert_eq!(split_wrapped(3, 50, 10), vec![(0, 3, 9), (7, 0, 2)]);
        assert!(split_wrapped(0, 0, 10).is_empty());
    }

    #[test]
    fn test_world_lookup_wraps() {
        let mut window = TileWindow::empty(8, 0, 4, 2, 10, 5);
        window.set_local(3, 1, Some(TileCell::new([1, 2, 3], 7)));
        assert_eq!(window.world_coord(3, 1), GridCoord::new(1, 1));
        assert_eq!(window.get(GridCoord::new(1, 1)).map(|c| c.elevation), Some(7));
        assert!(window.get(GridCoord::new(5, 1)).is_none());
        assert_eq!(window.filled(), 1);
    }
}
