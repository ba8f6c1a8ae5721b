//! One keyed table of cells (terrain or clouds), optionally backed by a JSONL file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::cell::{GridCoord, Record, TileCell};
use super::window::{split_wrapped, TileWindow};
use crate::error::StoreError;
use crate::tilemap::Tilemap;

/// Which field a table holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    Terrain,
    Clouds,
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Terrain => "terrain",
            Layer::Clouds => "clouds",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Layer::Terrain => "terrain.jsonl",
            Layer::Clouds => "clouds.jsonl",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What [`TileTable::populate`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopulateOutcome {
    /// The table was already complete; nothing was written.
    Skipped,
    /// Cells were upserted (and persisted, for file-backed tables).
    Written { cells: usize },
}

/// Dense keyed grid of cells. Upserting by coordinate makes duplicate rows
/// impossible; `row_count` counts occupied slots.
#[derive(Clone, Debug)]
pub struct TileTable {
    layer: Layer,
    path: Option<PathBuf>,
    cells: Tilemap<Option<TileCell>>,
    row_count: usize,
}

impl TileTable {
    pub fn in_memory(layer: Layer, width: u32, height: u32) -> Self {
        Self {
            layer,
            path: None,
            cells: Tilemap::new(width as usize, height as usize),
            row_count: 0,
        }
    }

    /// Open the table stored at `path`, loading any rows already there.
    ///
    /// A missing file yields an empty table. An unparseable final line (an
    /// interrupted write) is dropped with a warning; bad lines elsewhere are
    /// errors.
    pub fn open(layer: Layer, path: &Path, width: u32, height: u32) -> Result<Self, StoreError> {
        let mut table = Self::in_memory(layer, width, height);
        table.path = Some(path.to_path_buf());

        if !path.exists() {
            debug!(layer = %layer, path = %path.display(), "no table file yet");
            return Ok(table);
        }

        let start = Instant::now();
        let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let last = lines.len().saturating_sub(1);

        for (idx, line) in lines.iter().enumerate() {
            let parsed = serde_json::from_str::<Record>(line)
                .map_err(|e| StoreError::json(path, e))
                .and_then(Record::into_cell);
            match parsed {
                Ok((coord, cell)) => table.upsert(coord, cell)?,
                Err(err) if idx == last => {
                    warn!(layer = %layer, line = idx + 1, error = %err, "dropping truncated trailing record");
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            layer = %layer,
            rows = table.row_count,
            expected = table.capacity(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded table"
        );
        Ok(table)
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn width(&self) -> u32 {
        self.cells.width as u32
    }

    pub fn height(&self) -> u32 {
        self.cells.height as u32
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of distinct coordinates holding a cell.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// True once every coordinate of the world has a cell.
    pub fn has_data(&self) -> bool {
        self.row_count == self.capacity()
    }

    pub fn get(&self, coord: GridCoord) -> Option<&TileCell> {
        if coord.x >= self.width() || coord.y >= self.height() {
            return None;
        }
        self.cells.get(coord.x as usize, coord.y as usize).as_ref()
    }

    fn upsert(&mut self, coord: GridCoord, cell: TileCell) -> Result<(), StoreError> {
        if coord.x >= self.width() || coord.y >= self.height() {
            return Err(StoreError::OutOfBounds {
                x: coord.x,
                y: coord.y,
                width: self.width(),
                height: self.height(),
            });
        }
        let slot = self.cells.get_mut(coord.x as usize, coord.y as usize);
        if slot.is_none() {
            self.row_count += 1;
        }
        *slot = Some(cell);
        Ok(())
    }

    /// Bulk-write cells. A no-op when the table is already complete.
    pub fn populate<I>(&mut self, cells: I) -> Result<PopulateOutcome, StoreError>
    where
        I: IntoIterator<Item = (GridCoord, TileCell)>,
    {
        if self.has_data() {
            debug!(layer = %self.layer, "table complete, skipping populate");
            return Ok(PopulateOutcome::Skipped);
        }

        let mut written = 0;
        for (coord, cell) in cells {
            self.upsert(coord, cell)?;
            written += 1;
        }
        self.persist()?;
        Ok(PopulateOutcome::Written { cells: written })
    }

    /// Rewrite the backing file through a temp file and rename.
    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let start = Instant::now();
        let tmp = path.with_extension("jsonl.tmp");
        {
            let file = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
            let mut writer = BufWriter::new(file);
            for (coord, cell) in self.iter() {
                serde_json::to_writer(&mut writer, &Record::from_cell(coord, cell))
                    .map_err(|e| StoreError::json(&tmp, e))?;
                writer.write_all(b"\n").map_err(|e| StoreError::io(&tmp, e))?;
            }
            writer.flush().map_err(|e| StoreError::io(&tmp, e))?;
        }
        fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
        info!(
            layer = %self.layer,
            rows = self.row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "saved table"
        );
        Ok(())
    }

    /// Iterate every stored cell, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &TileCell)> {
        self.cells.iter().filter_map(|(x, y, cell)| {
            cell.as_ref()
                .map(|c| (GridCoord::new(x as u32, y as u32), c))
        })
    }

    /// Cells with `x0 <= x <= x1` and `y0 <= y <= y1`. Bounds past the world
    /// edge are clamped; an inverted range yields an empty window.
    pub fn query_range(&self, x0: u32, x1: u32, y0: u32, y1: u32) -> TileWindow {
        let (w, h) = (self.width(), self.height());
        if x0 > x1 || y0 > y1 || x0 >= w || y0 >= h {
            return TileWindow::empty(x0.min(w), y0.min(h), 0, 0, w, h);
        }
        let x1 = x1.min(w - 1);
        let y1 = y1.min(h - 1);
        let mut window = TileWindow::empty(x0, y0, x1 - x0 + 1, y1 - y0 + 1, w, h);
        for y in y0..=y1 {
            for x in x0..=x1 {
                window.set_local(x - x0, y - y0, *self.cells.get(x as usize, y as usize));
            }
        }
        window
    }

    /// A `width`×`height` window starting at `(x_start, y_start)` that wraps
    /// around both world edges. Built from at most four `query_range` calls.
    pub fn query_wrapped(&self, x_start: u32, y_start: u32, width: u32, height: u32) -> TileWindow {
        let (w, h) = (self.width(), self.height());
        let x_ranges = split_wrapped(x_start, width, w);
        let y_ranges = split_wrapped(y_start, height, h);
        let mut window = TileWindow::empty(
            x_start % w.max(1),
            y_start % h.max(1),
            width.min(w),
            height.min(h),
            w,
            h,
        );
        for &(j_off, y0, y1) in &y_ranges {
            for &(i_off, x0, x1) in &x_ranges {
                let part = self.query_range(x0, x1, y0, y1);
                for j in 0..part.height {
                    for i in 0..part.width {
                        window.set_local(i_off + i, j_off + j, part.get_local(i as i64, j as i64).copied());
                    }
                }
            }
        }
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(v: u8) -> TileCell {
        TileCell::new([v, v, v], v as u16 * 100)
    }

    fn full_table(width: u32, height: u32) -> TileTable {
        let mut table = TileTable::in_memory(Layer::Terrain, width, height);
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| (GridCoord::new(x, y), cell((x + y * width) as u8))));
        table.populate(cells).unwrap();
        table
    }

    #[test]
    fn test_single_cell_round_trip() {
        let mut table = TileTable::in_memory(Layer::Terrain, 10, 10);
        table
            .populate([(GridCoord::new(5, 5), TileCell::new([10, 20, 30], 40000))])
            .unwrap();
        let window = table.query_range(5, 5, 5, 5);
        assert_eq!(window.width, 1);
        assert_eq!(
            window.get(GridCoord::new(5, 5)),
            Some(&TileCell::new([10, 20, 30], 40000))
        );
    }

    #[test]
    fn test_partial_table_is_not_complete() {
        let mut table = TileTable::in_memory(Layer::Clouds, 4, 4);
        let cells = (0..15).map(|i| (GridCoord::new(i % 4, i / 4), cell(1)));
        table.populate(cells).unwrap();
        assert_eq!(table.row_count(), 15);
        assert!(!table.has_data());
    }

    #[test]
    fn test_upsert_never_duplicates() {
        let mut table = TileTable::in_memory(Layer::Terrain, 4, 4);
        let coord = GridCoord::new(1, 2);
        table.populate([(coord, cell(1)), (coord, cell(2))]).unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.get(coord), Some(&cell(2)));
    }

    #[test]
    fn test_populate_skips_complete_table() {
        let mut table = full_table(3, 2);
        assert!(table.has_data());
        let outcome = table.populate([(GridCoord::new(0, 0), cell(99))]).unwrap();
        assert_eq!(outcome, PopulateOutcome::Skipped);
        assert_eq!(table.get(GridCoord::new(0, 0)), Some(&cell(0)));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut table = TileTable::in_memory(Layer::Terrain, 4, 4);
        let result = table.populate([(GridCoord::new(4, 0), cell(1))]);
        assert!(matches!(result, Err(StoreError::OutOfBounds { x: 4, .. })));
    }

    #[test]
    fn test_absent_cells_are_none() {
        let mut table = TileTable::in_memory(Layer::Terrain, 4, 4);
        table.populate([(GridCoord::new(0, 0), cell(1))]).unwrap();
        let window = table.query_range(0, 3, 0, 3);
        assert_eq!(window.filled(), 1);
        assert!(window.get(GridCoord::new(2, 2)).is_none());
    }

    #[test]
    fn test_query_range_clamps_and_handles_inverted_bounds() {
        let table = full_table(4, 4);
        let window = table.query_range(2, 10, 3, 10);
        assert_eq!((window.width, window.height), (2, 1));
        assert_eq!(table.query_range(3, 1, 0, 0).filled(), 0);
    }

    #[test]
    fn test_query_wrapped_matches_direct_lookup() {
        let table = full_table(6, 5);
        let window = table.query_wrapped(4, 3, 4, 4);
        assert_eq!(window.filled(), 16);
        for j in 0..4 {
            for i in 0..4 {
                let coord = GridCoord::new((4 + i) % 6, (3 + j) % 5);
                assert_eq!(window.get_local(i as i64, j as i64), table.get(coord));
            }
        }
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.jsonl");
        {
            let mut table = TileTable::open(Layer::Terrain, &path, 3, 2).unwrap();
            assert_eq!(table.row_count(), 0);
            let cells = (0..6).map(|i| (GridCoord::new(i % 3, i / 3), cell(i as u8)));
            table.populate(cells).unwrap();
        }
        let reopened = TileTable::open(Layer::Terrain, &path, 3, 2).unwrap();
        assert!(reopened.has_data());
        assert_eq!(reopened.get(GridCoord::new(2, 1)), Some(&cell(5)));
        assert!(!path.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn test_truncated_trailing_line_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clouds.jsonl");
        fs::write(
            &path,
            "{\"x\":0,\"y\":0,\"color\":\"1,2,3\",\"elevation\":5}\n{\"x\":1,\"y\":0,\"col",
        )
        .unwrap();
        let table = TileTable::open(Layer::Clouds, &path, 2, 1).unwrap();
        assert_eq!(table.row_count(), 1);
        assert!(!table.has_data());
    }

    #[test]
    fn test_corrupt_middle_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.jsonl");
        fs::write(
            &path,
            "garbage\n{\"x\":0,\"y\":0,\"color\":\"1,2,3\",\"elevation\":5}\n",
        )
        .unwrap();
        assert!(matches!(
            TileTable::open(Layer::Terrain, &path, 2, 1),
            Err(StoreError::Json { .. })
        ));
    }
}
