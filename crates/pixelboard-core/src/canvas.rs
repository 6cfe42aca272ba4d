use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cell::Cell;
use crate::chunk::{to_local_coords, Chunk, ChunkLayout, CHUNK_SIZE};
use crate::error::{CanvasError, CheckpointError};
use crate::palette::{Color, Palette};

/// Default bound on waiting for a region lock during a write
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Point-in-time copy of the whole canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSnapshot {
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
    /// Row-major cells, `cells[y][x]`
    pub cells: Vec<Vec<Cell>>,
}

impl CanvasSnapshot {
    /// Number of cells that have been painted at least once
    pub fn painted_cells(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_painted())
            .count()
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&Cell> {
        self.cells.get(y as usize)?.get(x as usize)
    }
}

/// The authoritative grid.
///
/// Cells are grouped into 16x16 regions, each behind its own lock. Reads take
/// shared locks; [`CanvasStore::set_cell`] takes one exclusive region lock and
/// replaces the whole cell while holding it.
pub struct CanvasStore {
    layout: ChunkLayout,
    created_at: DateTime<Utc>,
    palette: Palette,
    lock_timeout: Duration,
    chunks: Vec<RwLock<Chunk<Cell>>>,
}

impl CanvasStore {
    /// Create a canvas with every cell set to `default_color`.
    ///
    /// Zero dimensions are raised to one so that every canvas has a cell.
    pub fn new(
        width: u32,
        height: u32,
        default_color: Color,
        palette: Palette,
        created_at: DateTime<Utc>,
    ) -> Self {
        let layout = ChunkLayout::new(width.max(1), height.max(1));
        let chunks = (0..layout.len())
            .map(|_| RwLock::new(Chunk::filled(Cell::blank(default_color))))
            .collect();

        Self {
            layout,
            created_at,
            palette,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            chunks,
        }
    }

    /// Rebuild a canvas from a checkpoint taken with [`CanvasStore::get`]
    pub fn restore(snapshot: CanvasSnapshot, palette: Palette) -> Result<Self, CheckpointError> {
        let rows_ok = snapshot.cells.len() == snapshot.height as usize
            && snapshot
                .cells
                .iter()
                .all(|row| row.len() == snapshot.width as usize);
        if snapshot.width == 0 || snapshot.height == 0 || !rows_ok {
            return Err(CheckpointError::DimensionMismatch {
                width: snapshot.width,
                height: snapshot.height,
                found_width: snapshot.cells.first().map_or(0, |row| row.len() as u32),
                found_height: snapshot.cells.len() as u32,
            });
        }

        let store = CanvasStore::new(
            snapshot.width,
            snapshot.height,
            Color::default(),
            palette,
            snapshot.created_at,
        );

        for (y, row) in snapshot.cells.into_iter().enumerate() {
            for (x, cell) in row.into_iter().enumerate() {
                let (x, y) = (x as u32, y as u32);
                if !store.palette.contains(cell.color) {
                    return Err(CheckpointError::ColorOutsidePalette {
                        x,
                        y,
                        color: cell.color,
                    });
                }
                let (lx, ly) = to_local_coords(x, y);
                *store.chunks[store.layout.chunk_index(x, y)]
                    .write()
                    .get_mut(lx, ly) = cell;
            }
        }

        Ok(store)
    }

    /// Set how long a write waits for its region lock before giving up
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn width(&self) -> u32 {
        self.layout.width
    }

    pub fn height(&self) -> u32 {
        self.layout.height
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    fn check_bounds(&self, x: u32, y: u32) -> Result<(), CanvasError> {
        if self.layout.contains(x, y) {
            Ok(())
        } else {
            Err(CanvasError::OutOfBounds {
                x,
                y,
                width: self.layout.width,
                height: self.layout.height,
            })
        }
    }

    /// Copy the full grid.
    ///
    /// Each region is read under its own shared lock, so every cell in the
    /// result is a complete write, never a mix of two.
    pub fn get(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            width: self.width(),
            height: self.height(),
            created_at: self.created_at,
            cells: self.collect_rows(Cell::clone),
        }
    }

    /// Get the cell at (x, y)
    pub fn get_cell(&self, x: u32, y: u32) -> Result<Cell, CanvasError> {
        self.check_bounds(x, y)?;
        let (lx, ly) = to_local_coords(x, y);
        let chunk = self.chunks[self.layout.chunk_index(x, y)].read();
        Ok(chunk.get(lx, ly).clone())
    }

    /// Check that painting (x, y) with `color` would be accepted, without
    /// taking any lock
    pub fn check_placement(&self, x: u32, y: u32, color: Color) -> Result<(), CanvasError> {
        self.check_bounds(x, y)?;
        if !self.palette.contains(color) {
            return Err(CanvasError::InvalidColor(color));
        }
        Ok(())
    }

    /// Paint the cell at (x, y) and return its new state.
    ///
    /// Nothing is changed unless the call succeeds.
    pub fn set_cell(
        &self,
        x: u32,
        y: u32,
        color: Color,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Cell, CanvasError> {
        self.set_cell_with(x, y, color, user_id, now, |_| {})
    }

    /// Like [`CanvasStore::set_cell`], but runs `on_applied` with the new cell
    /// before the region lock is released.
    ///
    /// Writes to one cell are serialized by that lock, so the order in which
    /// `on_applied` observes them is the order they were applied in.
    pub fn set_cell_with(
        &self,
        x: u32,
        y: u32,
        color: Color,
        user_id: &str,
        now: DateTime<Utc>,
        on_applied: impl FnOnce(&Cell),
    ) -> Result<Cell, CanvasError> {
        self.check_placement(x, y, color)?;

        let (lx, ly) = to_local_coords(x, y);
        let mut chunk = self.chunks[self.layout.chunk_index(x, y)]
            .try_write_for(self.lock_timeout)
            .ok_or(CanvasError::LockTimeout { x, y })?;

        let cell = Cell::painted(color, user_id, now);
        *chunk.get_mut(lx, ly) = cell.clone();
        on_applied(&cell);
        Ok(cell)
    }

    /// Current colors, row-major (`grid[y][x]`)
    pub fn to_grid(&self) -> Vec<Vec<Color>> {
        self.collect_rows(|cell| cell.color)
    }

    fn collect_rows<T>(&self, map: impl Fn(&Cell) -> T) -> Vec<Vec<T>> {
        let mut rows: Vec<Vec<T>> = (0..self.height())
            .map(|_| Vec::with_capacity(self.width() as usize))
            .collect();

        // Walk one band of chunk rows at a time so each lock is taken once
        for (band, band_rows) in rows.chunks_mut(CHUNK_SIZE).enumerate() {
            for block_col in 0..self.layout.chunks_x {
                let chunk = self.chunks[band * self.layout.chunks_x + block_col].read();
                let x_start = (block_col * CHUNK_SIZE) as u32;
                let x_end = (x_start + CHUNK_SIZE as u32).min(self.width());
                for (ly, row) in band_rows.iter_mut().enumerate() {
                    for x in x_start..x_end {
                        let (lx, _) = to_local_coords(x, 0);
                        row.push(map(chunk.get(lx, ly as u8)));
                    }
                }
            }
        }

        rows
    }

    #[cfg(test)]
    pub(crate) fn hold_region(
        &self,
        x: u32,
        y: u32,
    ) -> parking_lot::RwLockWriteGuard<'_, Chunk<Cell>> {
        self.chunks[self.layout.chunk_index(x, y)].write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn store(width: u32, height: u32) -> CanvasStore {
        CanvasStore::new(width, height, Color::WHITE, Palette::default(), at(0))
    }

    #[test]
    fn test_new_canvas_is_blank() {
        let canvas = store(3, 2);
        let snapshot = canvas.get();

        assert_eq!(snapshot.width, 3);
        assert_eq!(snapshot.height, 2);
        assert_eq!(snapshot.created_at, at(0));
        assert_eq!(snapshot.cells.len(), 2);
        assert!(snapshot.cells.iter().all(|row| row.len() == 3));
        assert!(snapshot.cells.iter().flatten().all(|c| *c == Cell::default()));
        assert_eq!(snapshot.painted_cells(), 0);
    }

    #[test]
    fn test_set_then_get_cell() {
        let canvas = store(40, 40);

        for &(x, y) in &[(0, 0), (15, 15), (16, 0), (39, 39), (20, 33)] {
            let placed = canvas.set_cell(x, y, Color::RED, "alice", at(5)).unwrap();
            assert_eq!(placed, Cell::painted(Color::RED, "alice", at(5)));

            let cell = canvas.get_cell(x, y).unwrap();
            assert_eq!(cell.color, Color::RED);
            assert_eq!(cell.last_editor_id.as_deref(), Some("alice"));
            assert_eq!(cell.last_edited_at, Some(at(5)));
        }

        assert_eq!(canvas.get().painted_cells(), 5);
        assert_eq!(canvas.get_cell(1, 0).unwrap(), Cell::default());
    }

    #[test]
    fn test_out_of_bounds_is_rejected_without_mutation() {
        let canvas = store(3, 3);
        let before = canvas.get();

        for &(x, y) in &[(3, 0), (0, 3), (3, 3), (u32::MAX, 0), (0, 16)] {
            assert!(matches!(
                canvas.get_cell(x, y),
                Err(CanvasError::OutOfBounds { width: 3, height: 3, .. })
            ));
            assert!(matches!(
                canvas.set_cell(x, y, Color::RED, "alice", at(1)),
                Err(CanvasError::OutOfBounds { .. })
            ));
        }

        assert_eq!(canvas.get(), before);
    }

    #[test]
    fn test_color_outside_palette_is_rejected() {
        let canvas = store(3, 3);
        let off_palette = Color::rgb(1, 2, 3);
        assert!(!canvas.palette().contains(off_palette));

        assert_eq!(
            canvas.set_cell(1, 1, off_palette, "alice", at(1)),
            Err(CanvasError::InvalidColor(off_palette))
        );
        assert_eq!(canvas.get_cell(1, 1).unwrap(), Cell::default());

        let open = CanvasStore::new(3, 3, Color::WHITE, Palette::Open, at(0));
        assert!(open.set_cell(1, 1, off_palette, "alice", at(1)).is_ok());
    }

    #[test]
    fn test_to_grid_is_row_major() {
        let canvas = store(20, 18);
        canvas.set_cell(17, 2, Color::BLUE, "bob", at(1)).unwrap();
        canvas.set_cell(2, 17, Color::RED, "bob", at(2)).unwrap();

        let grid = canvas.to_grid();
        assert_eq!(grid.len(), 18);
        assert!(grid.iter().all(|row| row.len() == 20));
        assert_eq!(grid[2][17], Color::BLUE);
        assert_eq!(grid[17][2], Color::RED);
        assert_eq!(grid[0][0], Color::WHITE);
    }

    #[test]
    fn test_lock_timeout_applies_nothing() {
        let canvas = store(3, 3).with_lock_timeout(Duration::from_millis(10));
        {
            let _held = canvas.hold_region(1, 1);
            assert_eq!(
                canvas.set_cell(1, 1, Color::RED, "alice", at(1)),
                Err(CanvasError::LockTimeout { x: 1, y: 1 })
            );
        }
        assert_eq!(canvas.get_cell(1, 1).unwrap(), Cell::default());
    }

    #[test]
    fn test_check_placement_takes_no_lock() {
        let canvas = store(3, 3).with_lock_timeout(Duration::from_secs(5));
        let _held = canvas.hold_region(1, 1);

        assert!(canvas.check_placement(1, 1, Color::RED).is_ok());
        assert_eq!(
            canvas.check_placement(1, 1, Color::rgb(1, 2, 3)),
            Err(CanvasError::InvalidColor(Color::rgb(1, 2, 3)))
        );
        assert!(matches!(
            canvas.check_placement(3, 1, Color::RED),
            Err(CanvasError::OutOfBounds { x: 3, y: 1, .. })
        ));
    }

    #[test]
    fn test_set_cell_with_sees_writes_in_applied_order() {
        for _ in 0..100 {
            let canvas = store(3, 3);
            let applied = parking_lot::Mutex::new(Vec::new());

            std::thread::scope(|scope| {
                for (user, color) in [("alice", Color::RED), ("bob", Color::BLUE)] {
                    let (canvas, applied) = (&canvas, &applied);
                    scope.spawn(move || {
                        canvas
                            .set_cell_with(1, 1, color, user, at(1), |cell| {
                                applied.lock().push(cell.clone())
                            })
                            .unwrap();
                    });
                }
            });

            let applied = applied.into_inner();
            assert_eq!(applied.len(), 2);
            assert_eq!(applied.last(), Some(&canvas.get_cell(1, 1).unwrap()));
        }
    }

    #[test]
    fn test_restore_from_snapshot() {
        let canvas = store(20, 5);
        canvas.set_cell(19, 4, Color::GREEN, "carol", at(9)).unwrap();

        let json = serde_json::to_string(&canvas.get()).unwrap();
        let snapshot: CanvasSnapshot = serde_json::from_str(&json).unwrap();
        let restored = CanvasStore::restore(snapshot, Palette::default()).unwrap();

        assert_eq!(restored.get(), canvas.get());
        assert_eq!(restored.created_at(), at(0));
        assert_eq!(
            restored.get().cell(19, 4).map(|cell| cell.color),
            Some(Color::GREEN)
        );
        assert_eq!(
            restored.get_cell(19, 4).unwrap(),
            Cell::painted(Color::GREEN, "carol", at(9))
        );
    }

    #[test]
    fn test_restore_rejects_bad_snapshots() {
        let mut snapshot = store(3, 3).get();
        snapshot.cells.pop();
        assert!(matches!(
            CanvasStore::restore(snapshot, Palette::default()),
            Err(CheckpointError::DimensionMismatch { found_height: 2, .. })
        ));

        let open = CanvasStore::new(3, 3, Color::WHITE, Palette::Open, at(0));
        open.set_cell(0, 0, Color::rgb(1, 2, 3), "alice", at(1)).unwrap();
        assert!(matches!(
            CanvasStore::restore(open.get(), Palette::default()),
            Err(CheckpointError::ColorOutsidePalette { x: 0, y: 0, .. })
        ));
    }
}
