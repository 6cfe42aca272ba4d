//! Region partitioning for the canvas grid.
//!
//! The grid is split into 16x16 blocks. Each block is stored densely and guarded
//! by its own lock in [`crate::canvas::CanvasStore`], so writers to different
//! regions never contend. Blocks on the right and bottom edges may extend past
//! the canvas; those slots hold default cells and are never addressed.

/// Size of each chunk in both dimensions (16x16 cells per chunk).
pub const CHUNK_SIZE: usize = 16;

/// Coordinate of a chunk in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    /// Which 16-row block (y / CHUNK_SIZE)
    pub block_row: usize,
    /// Which 16-column block (x / CHUNK_SIZE)
    pub block_col: usize,
}

impl ChunkCoord {
    /// Create a ChunkCoord from a cell's canvas coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use pixelboard_core::ChunkCoord;
    ///
    /// let coord = ChunkCoord::from_cell(33, 17);
    /// assert_eq!(coord.block_row, 1);
    /// assert_eq!(coord.block_col, 2);
    /// ```
    pub fn from_cell(x: u32, y: u32) -> Self {
        Self {
            block_row: y as usize / CHUNK_SIZE,
            block_col: x as usize / CHUNK_SIZE,
        }
    }
}

/// A single dense 16x16 block of cells, indexed by local coordinates.
#[derive(Clone, Debug)]
pub struct Chunk<T> {
    cells: Vec<T>,
}

impl<T: Clone> Chunk<T> {
    /// Create a chunk with every slot set to `fill`.
    pub fn filled(fill: T) -> Self {
        Self {
            cells: vec![fill; CHUNK_SIZE * CHUNK_SIZE],
        }
    }
}

impl<T> Chunk<T> {
    pub fn get(&self, local_x: u8, local_y: u8) -> &T {
        &self.cells[local_index(local_x, local_y)]
    }

    pub fn get_mut(&mut self, local_x: u8, local_y: u8) -> &mut T {
        &mut self.cells[local_index(local_x, local_y)]
    }
}

fn local_index(local_x: u8, local_y: u8) -> usize {
    local_y as usize * CHUNK_SIZE + local_x as usize
}

/// Layout of a width x height grid as row-major chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkLayout {
    pub width: u32,
    pub height: u32,
    /// Number of chunk columns
    pub chunks_x: usize,
    /// Number of chunk rows
    pub chunks_y: usize,
}

impl ChunkLayout {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            chunks_x: (width as usize).div_ceil(CHUNK_SIZE),
            chunks_y: (height as usize).div_ceil(CHUNK_SIZE),
        }
    }

    /// Total number of chunks
    pub fn len(&self) -> usize {
        self.chunks_x * self.chunks_y
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Index of the chunk holding (x, y); the caller checks bounds first
    pub fn chunk_index(&self, x: u32, y: u32) -> usize {
        let coord = ChunkCoord::from_cell(x, y);
        coord.block_row * self.chunks_x + coord.block_col
    }
}

/// Convert canvas coordinates to local coordinates within a chunk.
///
/// # Examples
///
/// ```
/// use pixelboard_core::chunk::to_local_coords;
///
/// assert_eq!(to_local_coords(17, 33), (1, 1));
/// assert_eq!(to_local_coords(15, 0), (15, 0));
/// ```
pub fn to_local_coords(x: u32, y: u32) -> (u8, u8) {
    (
        (x as usize % CHUNK_SIZE) as u8,
        (y as usize % CHUNK_SIZE) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_coord_from_cell() {
        assert_eq!(
            ChunkCoord::from_cell(0, 0),
            ChunkCoord {
                block_row: 0,
                block_col: 0
            }
        );
        assert_eq!(
            ChunkCoord::from_cell(15, 15),
            ChunkCoord {
                block_row: 0,
                block_col: 0
            }
        );
        assert_eq!(
            ChunkCoord::from_cell(16, 31),
            ChunkCoord {
                block_row: 1,
                block_col: 1
            }
        );
    }

    #[test]
    fn test_layout_rounds_up_partial_chunks() {
        let layout = ChunkLayout::new(200, 200);
        assert_eq!(layout.chunks_x, 13);
        assert_eq!(layout.chunks_y, 13);
        assert_eq!(layout.len(), 169);

        let layout = ChunkLayout::new(3, 3);
        assert_eq!(layout.len(), 1);
        assert!(layout.contains(2, 2));
        assert!(!layout.contains(3, 0));
        assert!(!layout.contains(0, 3));
    }

    #[test]
    fn test_chunk_index_is_row_major() {
        let layout = ChunkLayout::new(40, 40);
        assert_eq!(layout.chunks_x, 3);
        assert_eq!(layout.chunk_index(0, 0), 0);
        assert_eq!(layout.chunk_index(39, 0), 2);
        assert_eq!(layout.chunk_index(0, 16), 3);
        assert_eq!(layout.chunk_index(39, 39), 8);
    }

    #[test]
    fn test_chunk_basic_operations() {
        let mut chunk = Chunk::filled(0u32);
        assert_eq!(*chunk.get(3, 4), 0);

        *chunk.get_mut(3, 4) = 7;
        assert_eq!(*chunk.get(3, 4), 7);
        assert_eq!(*chunk.get(4, 3), 0);
    }
}
