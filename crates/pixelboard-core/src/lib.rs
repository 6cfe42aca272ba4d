pub mod canvas;
pub mod cell;
pub mod chunk;
pub mod cooldown;
pub mod error;
pub mod palette;
pub mod placement;
pub mod stats;

pub use canvas::{CanvasSnapshot, CanvasStore, DEFAULT_LOCK_TIMEOUT};
pub use cell::Cell;
pub use chunk::{Chunk, ChunkCoord, ChunkLayout};
pub use cooldown::{CooldownEntry, CooldownLedger, CooldownReservation, CooldownStatus};
pub use error::{CanvasError, CheckpointError, PaletteError, PlacementError, RejectReason};
pub use palette::{Color, Palette, DEFAULT_COLORS};
pub use placement::{
    BoardCheckpoint, BoardConfig, BoardOverview, PixelBoard, PlacedPixel, PlacementRequest,
    PlacementStage,
};
pub use stats::{CanvasStats, StatsAggregator};
