//! Placement coordination.
//!
//! [`PixelBoard`] owns the canvas, the cooldown ledger and the stats, and is the
//! only path through which a cell changes. A placement moves through
//! `Requested → CooldownChecked → Applied → StatsUpdated → Confirmed`, or stops
//! at `Rejected`. Locks are always taken in the order ledger entry → canvas
//! region → stats.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::canvas::{CanvasSnapshot, CanvasStore, DEFAULT_LOCK_TIMEOUT};
use crate::cell::Cell;
use crate::cooldown::{CooldownEntry, CooldownLedger, CooldownStatus};
use crate::error::{CheckpointError, PlacementError};
use crate::palette::{Color, Palette};
use crate::stats::{CanvasStats, StatsAggregator};

/// Fixed parameters of a board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub width: u32,
    pub height: u32,
    pub cooldown: Duration,
    pub palette: Palette,
    pub default_color: Color,
    pub lock_timeout: std::time::Duration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            cooldown: Duration::seconds(30),
            palette: Palette::default(),
            default_color: Color::WHITE,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Stages a placement passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStage {
    Requested,
    CooldownChecked,
    Applied,
    StatsUpdated,
    Confirmed,
    Rejected,
}

/// A request to paint one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    pub user_id: String,
    pub x: u32,
    pub y: u32,
    pub color: Color,
}

/// A confirmed placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPixel {
    pub x: u32,
    pub y: u32,
    pub cell: Cell,
}

/// Canvas, rendered grid and stats read together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardOverview {
    pub canvas: CanvasSnapshot,
    pub grid: Vec<Vec<Color>>,
    pub stats: CanvasStats,
}

/// Everything needed to bring a board back after a restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCheckpoint {
    pub canvas: CanvasSnapshot,
    pub cooldowns: Vec<CooldownEntry>,
    pub stats: CanvasStats,
}

/// The shared board: canvas, cooldown ledger and stats
pub struct PixelBoard {
    config: BoardConfig,
    canvas: CanvasStore,
    ledger: CooldownLedger,
    stats: StatsAggregator,
}

impl PixelBoard {
    /// Create a blank board
    pub fn new(config: BoardConfig, created_at: DateTime<Utc>) -> Self {
        let canvas = CanvasStore::new(
            config.width,
            config.height,
            config.default_color,
            config.palette.clone(),
            created_at,
        )
        .with_lock_timeout(config.lock_timeout);

        Self {
            config,
            canvas,
            ledger: CooldownLedger::new(),
            stats: StatsAggregator::new(),
        }
    }

    /// Bring back a board from a checkpoint.
    ///
    /// The checkpoint's dimensions must match `config`.
    pub fn restore(
        config: BoardConfig,
        checkpoint: BoardCheckpoint,
    ) -> Result<Self, CheckpointError> {
        if checkpoint.canvas.width != config.width || checkpoint.canvas.height != config.height {
            return Err(CheckpointError::DimensionMismatch {
                width: config.width,
                height: config.height,
                found_width: checkpoint.canvas.width,
                found_height: checkpoint.canvas.height,
            });
        }

        let stats = StatsAggregator::from_stats(checkpoint.stats)?;
        let canvas = CanvasStore::restore(checkpoint.canvas, config.palette.clone())?
            .with_lock_timeout(config.lock_timeout);

        tracing::info!(
            width = config.width,
            height = config.height,
            users = checkpoint.cooldowns.len(),
            "restored board from checkpoint"
        );

        Ok(Self {
            config,
            canvas,
            ledger: CooldownLedger::from_entries(checkpoint.cooldowns),
            stats,
        })
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn canvas(&self) -> &CanvasStore {
        &self.canvas
    }

    pub fn ledger(&self) -> &CooldownLedger {
        &self.ledger
    }

    /// Submit a placement.
    ///
    /// Returns the new cell, or a rejection. A rejected or aborted placement
    /// leaves the canvas, ledger and stats exactly as they were.
    pub fn place(
        &self,
        request: &PlacementRequest,
        now: DateTime<Utc>,
    ) -> Result<PlacedPixel, PlacementError> {
        self.place_with(request, now, |_| {})
    }

    /// Submit a placement and run `on_applied` while the cell's region is
    /// still locked.
    ///
    /// Two placements on the same cell reach `on_applied` in the order they
    /// were written, so a listener fed from here ends on the same color as
    /// the canvas.
    pub fn place_with(
        &self,
        request: &PlacementRequest,
        now: DateTime<Utc>,
        on_applied: impl FnOnce(&PlacedPixel),
    ) -> Result<PlacedPixel, PlacementError> {
        let PlacementRequest {
            user_id,
            x,
            y,
            color,
        } = request;
        let (x, y, color) = (*x, *y, *color);
        tracing::trace!(user_id, x, y, stage = ?PlacementStage::Requested);

        if user_id.is_empty() {
            return Err(reject(PlacementError::InvalidRequest(
                "user id is required".to_string(),
            )));
        }

        // Settle bounds and palette before holding the user's ledger entry
        if let Err(err) = self.canvas.check_placement(x, y, color) {
            let status = self.ledger.status(user_id, now, self.config.cooldown);
            if !status.can_place {
                return Err(reject(PlacementError::CooldownActive(status)));
            }
            return Err(reject(err.into()));
        }

        let reservation = self
            .ledger
            .reserve(user_id, now, self.config.cooldown)
            .map_err(|status| reject(PlacementError::CooldownActive(status)))?;
        tracing::trace!(user_id, stage = ?PlacementStage::CooldownChecked);

        let applied = self.canvas.set_cell_with(x, y, color, user_id, now, |cell| {
            on_applied(&PlacedPixel {
                x,
                y,
                cell: cell.clone(),
            })
        });
        let cell = match applied {
            Ok(cell) => cell,
            Err(err) => {
                let err = PlacementError::from(err);
                if err.reason().is_none() {
                    tracing::warn!(user_id, x, y, error = %err, "placement aborted");
                }
                return Err(reject(err));
            }
        };
        tracing::trace!(user_id, x, y, stage = ?PlacementStage::Applied);

        reservation.commit(now);
        self.stats.record(color, user_id, now);
        tracing::trace!(user_id, stage = ?PlacementStage::StatsUpdated);

        tracing::debug!(user_id, x, y, %color, stage = ?PlacementStage::Confirmed, "pixel placed");
        Ok(PlacedPixel { x, y, cell })
    }

    /// Cooldown status of one user
    pub fn cooldown_status(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CooldownStatus, PlacementError> {
        if user_id.is_empty() {
            return Err(PlacementError::InvalidRequest(
                "user id is required".to_string(),
            ));
        }
        Ok(self.ledger.status(user_id, now, self.config.cooldown))
    }

    pub fn stats(&self) -> CanvasStats {
        self.stats.snapshot()
    }

    /// Canvas, grid and stats in one read
    pub fn overview(&self) -> BoardOverview {
        let canvas = self.canvas.get();
        let grid = canvas
            .cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.color).collect())
            .collect();
        BoardOverview {
            canvas,
            grid,
            stats: self.stats.snapshot(),
        }
    }

    /// Capture the board for an external store
    pub fn checkpoint(&self) -> BoardCheckpoint {
        BoardCheckpoint {
            canvas: self.canvas.get(),
            cooldowns: self.ledger.entries(),
            stats: self.stats.snapshot(),
        }
    }
}

fn reject(err: PlacementError) -> PlacementError {
    tracing::debug!(reason = ?err.reason(), error = %err, stage = ?PlacementStage::Rejected);
    err
}
