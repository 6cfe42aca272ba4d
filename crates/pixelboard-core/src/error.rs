use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::cooldown::CooldownStatus;
use crate::palette::Color;

/// Malformed color or palette input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaletteError {
    #[error("malformed color {0:?}, expected #RRGGBB")]
    MalformedColor(String),

    #[error("palette has no colors")]
    Empty,
}

/// Failures of the canvas store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    #[error("coordinate ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("color {0} is not in the palette")]
    InvalidColor(Color),

    #[error("timed out waiting for the lock on ({x}, {y})")]
    LockTimeout { x: u32, y: u32 },
}

/// Why a placement was turned down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    CooldownActive,
    InvalidRequest,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::CooldownActive => write!(f, "CooldownActive"),
            RejectReason::InvalidRequest => write!(f, "InvalidRequest"),
        }
    }
}

/// Outcome of a placement or cooldown query that did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Rate limited; carries the wait still required
    #[error("cooldown active, {} second(s) remaining", .0.remaining_seconds)]
    CooldownActive(CooldownStatus),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request could not complete and applied nothing
    #[error("placement aborted: {0}")]
    Aborted(String),
}

impl PlacementError {
    /// Structured rejection reason, `None` for aborted requests
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            PlacementError::CooldownActive(_) => Some(RejectReason::CooldownActive),
            PlacementError::InvalidRequest(_) => Some(RejectReason::InvalidRequest),
            PlacementError::Aborted(_) => None,
        }
    }
}

impl From<CanvasError> for PlacementError {
    fn from(err: CanvasError) -> Self {
        match err {
            CanvasError::OutOfBounds { .. } | CanvasError::InvalidColor(_) => {
                PlacementError::InvalidRequest(err.to_string())
            }
            CanvasError::LockTimeout { .. } => PlacementError::Aborted(err.to_string()),
        }
    }
}

/// A checkpoint that cannot be restored
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("checkpoint is {found_width}x{found_height}, expected {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("checkpoint cell ({x}, {y}) uses color {color} outside the palette")]
    ColorOutsidePalette { x: u32, y: u32, color: Color },

    #[error(
        "checkpoint stats are inconsistent: total {total}, colors {color_sum}, users {user_sum}"
    )]
    InconsistentStats {
        total: u64,
        color_sum: u64,
        user_sum: u64,
    },
}
