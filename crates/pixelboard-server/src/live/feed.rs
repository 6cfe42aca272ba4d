use chrono::{DateTime, Utc};
use pixelboard_core::{Color, PlacedPixel};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events buffered per subscriber before it starts skipping
const FEED_CAPACITY: usize = 256;

/// One confirmed placement, as pushed to live subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelEvent {
    pub x: u32,
    pub y: u32,
    pub color: Color,
    pub user_id: String,
    pub placed_at: DateTime<Utc>,
}

impl PixelEvent {
    /// Build the event for a confirmed placement
    pub fn from_placed(placed: &PlacedPixel) -> Option<Self> {
        Some(Self {
            x: placed.x,
            y: placed.y,
            color: placed.cell.color,
            user_id: placed.cell.last_editor_id.clone()?,
            placed_at: placed.cell.last_edited_at?,
        })
    }
}

/// Fan-out of confirmed placements to connected clients
pub struct PixelFeed {
    updates: broadcast::Sender<PixelEvent>,
}

impl PixelFeed {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(FEED_CAPACITY);
        Self { updates }
    }

    /// Subscribe to placements
    pub fn subscribe(&self) -> broadcast::Receiver<PixelEvent> {
        self.updates.subscribe()
    }

    /// Send a placement to all subscribers
    pub fn publish(&self, event: PixelEvent) {
        // Ignore errors if no receivers
        let _ = self.updates.send(event);
    }

    /// Number of connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }
}

impl Default for PixelFeed {
    fn default() -> Self {
        Self::new()
    }
}
