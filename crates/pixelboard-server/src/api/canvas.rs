use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use pixelboard_core::{Cell, Color, CooldownStatus, PlacementRequest};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::live::PixelEvent;
use crate::AppState;

/// Canvas part of the board response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasView {
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
    pub painted_cells: usize,
    pub cells: Vec<Vec<Cell>>,
    pub grid: Vec<Vec<Color>>,
}

/// Stats part of the board response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    #[serde(flatten)]
    pub stats: pixelboard_core::CanvasStats,
    pub unique_users: usize,
    pub canvas_size: String,
}

/// Response for the full board
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub success: bool,
    pub canvas: CanvasView,
    pub stats: StatsView,
}

/// Query for a user's cooldown
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownQuery {
    pub user_id: Option<String>,
}

/// Response for a cooldown query
#[derive(Debug, Serialize)]
pub struct CooldownResponse {
    pub success: bool,
    #[serde(flatten)]
    pub status: CooldownStatus,
}

/// Request to place a pixel
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRequest {
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub user_id: String,
}

/// Response for an accepted placement
#[derive(Debug, Serialize)]
pub struct PlaceResponse {
    pub success: bool,
    pub x: u32,
    pub y: u32,
    pub cell: Cell,
}

/// Get the canvas, its grid and stats
async fn get_board(State(state): State<AppState>) -> Json<BoardResponse> {
    let overview = state.board.overview();
    let canvas_size = format!("{}x{}", overview.canvas.width, overview.canvas.height);

    Json(BoardResponse {
        success: true,
        canvas: CanvasView {
            width: overview.canvas.width,
            height: overview.canvas.height,
            created_at: overview.canvas.created_at,
            painted_cells: overview.canvas.painted_cells(),
            cells: overview.canvas.cells,
            grid: overview.grid,
        },
        stats: StatsView {
            unique_users: overview.stats.unique_users(),
            stats: overview.stats,
            canvas_size,
        },
    })
}

/// Get a user's cooldown status
async fn get_cooldown(
    State(state): State<AppState>,
    Query(query): Query<CooldownQuery>,
) -> Result<Json<CooldownResponse>, AppError> {
    let user_id = query.user_id.unwrap_or_default();
    let status = state.board.cooldown_status(user_id.trim(), Utc::now())?;
    Ok(Json(CooldownResponse {
        success: true,
        status,
    }))
}

/// Place a pixel
async fn place_pixel(
    State(state): State<AppState>,
    body: Result<Json<PlaceRequest>, JsonRejection>,
) -> Result<Json<PlaceResponse>, AppError> {
    let Json(req) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let color = Color::from_hex(&req.color).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let request = PlacementRequest {
        user_id: req.user_id.trim().to_string(),
        x: req.x,
        y: req.y,
        color,
    };

    // Waiting on a region lock blocks the thread. The event goes out while the
    // cell is still locked so the feed sees writes in canvas order.
    let (board, feed) = (state.board.clone(), state.feed.clone());
    let placed = tokio::task::spawn_blocking(move || {
        board.place_with(&request, Utc::now(), |placed| {
            if let Some(event) = PixelEvent::from_placed(placed) {
                feed.publish(event);
            }
        })
    })
    .await
    .map_err(|e| AppError::Internal(format!("placement task failed: {e}")))??;

    Ok(Json(PlaceResponse {
        success: true,
        x: placed.x,
        y: placed.y,
        cell: placed.cell,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/pixel-canvas", get(get_board))
        .route("/api/pixel-canvas/cooldown", get(get_cooldown))
        .route("/api/pixel-canvas/place", post(place_pixel))
}
