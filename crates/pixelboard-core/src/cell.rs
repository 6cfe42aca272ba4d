use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::palette::Color;

/// One addressable canvas position: its color and who painted it last
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub color: Color,
    #[serde(default)]
    pub last_editor_id: Option<String>,
    #[serde(default)]
    pub last_edited_at: Option<DateTime<Utc>>,
}

impl Default for Cell {
    fn default() -> Self {
        Cell::blank(Color::default())
    }
}

impl Cell {
    /// A cell nobody has painted yet
    pub fn blank(color: Color) -> Self {
        Cell {
            color,
            last_editor_id: None,
            last_edited_at: None,
        }
    }

    /// A cell painted by `user_id` at `at`
    pub fn painted(color: Color, user_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Cell {
            color,
            last_editor_id: Some(user_id.into()),
            last_edited_at: Some(at),
        }
    }

    /// Check if any user has painted this cell
    pub fn is_painted(&self) -> bool {
        self.last_editor_id.is_some()
    }
}
