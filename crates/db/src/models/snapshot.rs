//! View snapshot rows (append-only).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vidpulse_core::baseline::ViewSnapshot;
use vidpulse_core::types::Timestamp;

/// A row from the `view_snapshots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ViewSnapshotRow {
    pub id: i64,
    pub video_id: String,
    pub observed_at: Timestamp,
    pub view_count: Option<i64>,
    pub days_since_published: i32,
}

impl From<ViewSnapshotRow> for ViewSnapshot {
    fn from(row: ViewSnapshotRow) -> Self {
        Self {
            video_id: row.video_id,
            observed_at: row.observed_at,
            view_count: row.view_count,
            days_since_published: row.days_since_published,
        }
    }
}

/// DTO for recording a new snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateViewSnapshot {
    pub video_id: String,
    pub observed_at: Timestamp,
    pub view_count: Option<i64>,
    pub days_since_published: i32,
}
