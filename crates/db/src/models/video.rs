//! Video rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vidpulse_core::stores::VideoRecord;
use vidpulse_core::types::Timestamp;

/// A row from the `videos` table, without the cached classification payload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Video {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub published_at: Timestamp,
    pub view_count: i64,
    pub channel_baseline_at_publish: Option<f64>,
    pub performance_ratio: Option<f64>,
    pub performance_tier: Option<String>,
    pub expected_views: Option<f64>,
    pub classified_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Video> for VideoRecord {
    fn from(row: Video) -> Self {
        Self {
            id: row.id,
            channel_id: row.channel_id,
            published_at: row.published_at,
            view_count: row.view_count,
            channel_baseline_at_publish: row.channel_baseline_at_publish,
        }
    }
}

/// DTO for inserting or refreshing a video.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertVideo {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub published_at: Timestamp,
    pub view_count: i64,
    pub channel_baseline_at_publish: Option<f64>,
}
