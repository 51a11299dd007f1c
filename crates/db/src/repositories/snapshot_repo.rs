//! Repository for the `view_snapshots` table (append-only).

use sqlx::PgPool;
use vidpulse_core::baseline::{
    FIRST_WEEK_MAX_DAY, GLOBAL_SAMPLE_MAX_VIEWS, GLOBAL_SAMPLE_MIN_VIEWS,
};

use crate::models::snapshot::{CreateViewSnapshot, ViewSnapshotRow};

/// Column list for `view_snapshots` SELECT queries.
const COLUMNS: &str = "id, video_id, observed_at, view_count, days_since_published";

/// Provides query operations for view snapshots.
pub struct SnapshotRepo;

impl SnapshotRepo {
    /// Record a single snapshot.
    pub async fn insert(
        pool: &PgPool,
        input: &CreateViewSnapshot,
    ) -> Result<ViewSnapshotRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO view_snapshots (video_id, observed_at, view_count, days_since_published) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ViewSnapshotRow>(&query)
            .bind(&input.video_id)
            .bind(input.observed_at)
            .bind(input.view_count)
            .bind(input.days_since_published)
            .fetch_one(pool)
            .await
    }

    /// First-week snapshots for every video of a channel.
    pub async fn list_first_week_by_channel(
        pool: &PgPool,
        channel_id: &str,
    ) -> Result<Vec<ViewSnapshotRow>, sqlx::Error> {
        sqlx::query_as::<_, ViewSnapshotRow>(
            "SELECT s.id, s.video_id, s.observed_at, s.view_count, s.days_since_published
             FROM view_snapshots s
             JOIN videos v ON v.id = s.video_id
             WHERE v.channel_id = $1 AND s.days_since_published <= $2
             ORDER BY s.observed_at",
        )
        .bind(channel_id)
        .bind(FIRST_WEEK_MAX_DAY)
        .fetch_all(pool)
        .await
    }

    /// Cross-channel first-week sample: the latest first-week view count of
    /// each video, restricted to the global sample window, most recently
    /// observed first.
    ///
    /// One value per video, so daily snapshotting does not over-weight a
    /// video in the sample.
    pub async fn sample_first_week_views(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT view_count FROM (
                 SELECT DISTINCT ON (video_id) video_id, view_count, observed_at
                 FROM view_snapshots
                 WHERE days_since_published <= $1 AND view_count IS NOT NULL
                 ORDER BY video_id, observed_at DESC
             ) latest
             WHERE view_count BETWEEN $2 AND $3
             ORDER BY observed_at DESC
             LIMIT $4",
        )
        .bind(FIRST_WEEK_MAX_DAY)
        .bind(GLOBAL_SAMPLE_MIN_VIEWS)
        .bind(GLOBAL_SAMPLE_MAX_VIEWS)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
