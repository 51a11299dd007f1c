//! Repository for the `videos` table.

use sqlx::PgPool;
use vidpulse_core::types::Timestamp;

use crate::models::video::{UpsertVideo, Video};

/// Column list for `videos` SELECT queries.
const COLUMNS: &str = "\
    id, channel_id, title, published_at, view_count, channel_baseline_at_publish, \
    performance_ratio, performance_tier, expected_views, classified_at, \
    created_at, updated_at";

/// Provides query operations for videos.
pub struct VideoRepo;

impl VideoRepo {
    /// Insert a video, or refresh its title and view count if it exists.
    ///
    /// `channel_baseline_at_publish` is only written on first insert.
    pub async fn upsert(pool: &PgPool, input: &UpsertVideo) -> Result<Video, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos
                (id, channel_id, title, published_at, view_count, channel_baseline_at_publish)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                view_count = EXCLUDED.view_count,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(&input.id)
            .bind(&input.channel_id)
            .bind(&input.title)
            .bind(input.published_at)
            .bind(input.view_count)
            .bind(input.channel_baseline_at_publish)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All videos of a channel, newest first.
    pub async fn list_by_channel(
        pool: &PgPool,
        channel_id: &str,
    ) -> Result<Vec<Video>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM videos WHERE channel_id = $1 ORDER BY published_at DESC"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(channel_id)
            .fetch_all(pool)
            .await
    }

    /// Ids of already-published videos never classified or last classified
    /// before `before`, oldest classification first.
    ///
    /// Videos scheduled in the future are skipped until they go live.
    pub async fn list_needing_classification(
        pool: &PgPool,
        before: Timestamp,
        limit: i64,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT id FROM videos
             WHERE published_at <= NOW()
               AND (classified_at IS NULL OR classified_at < $1)
             ORDER BY classified_at ASC NULLS FIRST, id
             LIMIT $2",
        )
        .bind(before)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
