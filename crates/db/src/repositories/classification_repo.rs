//! Repository for the classification cache columns on `videos`.

use sqlx::PgPool;
use vidpulse_core::classification::PerformanceClassification;

use crate::models::classification::CachedClassificationRow;

/// Provides read/write access to the cached classification of a video.
pub struct ClassificationRepo;

impl ClassificationRepo {
    /// Store a classification on its video. Returns `false` if the video
    /// does not exist.
    ///
    /// The flat columns mirror the payload for dashboard queries; the JSON
    /// payload is what gets decoded on read.
    pub async fn upsert(
        pool: &PgPool,
        classification: &PerformanceClassification,
    ) -> Result<bool, sqlx::Error> {
        let payload = serde_json::to_value(classification)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let result = sqlx::query(
            "UPDATE videos SET
                performance_ratio = $2,
                performance_tier = $3,
                expected_views = $4,
                classification = $5,
                classified_at = $6
             WHERE id = $1",
        )
        .bind(&classification.video_id)
        .bind(classification.ratio)
        .bind(classification.tier.map(|t| t.as_str()))
        .bind(classification.expected_views)
        .bind(payload)
        .bind(classification.computed_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The cached classification of a video, if one was stored.
    pub async fn find_by_video_id(
        pool: &PgPool,
        video_id: &str,
    ) -> Result<Option<CachedClassificationRow>, sqlx::Error> {
        sqlx::query_as::<_, CachedClassificationRow>(
            "SELECT id AS video_id, classification, classified_at FROM videos
             WHERE id = $1 AND classification IS NOT NULL AND classified_at IS NOT NULL",
        )
        .bind(video_id)
        .fetch_optional(pool)
        .await
    }

    /// Clear the cached classification. Returns `true` if one was cleared.
    pub async fn clear(pool: &PgPool, video_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE videos SET
                performance_ratio = NULL,
                performance_tier = NULL,
                expected_views = NULL,
                classification = NULL,
                classified_at = NULL
             WHERE id = $1 AND classified_at IS NOT NULL",
        )
        .bind(video_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
