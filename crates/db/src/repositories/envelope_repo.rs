//! Repository for the `global_envelope` table.

use sqlx::PgPool;
use vidpulse_core::envelope::GlobalEnvelopePoint;

use crate::models::envelope::GlobalEnvelopeRow;

/// Column list for `global_envelope` SELECT queries.
const COLUMNS: &str = "day_since_published, p10, p25, p50, p75, p90, updated_at";

/// Provides query operations for the global envelope.
pub struct EnvelopeRepo;

impl EnvelopeRepo {
    /// Insert or replace the percentiles for one day.
    pub async fn upsert(
        pool: &PgPool,
        point: &GlobalEnvelopePoint,
    ) -> Result<GlobalEnvelopeRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO global_envelope (day_since_published, p10, p25, p50, p75, p90)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (day_since_published) DO UPDATE SET
                p10 = EXCLUDED.p10,
                p25 = EXCLUDED.p25,
                p50 = EXCLUDED.p50,
                p75 = EXCLUDED.p75,
                p90 = EXCLUDED.p90,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GlobalEnvelopeRow>(&query)
            .bind(point.day_since_published)
            .bind(point.p10)
            .bind(point.p25)
            .bind(point.p50)
            .bind(point.p75)
            .bind(point.p90)
            .fetch_one(pool)
            .await
    }

    /// Rows with `from <= day_since_published <= to`, ordered by day.
    pub async fn list_range(
        pool: &PgPool,
        from: i32,
        to: i32,
    ) -> Result<Vec<GlobalEnvelopeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM global_envelope \
             WHERE day_since_published BETWEEN $1 AND $2 \
             ORDER BY day_since_published"
        );
        sqlx::query_as::<_, GlobalEnvelopeRow>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }
}
