//! Global envelope rows.

use serde::Serialize;
use sqlx::FromRow;
use vidpulse_core::envelope::GlobalEnvelopePoint;
use vidpulse_core::types::Timestamp;

/// A row from the `global_envelope` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GlobalEnvelopeRow {
    pub day_since_published: i32,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub updated_at: Timestamp,
}

impl From<GlobalEnvelopeRow> for GlobalEnvelopePoint {
    fn from(row: GlobalEnvelopeRow) -> Self {
        Self {
            day_since_published: row.day_since_published,
            p10: row.p10,
            p25: row.p25,
            p50: row.p50,
            p75: row.p75,
            p90: row.p90,
        }
    }
}
