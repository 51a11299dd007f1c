//! Cached classification columns on `videos`.

use serde::Serialize;
use sqlx::FromRow;
use vidpulse_core::cache::CachedValue;
use vidpulse_core::classification::PerformanceClassification;
use vidpulse_core::types::Timestamp;

/// The classification cache of one video. Only rows with a stored payload
/// are returned by the repository.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CachedClassificationRow {
    pub video_id: String,
    pub classification: serde_json::Value,
    pub classified_at: Timestamp,
}

impl CachedClassificationRow {
    /// Decode the JSON payload back into an engine classification.
    pub fn decode(self) -> Result<CachedValue<PerformanceClassification>, serde_json::Error> {
        let value = serde_json::from_value(self.classification)?;
        Ok(CachedValue::new(value, self.classified_at))
    }
}
