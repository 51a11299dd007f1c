//! PostgreSQL implementations of the engine's store traits.

use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use vidpulse_core::baseline::ViewSnapshot;
use vidpulse_core::cache::CachedValue;
use vidpulse_core::classification::PerformanceClassification;
use vidpulse_core::envelope::GlobalEnvelopePoint;
use vidpulse_core::stores::{
    EnvelopeStore, SnapshotStore, StoreError, Stores, VideoRecord, VideoStore,
};
use vidpulse_core::types::{Timestamp, VideoId};

use crate::repositories::{ClassificationRepo, EnvelopeRepo, SnapshotRepo, VideoRepo};
use crate::DbPool;

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Every store backed by one connection pool.
#[derive(Clone)]
pub struct PgStores {
    pool: DbPool,
}

impl PgStores {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Bundle this pool behind all three engine store handles.
    pub fn into_stores(self) -> Stores {
        let shared = Arc::new(self);
        Stores {
            videos: shared.clone(),
            snapshots: shared.clone(),
            envelope: shared,
        }
    }
}

#[async_trait]
impl VideoStore for PgStores {
    async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>, StoreError> {
        let row = VideoRepo::find_by_id(&self.pool, video_id)
            .await
            .map_err(unavailable)?;
        Ok(row.map(VideoRecord::from))
    }

    async fn get_channel_videos(&self, channel_id: &str) -> Result<Vec<VideoRecord>, StoreError> {
        let rows = VideoRepo::list_by_channel(&self.pool, channel_id)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(VideoRecord::from).collect())
    }

    async fn get_cached_classification(
        &self,
        video_id: &str,
    ) -> Result<Option<CachedValue<PerformanceClassification>>, StoreError> {
        let Some(row) = ClassificationRepo::find_by_video_id(&self.pool, video_id)
            .await
            .map_err(unavailable)?
        else {
            return Ok(None);
        };
        row.decode()
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("classification for {video_id}: {e}")))
    }

    async fn save_classification(
        &self,
        classification: &PerformanceClassification,
    ) -> Result<(), StoreError> {
        let stored = ClassificationRepo::upsert(&self.pool, classification)
            .await
            .map_err(unavailable)?;
        if !stored {
            tracing::debug!(
                video_id = %classification.video_id,
                "Classification not cached; video row missing"
            );
        }
        Ok(())
    }

    async fn invalidate_classification(&self, video_id: &str) -> Result<bool, StoreError> {
        ClassificationRepo::clear(&self.pool, video_id)
            .await
            .map_err(unavailable)
    }

    async fn list_videos_needing_classification(
        &self,
        computed_before: Timestamp,
        limit: i64,
    ) -> Result<Vec<VideoId>, StoreError> {
        VideoRepo::list_needing_classification(&self.pool, computed_before, limit)
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl SnapshotStore for PgStores {
    async fn get_first_week_snapshots(
        &self,
        channel_id: &str,
    ) -> Result<Vec<ViewSnapshot>, StoreError> {
        let rows = SnapshotRepo::list_first_week_by_channel(&self.pool, channel_id)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(ViewSnapshot::from).collect())
    }

    async fn get_global_first_week_views(&self, limit: i64) -> Result<Vec<i64>, StoreError> {
        SnapshotRepo::sample_first_week_views(&self.pool, limit)
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl EnvelopeStore for PgStores {
    async fn get_envelope(
        &self,
        days: RangeInclusive<i32>,
    ) -> Result<Vec<GlobalEnvelopePoint>, StoreError> {
        let rows = EnvelopeRepo::list_range(&self.pool, *days.start(), *days.end())
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(GlobalEnvelopePoint::from).collect())
    }
}
