//! Data-access seams for the engine.
//!
//! The engine never talks to a database directly. It is handed one
//! [`Stores`] bundle at process start, and every computation reads through
//! these traits. Implementations live in the persistence crate; tests use
//! in-memory doubles.

use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::baseline::ViewSnapshot;
use crate::cache::CachedValue;
use crate::classification::PerformanceClassification;
use crate::envelope::GlobalEnvelopePoint;
use crate::types::{ChannelId, Timestamp, VideoId};

/// Failure reported by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

/// The video fields the engine needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: VideoId,
    pub channel_id: ChannelId,
    pub published_at: Timestamp,
    pub view_count: i64,
    /// Channel baseline relative to the global day-1 median, captured when
    /// the video was published.
    pub channel_baseline_at_publish: Option<f64>,
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>, StoreError>;

    async fn get_channel_videos(&self, channel_id: &str) -> Result<Vec<VideoRecord>, StoreError>;

    async fn get_cached_classification(
        &self,
        video_id: &str,
    ) -> Result<Option<CachedValue<PerformanceClassification>>, StoreError>;

    async fn save_classification(
        &self,
        classification: &PerformanceClassification,
    ) -> Result<(), StoreError>;

    /// Drop the cached classification. Returns `true` if one existed.
    async fn invalidate_classification(&self, video_id: &str) -> Result<bool, StoreError>;

    /// Ids of published videos never classified or classified before
    /// `computed_before`. Videos whose `published_at` lies in the future are
    /// excluded.
    async fn list_videos_needing_classification(
        &self,
        computed_before: Timestamp,
        limit: i64,
    ) -> Result<Vec<VideoId>, StoreError>;
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// First-week (`days_since_published <= 7`) snapshots for a channel.
    async fn get_first_week_snapshots(
        &self,
        channel_id: &str,
    ) -> Result<Vec<ViewSnapshot>, StoreError>;

    /// Cross-channel sample of first-week view counts.
    async fn get_global_first_week_views(&self, limit: i64) -> Result<Vec<i64>, StoreError>;
}

#[async_trait]
pub trait EnvelopeStore: Send + Sync {
    async fn get_envelope(
        &self,
        days: RangeInclusive<i32>,
    ) -> Result<Vec<GlobalEnvelopePoint>, StoreError>;
}

/// Store handles shared by every engine call.
#[derive(Clone)]
pub struct Stores {
    pub videos: Arc<dyn VideoStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub envelope: Arc<dyn EnvelopeStore>,
}
