//! Engine tests over in-memory stores.
//!
//! Exercises the async orchestration layer end to end:
//! - baseline blending against the cross-channel sample
//! - backfill fall-through and envelope scaling selection
//! - single and batch classification, including per-item errors
//! - cache reuse and write-back

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use vidpulse_core::baseline::{BaselineMethod, ViewSnapshot};
use vidpulse_core::cache::CachedValue;
use vidpulse_core::channel_envelope::{EnvelopeScaling, ScalingOrigin, ScalingStrategy};
use vidpulse_core::classification::{PerformanceClassification, PerformanceTier};
use vidpulse_core::engine::{EngineConfig, PerformanceEngine};
use vidpulse_core::envelope::GlobalEnvelopePoint;
use vidpulse_core::error::CoreError;
use vidpulse_core::stores::{
    EnvelopeStore, SnapshotStore, StoreError, Stores, VideoRecord, VideoStore,
};
use vidpulse_core::types::{Timestamp, VideoId};

// ---------------------------------------------------------------------------
// In-memory stores
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryVideos {
    videos: Vec<VideoRecord>,
    cache: Mutex<HashMap<VideoId, CachedValue<PerformanceClassification>>>,
}

#[async_trait]
impl VideoStore for MemoryVideos {
    async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>, StoreError> {
        Ok(self.videos.iter().find(|v| v.id == video_id).cloned())
    }

    async fn get_channel_videos(&self, channel_id: &str) -> Result<Vec<VideoRecord>, StoreError> {
        Ok(self
            .videos
            .iter()
            .filter(|v| v.channel_id == channel_id)
            .cloned()
            .collect())
    }

    async fn get_cached_classification(
        &self,
        video_id: &str,
    ) -> Result<Option<CachedValue<PerformanceClassification>>, StoreError> {
        Ok(self.cache.lock().unwrap().get(video_id).cloned())
    }

    async fn save_classification(
        &self,
        classification: &PerformanceClassification,
    ) -> Result<(), StoreError> {
        self.cache.lock().unwrap().insert(
            classification.video_id.clone(),
            CachedValue::new(classification.clone(), classification.computed_at),
        );
        Ok(())
    }

    async fn invalidate_classification(&self, video_id: &str) -> Result<bool, StoreError> {
        Ok(self.cache.lock().unwrap().remove(video_id).is_some())
    }

    async fn list_videos_needing_classification(
        &self,
        computed_before: Timestamp,
        limit: i64,
    ) -> Result<Vec<VideoId>, StoreError> {
        let now = Utc::now();
        let cache = self.cache.lock().unwrap();
        Ok(self
            .videos
            .iter()
            .filter(|v| v.published_at <= now)
            .filter(|v| {
                cache
                    .get(&v.id)
                    .map_or(true, |c| c.computed_at < computed_before)
            })
            .take(limit as usize)
            .map(|v| v.id.clone())
            .collect())
    }
}

#[derive(Default)]
struct MemorySnapshots {
    by_channel: HashMap<String, Vec<ViewSnapshot>>,
    global: Vec<i64>,
    unavailable: bool,
}

#[async_trait]
impl SnapshotStore for MemorySnapshots {
    async fn get_first_week_snapshots(
        &self,
        channel_id: &str,
    ) -> Result<Vec<ViewSnapshot>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("snapshot store offline".into()));
        }
        Ok(self.by_channel.get(channel_id).cloned().unwrap_or_default())
    }

    async fn get_global_first_week_views(&self, limit: i64) -> Result<Vec<i64>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("snapshot store offline".into()));
        }
        Ok(self.global.iter().copied().take(limit as usize).collect())
    }
}

struct MemoryEnvelope(Vec<GlobalEnvelopePoint>);

#[async_trait]
impl EnvelopeStore for MemoryEnvelope {
    async fn get_envelope(
        &self,
        days: RangeInclusive<i32>,
    ) -> Result<Vec<GlobalEnvelopePoint>, StoreError> {
        Ok(self
            .0
            .iter()
            .filter(|p| days.contains(&p.day_since_published))
            .copied()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn point(day: i32, p50: f64) -> GlobalEnvelopePoint {
    GlobalEnvelopePoint {
        day_since_published: day,
        p10: p50 * 0.25,
        p25: p50 * 0.5,
        p50,
        p75: p50 * 2.0,
        p90: p50 * 4.0,
    }
}

/// Two-point envelope: day 1 median 8478, day 30 median 25000.
fn sparse_envelope() -> Vec<GlobalEnvelopePoint> {
    vec![point(1, 8_478.0), point(30, 25_000.0)]
}

fn dense_envelope() -> Vec<GlobalEnvelopePoint> {
    (0..=730)
        .map(|d| point(d, 1_000.0 * (d as f64 + 1.0).sqrt()))
        .collect()
}

fn published(age_days: i64) -> Timestamp {
    Utc::now() - Duration::days(age_days) - Duration::hours(1)
}

fn video(id: &str, channel: &str, views: i64, age_days: i64) -> VideoRecord {
    VideoRecord {
        id: id.to_string(),
        channel_id: channel.to_string(),
        published_at: published(age_days),
        view_count: views,
        channel_baseline_at_publish: None,
    }
}

fn first_week(channel: &str, views: &[i64]) -> Vec<ViewSnapshot> {
    views
        .iter()
        .enumerate()
        .map(|(i, v)| ViewSnapshot {
            video_id: format!("{channel}-{i}"),
            observed_at: Utc::now(),
            view_count: Some(*v),
            days_since_published: 1,
        })
        .collect()
}

struct Fixture {
    videos: Arc<MemoryVideos>,
    engine: PerformanceEngine,
}

fn fixture(
    videos: Vec<VideoRecord>,
    snapshots: MemorySnapshots,
    envelope: Vec<GlobalEnvelopePoint>,
    config: EngineConfig,
) -> Fixture {
    let videos = Arc::new(MemoryVideos {
        videos,
        ..Default::default()
    });
    let stores = Stores {
        videos: videos.clone(),
        snapshots: Arc::new(snapshots),
        envelope: Arc::new(MemoryEnvelope(envelope)),
    };
    Fixture {
        videos,
        engine: PerformanceEngine::new(stores, config),
    }
}

/// 40 identical first-week snapshots of 10_000 views: full-confidence baseline.
fn saturated_channel(channel: &str) -> MemorySnapshots {
    let mut by_channel = HashMap::new();
    by_channel.insert(channel.to_string(), first_week(channel, &[10_000; 40]));
    MemorySnapshots {
        by_channel,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Baselines
// ---------------------------------------------------------------------------

#[tokio::test]
async fn channel_baseline_blends_with_global_sample() {
    let mut snapshots = MemorySnapshots {
        global: vec![1_000, 100_000],
        ..Default::default()
    };
    snapshots
        .by_channel
        .insert("UCsmall".into(), first_week("UCsmall", &[2_000, 3_000, 4_000]));
    let f = fixture(vec![], snapshots, dense_envelope(), EngineConfig::default());

    let global = f.engine.compute_global_baseline().await.unwrap();
    assert!((global - 10_000.0).abs() < 1e-6);

    let baseline = f.engine.compute_channel_baseline("UCsmall").await;
    assert_eq!(baseline.method, BaselineMethod::Blended);
    let expected = 0.1 * 3_000.0 + 0.9 * 10_000.0;
    assert!((baseline.baseline_views.unwrap() - expected).abs() < 1e-6);
}

#[tokio::test]
async fn unavailable_snapshots_degrade_to_no_data() {
    let snapshots = MemorySnapshots {
        unavailable: true,
        ..Default::default()
    };
    let f = fixture(vec![], snapshots, dense_envelope(), EngineConfig::default());
    let baseline = f.engine.compute_channel_baseline("UCany").await;
    assert_eq!(baseline.method, BaselineMethod::NoData);
    assert_eq!(baseline.confidence, 0.0);
}

#[tokio::test]
async fn days_tracked_config_applies_coverage_factor() {
    let config = EngineConfig {
        days_tracked: Some(45),
        ..Default::default()
    };
    let f = fixture(vec![], saturated_channel("UCchan"), dense_envelope(), config);
    let baseline = f.engine.compute_channel_baseline("UCchan").await;
    assert!((baseline.confidence - 0.5).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Backfill and envelopes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn backfill_skips_undersampled_checkpoints() {
    let mut videos: Vec<_> = (0..8)
        .map(|i| video(&format!("old{i}"), "UCchan", 40_000, 45))
        .collect();
    videos.extend((0..12).map(|i| video(&format!("new{i}"), "UCchan", 9_000, 10)));
    let f = fixture(videos, MemorySnapshots::default(), dense_envelope(), EngineConfig::default());

    let map = f.engine.backfill_channel_checkpoints("UCchan").await;
    assert!(!map.contains_key(&30));
    assert_eq!(map[&7].sample_size, 20);
}

#[tokio::test]
async fn sparse_backfill_returns_global_envelope() {
    let videos: Vec<_> = (0..8)
        .map(|i| video(&format!("v{i}"), "UCchan", 50_000, 30))
        .collect();
    let envelope = dense_envelope();
    let f = fixture(videos, MemorySnapshots::default(), envelope.clone(), EngineConfig::default());

    let adjusted = f.engine.build_channel_adjusted_envelope("UCchan", 30).await.unwrap();
    assert_eq!(adjusted.origin, ScalingOrigin::Global);
    assert_eq!(adjusted.scaling, EnvelopeScaling::IDENTITY);
    assert_eq!(adjusted.points.len(), envelope.len());
    for (a, g) in adjusted.points.iter().zip(&envelope) {
        assert_eq!(a.p50.to_bits(), g.p50.to_bits());
        assert_eq!(a.p90.to_bits(), g.p90.to_bits());
    }
}

#[tokio::test]
async fn channel_envelope_prefers_baseline_ratio() {
    let f = fixture(
        vec![],
        saturated_channel("UCchan"),
        sparse_envelope(),
        EngineConfig::default(),
    );
    let adjusted = f.engine.build_channel_adjusted_envelope("UCchan", 30).await.unwrap();
    assert_eq!(adjusted.origin, ScalingOrigin::BaselineRatio);
    let multiplier = adjusted.scaling.median_multiplier();
    assert!((multiplier - 10_000.0 / 8_478.0).abs() < 1e-12);
}

#[tokio::test]
async fn channel_envelope_uses_backfill_strategy() {
    let videos: Vec<_> = (0..15)
        .map(|i| video(&format!("v{i}"), "UCchan", 20_000 + 1_000 * i, 40))
        .collect();
    let config = EngineConfig {
        scaling: ScalingStrategy::PerPercentile,
        ..Default::default()
    };
    let f = fixture(videos, MemorySnapshots::default(), dense_envelope(), config);

    let adjusted = f.engine.build_channel_adjusted_envelope("UCchan", 40).await.unwrap();
    assert_eq!(adjusted.origin, ScalingOrigin::Backfill { checkpoint_day: 30 });
    assert_matches!(adjusted.scaling, EnvelopeScaling::PerPercentile { .. });
}

#[tokio::test]
async fn negative_age_is_rejected() {
    let f = fixture(vec![], MemorySnapshots::default(), dense_envelope(), EngineConfig::default());
    let err = f.engine.build_channel_adjusted_envelope("UCchan", -3).await.unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
}

#[tokio::test]
async fn video_envelope_uses_stored_ratio() {
    let mut v = video("abc", "UCchan", 1_000, 12);
    v.channel_baseline_at_publish = Some(0.5);
    let f = fixture(vec![v], MemorySnapshots::default(), dense_envelope(), EngineConfig::default());

    let adjusted = f.engine.build_video_envelope("abc").await.unwrap();
    assert_eq!(adjusted.scaling, EnvelopeScaling::Uniform { multiplier: 0.5 });
    assert_eq!(adjusted.origin, ScalingOrigin::BaselineRatio);
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn classifies_video_against_channel_baseline() {
    let f = fixture(
        vec![video("abc", "UCchan", 40_000, 30)],
        saturated_channel("UCchan"),
        sparse_envelope(),
        EngineConfig::default(),
    );

    let result = f.engine.classify_video("abc").await.unwrap();
    assert_eq!(result.age_days, 30);
    assert_eq!(result.baseline_method, BaselineMethod::TrimmedMedian);
    assert!((result.expected_views.unwrap() - 29_488.09).abs() < 0.5);
    assert!((result.ratio.unwrap() - 1.356).abs() < 0.01);
    assert_eq!(result.tier, Some(PerformanceTier::OnTrack));
}

#[tokio::test]
async fn unknown_video_is_not_found() {
    let f = fixture(vec![], MemorySnapshots::default(), dense_envelope(), EngineConfig::default());
    let err = f.engine.classify_video("missing").await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "video", .. });
}

#[tokio::test]
async fn future_publish_date_is_rejected() {
    let mut v = video("soon", "UCchan", 0, 0);
    v.published_at = Utc::now() + Duration::days(2);
    let f = fixture(vec![v], saturated_channel("UCchan"), dense_envelope(), EngineConfig::default());
    let err = f.engine.classify_video("soon").await.unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
}

#[tokio::test]
async fn missing_envelope_leaves_video_unclassified() {
    let f = fixture(
        vec![video("abc", "UCchan", 40_000, 30)],
        saturated_channel("UCchan"),
        vec![],
        EngineConfig::default(),
    );
    let result = f.engine.classify_video("abc").await.unwrap();
    assert!(!result.is_classified());
    assert_eq!(result.ratio, None);
}

#[tokio::test]
async fn malformed_envelope_is_treated_as_missing() {
    let mut broken = point(1, 1_000.0);
    broken.p10 = broken.p90 * 2.0;
    let f = fixture(
        vec![video("abc", "UCchan", 40_000, 1)],
        saturated_channel("UCchan"),
        vec![broken],
        EngineConfig::default(),
    );
    let result = f.engine.classify_video("abc").await.unwrap();
    assert!(!result.is_classified());
}

#[tokio::test]
async fn batch_yields_one_result_per_input() {
    let mut snapshots = saturated_channel("UCa");
    snapshots
        .by_channel
        .insert("UCb".into(), first_week("UCb", &[1_000; 30]));
    let videos = vec![
        video("a1", "UCa", 10_000, 1),
        video("a2", "UCa", 1_000, 1),
        video("b1", "UCb", 5_000, 1),
    ];
    let f = fixture(videos, snapshots, sparse_envelope(), EngineConfig::default());

    let ids: Vec<VideoId> = ["a1", "a2", "b1", "ghost"].map(String::from).to_vec();
    let results = f.engine.classify_videos(&ids).await;
    assert_eq!(results.len(), ids.len());

    let by_id: HashMap<_, _> = results.into_iter().collect();
    assert_eq!(
        by_id["a1"].as_ref().unwrap().tier,
        Some(PerformanceTier::OnTrack)
    );
    assert_eq!(
        by_id["a2"].as_ref().unwrap().tier,
        Some(PerformanceTier::NeedsAttention)
    );
    assert_eq!(
        by_id["b1"].as_ref().unwrap().tier,
        Some(PerformanceTier::Viral)
    );
    assert_matches!(by_id["ghost"], Err(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_writes_back_and_reuses_fresh_cache() {
    let f = fixture(
        vec![video("abc", "UCchan", 40_000, 30)],
        saturated_channel("UCchan"),
        sparse_envelope(),
        EngineConfig::default(),
    );

    let first = f.engine.refresh_classification("abc").await.unwrap();
    assert!(f.videos.cache.lock().unwrap().contains_key("abc"));

    let second = f.engine.refresh_classification("abc").await.unwrap();
    assert_eq!(first.computed_at, second.computed_at);
}

#[tokio::test]
async fn stale_cache_is_recomputed() {
    let f = fixture(
        vec![video("abc", "UCchan", 40_000, 30)],
        saturated_channel("UCchan"),
        sparse_envelope(),
        EngineConfig::default(),
    );

    let mut stale = f.engine.classify_video("abc").await.unwrap();
    stale.computed_at = Utc::now() - Duration::hours(48);
    stale.tier = Some(PerformanceTier::Viral);
    f.videos.save_classification(&stale).await.unwrap();

    let refreshed = f.engine.refresh_classification("abc").await.unwrap();
    assert!(refreshed.computed_at > stale.computed_at);
    assert_eq!(refreshed.value.tier, Some(PerformanceTier::OnTrack));
}

#[tokio::test]
async fn invalidated_cache_lists_video_again() {
    let f = fixture(
        vec![video("abc", "UCchan", 40_000, 30)],
        saturated_channel("UCchan"),
        sparse_envelope(),
        EngineConfig::default(),
    );
    f.engine.refresh_classification("abc").await.unwrap();
    let cutoff = Utc::now() - Duration::hours(1);
    assert!(f
        .videos
        .list_videos_needing_classification(cutoff, 10)
        .await
        .unwrap()
        .is_empty());

    assert!(f.videos.invalidate_classification("abc").await.unwrap());
    let pending = f
        .videos
        .list_videos_needing_classification(cutoff, 10)
        .await
        .unwrap();
    assert_eq!(pending, vec!["abc".to_string()]);
}
