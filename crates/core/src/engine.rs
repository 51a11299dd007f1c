//! Request-driven orchestration of the performance computations.
//!
//! [`PerformanceEngine`] fetches inputs through the injected [`Stores`] and
//! hands them to the pure functions in the sibling modules. Statistical and
//! upstream gaps degrade to fallbacks; only unknown videos and impossible
//! ages are reported as errors.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::backfill::{backfill_checkpoints, BackfillMap, BackfillVideo};
use crate::baseline::{compute_channel_baseline, compute_global_baseline, ChannelBaseline};
use crate::cache::CachedValue;
use crate::channel_envelope::{
    baseline_ratio, build_adjusted_envelope, select_scaling, AdjustedEnvelope, ScalingStrategy,
};
use crate::classification::{
    classify, ClassificationInput, PerformanceClassification, TierThresholds,
};
use crate::envelope::{EnvelopeCurve, MAX_ENVELOPE_DAY};
use crate::error::CoreError;
use crate::stores::{StoreError, Stores, VideoRecord};
use crate::threshold_validation::validate_video_age;
use crate::types::{Timestamp, VideoId};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default size of the cross-channel sample behind the global baseline.
pub const DEFAULT_GLOBAL_SAMPLE_LIMIT: i64 = 5_000;

/// Default age after which a cached classification is recomputed.
pub const DEFAULT_CACHE_MAX_AGE_HOURS: i64 = 24;

/// Tunables for [`PerformanceEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Days of tracking coverage for the dual-factor confidence; `None`
    /// uses sample size alone.
    pub days_tracked: Option<u32>,
    pub scaling: ScalingStrategy,
    pub thresholds: TierThresholds,
    pub cache_max_age_hours: i64,
    pub global_sample_limit: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            days_tracked: None,
            scaling: ScalingStrategy::default(),
            thresholds: TierThresholds::default(),
            cache_max_age_hours: DEFAULT_CACHE_MAX_AGE_HOURS,
            global_sample_limit: DEFAULT_GLOBAL_SAMPLE_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn cache_max_age(&self) -> Duration {
        Duration::hours(self.cache_max_age_hours)
    }
}

/// Whole days between publish and `as_of`, rounded down.
///
/// Negative when `published_at` lies after `as_of`.
pub fn video_age_days(published_at: Timestamp, as_of: Timestamp) -> i64 {
    (as_of - published_at).num_seconds().div_euclid(86_400)
}

fn to_envelope_day(age_days: i64) -> i32 {
    age_days.min(i64::from(i32::MAX)) as i32
}

fn store_to_core(err: StoreError) -> CoreError {
    CoreError::Unavailable(err.to_string())
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Baseline, backfill, envelope and classification operations.
///
/// Cheap to clone; every clone shares the same store handles.
#[derive(Clone)]
pub struct PerformanceEngine {
    stores: Stores,
    config: Arc<EngineConfig>,
}

impl PerformanceEngine {
    pub fn new(stores: Stores, config: EngineConfig) -> Self {
        Self {
            stores,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- inputs ---------------------------------------------------------------

    /// Load the full global envelope. Unavailable or malformed curves become
    /// an empty curve, which every consumer treats as "no data".
    pub async fn load_envelope(&self) -> EnvelopeCurve {
        let points = match self.stores.envelope.get_envelope(0..=MAX_ENVELOPE_DAY).await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(error = %e, "Global envelope unavailable");
                return EnvelopeCurve::default();
            }
        };
        let curve = EnvelopeCurve::new(points);
        if let Err(defect) = curve.validate() {
            tracing::warn!(%defect, "Global envelope rejected");
            return EnvelopeCurve::default();
        }
        curve
    }

    /// Geometric-mean baseline across channels, or `None` without data.
    pub async fn compute_global_baseline(&self) -> Option<f64> {
        match self
            .stores
            .snapshots
            .get_global_first_week_views(self.config.global_sample_limit)
            .await
        {
            Ok(views) => {
                let baseline = compute_global_baseline(&views);
                tracing::debug!(sample = views.len(), ?baseline, "Global baseline computed");
                baseline
            }
            Err(e) => {
                tracing::warn!(error = %e, "Global baseline sample unavailable");
                None
            }
        }
    }

    /// Channel baseline blended against a fresh global baseline.
    pub async fn compute_channel_baseline(&self, channel_id: &str) -> ChannelBaseline {
        let global = self.compute_global_baseline().await;
        self.channel_baseline_with(channel_id, global).await
    }

    async fn channel_baseline_with(
        &self,
        channel_id: &str,
        global: Option<f64>,
    ) -> ChannelBaseline {
        let snapshots = match self.stores.snapshots.get_first_week_snapshots(channel_id).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(channel_id, error = %e, "Snapshots unavailable; using fallback");
                Vec::new()
            }
        };
        let baseline =
            compute_channel_baseline(channel_id, &snapshots, global, self.config.days_tracked);
        tracing::debug!(
            channel_id,
            method = baseline.method.as_str(),
            confidence = baseline.confidence,
            video_count = baseline.video_count,
            "Channel baseline computed"
        );
        baseline
    }

    async fn channel_videos(&self, channel_id: &str) -> Vec<VideoRecord> {
        match self.stores.videos.get_channel_videos(channel_id).await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::warn!(channel_id, error = %e, "Channel videos unavailable");
                Vec::new()
            }
        }
    }

    async fn require_video(&self, video_id: &str) -> Result<VideoRecord, CoreError> {
        self.stores
            .videos
            .get_video(video_id)
            .await
            .map_err(store_to_core)?
            .ok_or_else(|| CoreError::NotFound {
                entity: "video",
                id: video_id.to_string(),
            })
    }

    // -- backfill -------------------------------------------------------------

    /// Estimated checkpoint percentiles from the channel's current view counts.
    pub async fn backfill_channel_checkpoints(&self, channel_id: &str) -> BackfillMap {
        let curve = self.load_envelope().await;
        let videos = self.channel_videos(channel_id).await;
        self.backfill_with(channel_id, &videos, &curve)
    }

    fn backfill_with(
        &self,
        channel_id: &str,
        videos: &[VideoRecord],
        curve: &EnvelopeCurve,
    ) -> BackfillMap {
        let now = Utc::now();
        let inputs: Vec<BackfillVideo> = videos
            .iter()
            .filter_map(|v| {
                let age = video_age_days(v.published_at, now);
                (age >= 1).then(|| BackfillVideo {
                    video_id: v.id.clone(),
                    current_view_count: v.view_count,
                    current_age_days: to_envelope_day(age),
                })
            })
            .collect();
        let map = backfill_checkpoints(&inputs, curve);
        tracing::debug!(
            channel_id,
            videos = inputs.len(),
            checkpoints = map.len(),
            "Backfill checkpoints estimated"
        );
        map
    }

    // -- envelopes ------------------------------------------------------------

    /// Channel-adjusted envelope for a video of the given age on `channel_id`.
    ///
    /// Uses the channel's baseline ratio when the baseline reflects channel
    /// data, otherwise backfill, otherwise the unscaled global envelope.
    pub async fn build_channel_adjusted_envelope(
        &self,
        channel_id: &str,
        video_age: i64,
    ) -> Result<AdjustedEnvelope, CoreError> {
        validate_video_age(video_age)?;
        let curve = self.load_envelope().await;
        let baseline = self.compute_channel_baseline(channel_id).await;
        let ratio = baseline_ratio(&baseline, &curve);
        let backfill = match ratio {
            Some(_) => BackfillMap::new(),
            None => {
                let videos = self.channel_videos(channel_id).await;
                self.backfill_with(channel_id, &videos, &curve)
            }
        };
        Ok(self.assemble_envelope(&curve, ratio, &backfill, to_envelope_day(video_age)))
    }

    /// Channel-adjusted envelope for one stored video, preferring the
    /// baseline ratio captured at publish time.
    pub async fn build_video_envelope(&self, video_id: &str) -> Result<AdjustedEnvelope, CoreError> {
        let video = self.require_video(video_id).await?;
        let age = video_age_days(video.published_at, Utc::now());
        validate_video_age(age)?;
        let curve = self.load_envelope().await;
        let backfill = match video.channel_baseline_at_publish {
            Some(_) => BackfillMap::new(),
            None => {
                let videos = self.channel_videos(&video.channel_id).await;
                self.backfill_with(&video.channel_id, &videos, &curve)
            }
        };
        Ok(self.assemble_envelope(
            &curve,
            video.channel_baseline_at_publish,
            &backfill,
            to_envelope_day(age),
        ))
    }

    fn assemble_envelope(
        &self,
        curve: &EnvelopeCurve,
        ratio: Option<f64>,
        backfill: &BackfillMap,
        video_age: i32,
    ) -> AdjustedEnvelope {
        let (scaling, origin) =
            select_scaling(ratio, backfill, curve, video_age, self.config.scaling);
        tracing::debug!(
            ?origin,
            multiplier = scaling.median_multiplier(),
            "Envelope scaling selected"
        );
        build_adjusted_envelope(curve, scaling, origin)
    }

    // -- classification -------------------------------------------------------

    /// Classify a single video against its channel's expectation.
    pub async fn classify_video(
        &self,
        video_id: &str,
    ) -> Result<PerformanceClassification, CoreError> {
        let video = self.require_video(video_id).await?;
        let curve = self.load_envelope().await;
        let baseline = self.compute_channel_baseline(&video.channel_id).await;
        self.classify_record(&video, &baseline, &curve, Utc::now())
    }

    fn classify_record(
        &self,
        video: &VideoRecord,
        baseline: &ChannelBaseline,
        curve: &EnvelopeCurve,
        now: Timestamp,
    ) -> Result<PerformanceClassification, CoreError> {
        let age = video_age_days(video.published_at, now);
        validate_video_age(age)?;
        let input = ClassificationInput {
            video_id: &video.id,
            actual_views: video.view_count,
            age_days: to_envelope_day(age),
            channel_baseline: baseline.baseline_views,
            baseline_method: baseline.method,
        };
        let result = classify(&input, curve, &self.config.thresholds, now);
        match (result.tier, result.unclassified_reason) {
            (Some(tier), _) => tracing::debug!(
                video_id = %video.id,
                ratio = result.ratio,
                tier = tier.as_str(),
                "Video classified"
            ),
            (None, reason) => {
                tracing::info!(video_id = %video.id, ?reason, "Video left unclassified")
            }
        }
        Ok(result)
    }

    /// Classify many videos.
    ///
    /// Every input id yields exactly one entry, either a classification or
    /// the error for that id. Output order is unspecified. The envelope and
    /// global baseline are loaded once and each distinct channel's baseline
    /// is computed once.
    pub async fn classify_videos(
        &self,
        video_ids: &[VideoId],
    ) -> Vec<(VideoId, Result<PerformanceClassification, CoreError>)> {
        let curve = self.load_envelope().await;
        let global = self.compute_global_baseline().await;

        let mut fetches = JoinSet::new();
        for (index, video_id) in video_ids.iter().cloned().enumerate() {
            let engine = self.clone();
            fetches.spawn(async move { (index, engine.require_video(&video_id).await) });
        }

        let mut fetched: Vec<Option<Result<VideoRecord, CoreError>>> =
            (0..video_ids.len()).map(|_| None).collect();
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((index, result)) => fetched[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "Video fetch task failed"),
            }
        }

        let mut baselines: HashMap<String, ChannelBaseline> = HashMap::new();
        for video in fetched.iter().flatten().flatten() {
            if !baselines.contains_key(&video.channel_id) {
                let baseline = self.channel_baseline_with(&video.channel_id, global).await;
                baselines.insert(video.channel_id.clone(), baseline);
            }
        }

        let now = Utc::now();
        let results: Vec<_> = video_ids
            .iter()
            .zip(fetched)
            .map(|(video_id, fetched)| {
                let result = match fetched {
                    Some(Ok(video)) => match baselines.get(&video.channel_id) {
                        Some(baseline) => self.classify_record(&video, baseline, &curve, now),
                        None => Err(CoreError::Internal(format!(
                            "no baseline computed for channel {}",
                            video.channel_id
                        ))),
                    },
                    Some(Err(e)) => Err(e),
                    None => Err(CoreError::Internal("video fetch task failed".into())),
                };
                (video_id.clone(), result)
            })
            .collect();

        let classified = results
            .iter()
            .filter(|(_, r)| r.as_ref().is_ok_and(PerformanceClassification::is_classified))
            .count();
        tracing::info!(
            requested = video_ids.len(),
            classified,
            channels = baselines.len(),
            "Batch classification finished"
        );
        results
    }

    /// Return the cached classification when fresh, otherwise recompute it
    /// and write it back.
    ///
    /// Cache read and write failures are logged and never fail the call.
    pub async fn refresh_classification(
        &self,
        video_id: &str,
    ) -> Result<CachedValue<PerformanceClassification>, CoreError> {
        let now = Utc::now();
        match self.stores.videos.get_cached_classification(video_id).await {
            Ok(Some(cached)) if cached.is_fresh(self.config.cache_max_age(), now) => {
                tracing::debug!(video_id, "Cached classification reused");
                return Ok(cached);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(video_id, error = %e, "Classification cache unreadable"),
        }

        let classification = self.classify_video(video_id).await?;
        self.persist(&classification).await;
        let computed_at = classification.computed_at;
        Ok(CachedValue::new(classification, computed_at))
    }

    /// Write a classification to the video cache, logging failures.
    pub async fn persist(&self, classification: &PerformanceClassification) -> bool {
        match self.stores.videos.save_classification(classification).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    video_id = %classification.video_id,
                    error = %e,
                    "Failed to cache classification"
                );
                false
            }
        }
    }
}
