//! Channel and global first-week baselines.
//!
//! A channel's baseline is the trimmed median of its first-week view
//! snapshots, weighted by a sample-size confidence and blended towards the
//! global baseline when the channel's own evidence is thin.

use serde::{Deserialize, Serialize};

use crate::stats;
use crate::types::{ChannelId, Timestamp, VideoId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Snapshots older than this many days since publish are not first-week data.
pub const FIRST_WEEK_MAX_DAY: i32 = 7;

/// Sample count at which channel confidence saturates at 1.0.
pub const CONFIDENCE_SATURATION_COUNT: usize = 30;

/// Days of tracking at which the coverage factor saturates at 1.0.
pub const FULL_COVERAGE_DAYS: u32 = 90;

/// Inclusive view-count window for the cross-channel global sample.
pub const GLOBAL_SAMPLE_MIN_VIEWS: i64 = 100;
pub const GLOBAL_SAMPLE_MAX_VIEWS: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// A single recorded view count for a video. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub video_id: VideoId,
    pub observed_at: Timestamp,
    pub view_count: Option<i64>,
    pub days_since_published: i32,
}

impl ViewSnapshot {
    /// View count if this snapshot qualifies as first-week baseline data.
    pub fn first_week_views(&self) -> Option<f64> {
        if (0..=FIRST_WEEK_MAX_DAY).contains(&self.days_since_published) {
            self.view_count.filter(|v| *v >= 0).map(|v| v as f64)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// How a [`ChannelBaseline`] value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMethod {
    /// Channel's own trimmed median, used as-is.
    TrimmedMedian,
    /// Channel median weighted against the global baseline by confidence.
    Blended,
    /// No channel data; the global baseline stands in.
    GlobalFallback,
    /// Neither channel nor global data is available.
    NoData,
}

impl BaselineMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TrimmedMedian => "trimmed_median",
            Self::Blended => "blended",
            Self::GlobalFallback => "global_fallback",
            Self::NoData => "no_data",
        }
    }

    /// True when the value reflects at least some channel-specific data.
    pub fn uses_channel_data(self) -> bool {
        matches!(self, Self::TrimmedMedian | Self::Blended)
    }
}

/// A channel's typical first-week view performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelBaseline {
    pub channel_id: ChannelId,
    /// Effective baseline after blending; `None` only for [`BaselineMethod::NoData`].
    pub baseline_views: Option<f64>,
    /// Unblended trimmed median of the channel's own snapshots.
    pub channel_median: Option<f64>,
    pub confidence: f64,
    pub method: BaselineMethod,
    pub video_count: usize,
}

// ---------------------------------------------------------------------------
// Confidence and blending
// ---------------------------------------------------------------------------

/// Confidence in a channel statistic from its sample size.
///
/// `min(video_count / 30, 1)`. When `days_tracked` is supplied (multi-channel
/// comparisons) the result is further scaled by `min(days_tracked / 90, 1)`.
pub fn baseline_confidence(video_count: usize, days_tracked: Option<u32>) -> f64 {
    let sample = (video_count as f64 / CONFIDENCE_SATURATION_COUNT as f64).min(1.0);
    match days_tracked {
        Some(days) => sample * (days as f64 / FULL_COVERAGE_DAYS as f64).min(1.0),
        None => sample,
    }
}

/// `channel * confidence + global * (1 - confidence)`.
///
/// Exact at both ends: confidence 1 returns `channel`, confidence 0 returns
/// `global`.
pub fn blend(channel: f64, global: f64, confidence: f64) -> f64 {
    if confidence >= 1.0 {
        return channel;
    }
    if confidence <= 0.0 {
        return global;
    }
    channel * confidence + global * (1.0 - confidence)
}

// ---------------------------------------------------------------------------
// Baselines
// ---------------------------------------------------------------------------

/// Compute a channel's baseline from its snapshots.
///
/// Only first-week snapshots with a view count take part. Never fails:
/// an empty channel degrades to the global baseline with zero confidence.
pub fn compute_channel_baseline(
    channel_id: &str,
    snapshots: &[ViewSnapshot],
    global_baseline: Option<f64>,
    days_tracked: Option<u32>,
) -> ChannelBaseline {
    let mut views: Vec<f64> = snapshots
        .iter()
        .filter_map(ViewSnapshot::first_week_views)
        .collect();
    stats::sort_ascending(&mut views);

    let video_count = views.len();
    let Some(channel_median) = stats::trimmed_median(&views) else {
        let method = if global_baseline.is_some() {
            BaselineMethod::GlobalFallback
        } else {
            BaselineMethod::NoData
        };
        return ChannelBaseline {
            channel_id: channel_id.to_string(),
            baseline_views: global_baseline,
            channel_median: None,
            confidence: 0.0,
            method,
            video_count: 0,
        };
    };

    let confidence = baseline_confidence(video_count, days_tracked);
    let (baseline_views, method) = match global_baseline {
        Some(global) if confidence < 1.0 => (
            blend(channel_median, global, confidence),
            BaselineMethod::Blended,
        ),
        _ => (channel_median, BaselineMethod::TrimmedMedian),
    };

    ChannelBaseline {
        channel_id: channel_id.to_string(),
        baseline_views: Some(baseline_views),
        channel_median: Some(channel_median),
        confidence,
        method,
        video_count,
    }
}

/// Geometric mean of a cross-channel first-week view sample.
///
/// Views outside `[100, 1_000_000]` are excluded so dead uploads and
/// runaway hits do not dominate. Returns `None` for an empty sample.
pub fn compute_global_baseline(first_week_views: &[i64]) -> Option<f64> {
    let sample: Vec<f64> = first_week_views
        .iter()
        .filter(|v| (GLOBAL_SAMPLE_MIN_VIEWS..=GLOBAL_SAMPLE_MAX_VIEWS).contains(v))
        .map(|v| *v as f64)
        .collect();
    stats::geometric_mean(&sample)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
