//! Backfill estimation of historical view checkpoints.
//!
//! Channels that were never snapshotted early in their videos' lives still
//! have current view counts. Each current count is rescaled backwards along
//! the global median curve to estimate what the video had at fixed
//! checkpoint ages, and the estimates are pooled per checkpoint.
//!
//! The estimate assumes a video's relative position on the global curve has
//! stayed roughly constant since the checkpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::envelope::{EnvelopeCurve, EnvelopeLookupCache, MAX_ENVELOPE_DAY};
use crate::stats;
use crate::types::VideoId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Standard checkpoint ages, in days since publish.
pub const CHECKPOINT_DAYS: [i32; 7] = [1, 7, 14, 30, 60, 90, 180];

/// Minimum number of estimates for a checkpoint to be reported.
pub const MIN_CHECKPOINT_SAMPLES: usize = 10;

/// Nearest-rank fractions for p10, p25, p50, p75 and p90.
const PERCENTILE_FRACTIONS: [f64; 5] = [0.1, 0.25, 0.5, 0.75, 0.9];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A channel video as seen today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillVideo {
    pub video_id: VideoId,
    pub current_view_count: i64,
    pub current_age_days: i32,
}

/// Estimated view percentiles for one checkpoint age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackfilledCheckpoint {
    pub checkpoint_day: i32,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub sample_size: usize,
}

impl BackfilledCheckpoint {
    /// True when enough estimates back this checkpoint.
    pub fn is_valid(&self) -> bool {
        self.sample_size >= MIN_CHECKPOINT_SAMPLES
    }

    pub fn percentiles(&self) -> [f64; 5] {
        [self.p10, self.p25, self.p50, self.p75, self.p90]
    }
}

/// Sparse checkpoint map, ordered by checkpoint day.
pub type BackfillMap = BTreeMap<i32, BackfilledCheckpoint>;

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Estimate historical checkpoint percentiles for a channel's videos.
///
/// Videos younger than one day, with negative view counts, or whose
/// current-age envelope median is not positive are skipped. Checkpoints with
/// fewer than [`MIN_CHECKPOINT_SAMPLES`] estimates are dropped.
pub fn backfill_checkpoints(videos: &[BackfillVideo], curve: &EnvelopeCurve) -> BackfillMap {
    let mut lookups = EnvelopeLookupCache::new(curve);
    let mut bags: BTreeMap<i32, Vec<f64>> = BTreeMap::new();

    for video in videos {
        if video.current_age_days < 1 || video.current_view_count < 0 {
            continue;
        }
        let target_age = video.current_age_days.min(MAX_ENVELOPE_DAY);
        let Some(now_p50) = lookups.lookup(target_age).map(|p| p.p50) else {
            continue;
        };
        if now_p50 <= 0.0 {
            continue;
        }

        let views = video.current_view_count as f64;
        for &checkpoint in CHECKPOINT_DAYS
            .iter()
            .filter(|c| video.current_age_days >= **c)
        {
            let Some(checkpoint_point) = lookups.lookup(checkpoint) else {
                continue;
            };
            let estimate = views * (checkpoint_point.p50 / now_p50);
            bags.entry(checkpoint).or_default().push(estimate);
        }
    }

    tracing::debug!(
        videos = videos.len(),
        envelope_days_resolved = lookups.resolved_days(),
        "Backfill estimates collected"
    );

    bags.into_iter()
        .filter_map(|(day, mut estimates)| summarize(day, &mut estimates))
        .map(|checkpoint| (checkpoint.checkpoint_day, checkpoint))
        .collect()
}

/// Reduce one checkpoint's estimates to nearest-rank percentiles.
fn summarize(checkpoint_day: i32, estimates: &mut [f64]) -> Option<BackfilledCheckpoint> {
    if estimates.len() < MIN_CHECKPOINT_SAMPLES {
        return None;
    }
    stats::sort_ascending(estimates);
    let sorted: &[f64] = estimates;
    let [p10, p25, p50, p75, p90] =
        PERCENTILE_FRACTIONS.map(|f| stats::nearest_rank(sorted, f).unwrap_or(0.0));
    Some(BackfilledCheckpoint {
        checkpoint_day,
        p10,
        p25,
        p50,
        p75,
        p90,
        sample_size: sorted.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
