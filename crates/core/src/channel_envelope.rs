//! Channel-adjusted performance envelopes.
//!
//! A channel-adjusted envelope is the global envelope rescaled by how the
//! channel sits relative to the platform. The scale comes from a stored
//! baseline ratio when one exists, otherwise from backfilled checkpoints,
//! otherwise it is 1 and the global envelope is returned unchanged.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backfill::{BackfillMap, BackfilledCheckpoint};
use crate::baseline::ChannelBaseline;
use crate::envelope::{EnvelopeCurve, GlobalEnvelopePoint, BASELINE_ANCHOR_DAY};
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

/// Independent ratios for each percentile band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileRatios {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

/// How the global envelope is rescaled for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvelopeScaling {
    /// One multiplier applied to every band.
    Uniform { multiplier: f64 },
    /// One ratio per band, preserving differences in band width.
    PerPercentile { ratios: PercentileRatios },
}

impl EnvelopeScaling {
    pub const IDENTITY: Self = Self::Uniform { multiplier: 1.0 };

    /// Rescale a single global point.
    pub fn apply(&self, point: &GlobalEnvelopePoint) -> ChannelAdjustedEnvelopePoint {
        let (m10, m25, m50, m75, m90) = match *self {
            Self::Uniform { multiplier: m } => (m, m, m, m, m),
            Self::PerPercentile { ratios: r } => (r.p10, r.p25, r.p50, r.p75, r.p90),
        };
        ChannelAdjustedEnvelopePoint {
            day_since_published: point.day_since_published,
            p10: point.p10 * m10,
            p25: point.p25 * m25,
            p50: point.p50 * m50,
            p75: point.p75 * m75,
            p90: point.p90 * m90,
        }
    }

    /// Multiplier applied to the median band.
    pub fn median_multiplier(&self) -> f64 {
        match *self {
            Self::Uniform { multiplier } => multiplier,
            Self::PerPercentile { ratios } => ratios.p50,
        }
    }
}

/// Which backfill scaling a caller wants when no baseline ratio exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStrategy {
    #[default]
    Uniform,
    PerPercentile,
}

impl FromStr for ScalingStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(Self::Uniform),
            "per_percentile" | "per-percentile" => Ok(Self::PerPercentile),
            other => Err(CoreError::Validation(format!(
                "unknown envelope scaling strategy '{other}'"
            ))),
        }
    }
}

/// Where the scaling came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ScalingOrigin {
    BaselineRatio,
    Backfill { checkpoint_day: i32 },
    Global,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One day of a channel-adjusted envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelAdjustedEnvelopePoint {
    pub day_since_published: i32,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

/// A full channel-adjusted envelope plus how it was scaled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedEnvelope {
    pub scaling: EnvelopeScaling,
    pub origin: ScalingOrigin,
    pub points: Vec<ChannelAdjustedEnvelopePoint>,
}

// ---------------------------------------------------------------------------
// Deriving the scaling
// ---------------------------------------------------------------------------

/// Baseline ratio for a channel without a stored per-video value.
///
/// `baseline / global[day 1].p50`, only when the baseline reflects channel
/// data (a global-fallback baseline says nothing about the channel).
pub fn baseline_ratio(baseline: &ChannelBaseline, curve: &EnvelopeCurve) -> Option<f64> {
    if !baseline.method.uses_channel_data() {
        return None;
    }
    let anchor = curve.p50_at(BASELINE_ANCHOR_DAY)?;
    let value = baseline.baseline_views?;
    (anchor > 0.0 && value.is_finite()).then(|| value / anchor)
}

/// Scaling from the largest valid checkpoint not older than `video_age`.
pub fn backfill_scaling(
    backfill: &BackfillMap,
    curve: &EnvelopeCurve,
    video_age: i32,
    strategy: ScalingStrategy,
) -> Option<(EnvelopeScaling, i32)> {
    let checkpoint = backfill
        .range(..=video_age)
        .rev()
        .map(|(_, cp)| cp)
        .find(|cp| cp.is_valid())?;
    let global = curve.lookup(checkpoint.checkpoint_day)?;
    if global.p50 <= 0.0 {
        return None;
    }
    let median_ratio = checkpoint.p50 / global.p50;

    let scaling = match strategy {
        ScalingStrategy::Uniform => EnvelopeScaling::Uniform {
            multiplier: median_ratio,
        },
        ScalingStrategy::PerPercentile => EnvelopeScaling::PerPercentile {
            ratios: per_percentile_ratios(checkpoint, &global, median_ratio),
        },
    };
    Some((scaling, checkpoint.checkpoint_day))
}

/// Band-by-band ratios; a band with a zero global value borrows the median ratio.
fn per_percentile_ratios(
    checkpoint: &BackfilledCheckpoint,
    global: &GlobalEnvelopePoint,
    median_ratio: f64,
) -> PercentileRatios {
    let ratio = |backfilled: f64, global: f64| {
        if global > 0.0 {
            backfilled / global
        } else {
            median_ratio
        }
    };
    PercentileRatios {
        p10: ratio(checkpoint.p10, global.p10),
        p25: ratio(checkpoint.p25, global.p25),
        p50: median_ratio,
        p75: ratio(checkpoint.p75, global.p75),
        p90: ratio(checkpoint.p90, global.p90),
    }
}

/// Pick the scaling for a video: baseline ratio, then backfill, then identity.
pub fn select_scaling(
    baseline_ratio: Option<f64>,
    backfill: &BackfillMap,
    curve: &EnvelopeCurve,
    video_age: i32,
    strategy: ScalingStrategy,
) -> (EnvelopeScaling, ScalingOrigin) {
    if let Some(multiplier) = baseline_ratio.filter(|m| m.is_finite() && *m > 0.0) {
        return (
            EnvelopeScaling::Uniform { multiplier },
            ScalingOrigin::BaselineRatio,
        );
    }
    match backfill_scaling(backfill, curve, video_age, strategy) {
        Some((scaling, checkpoint_day)) => (scaling, ScalingOrigin::Backfill { checkpoint_day }),
        None => (EnvelopeScaling::IDENTITY, ScalingOrigin::Global),
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Apply `scaling` to every stored day of the global curve.
pub fn build_adjusted_envelope(
    curve: &EnvelopeCurve,
    scaling: EnvelopeScaling,
    origin: ScalingOrigin,
) -> AdjustedEnvelope {
    AdjustedEnvelope {
        scaling,
        origin,
        points: curve.points().map(|p| scaling.apply(p)).collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
