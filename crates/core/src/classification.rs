//! Performance ratio and tier classification.
//!
//! Expected views at a given age are the channel baseline carried along the
//! global median curve from day 1. The ratio of actual to expected views is
//! mapped onto a five-tier scale.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::baseline::BaselineMethod;
use crate::envelope::{EnvelopeCurve, BASELINE_ANCHOR_DAY};
use crate::error::CoreError;
use crate::threshold_validation::validate_descending;
use crate::types::{Timestamp, VideoId};

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Five-tier performance scale, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Viral,
    Outperforming,
    OnTrack,
    Underperforming,
    NeedsAttention,
}

impl PerformanceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viral => "viral",
            Self::Outperforming => "outperforming",
            Self::OnTrack => "on_track",
            Self::Underperforming => "underperforming",
            Self::NeedsAttention => "needs_attention",
        }
    }
}

impl FromStr for PerformanceTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viral" => Ok(Self::Viral),
            "outperforming" => Ok(Self::Outperforming),
            "on_track" => Ok(Self::OnTrack),
            "underperforming" => Ok(Self::Underperforming),
            "needs_attention" | "poor" => Ok(Self::NeedsAttention),
            other => Err(CoreError::Validation(format!(
                "unknown performance tier '{other}'"
            ))),
        }
    }
}

/// Lower bounds of each tier.
///
/// `viral` is strictly above its bound; every other tier includes its bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub viral_above: f64,
    pub outperforming_min: f64,
    pub on_track_min: f64,
    pub underperforming_min: f64,
}

impl TierThresholds {
    /// The canonical table: 3.0 / 1.5 / 0.5 / 0.2.
    pub const CANONICAL: Self = Self {
        viral_above: 3.0,
        outperforming_min: 1.5,
        on_track_min: 0.5,
        underperforming_min: 0.2,
    };

    /// The stricter table some dashboard views use: 3.0 / 1.5 / 0.8 / 0.5.
    pub const CONSERVATIVE: Self = Self {
        viral_above: 3.0,
        outperforming_min: 1.5,
        on_track_min: 0.8,
        underperforming_min: 0.5,
    };

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_descending(
            &[
                self.viral_above,
                self.outperforming_min,
                self.on_track_min,
                self.underperforming_min,
            ],
            "tier thresholds",
        )
    }

    /// Map a performance ratio to its tier.
    pub fn tier_for(&self, ratio: f64) -> PerformanceTier {
        if ratio > self.viral_above {
            PerformanceTier::Viral
        } else if ratio >= self.outperforming_min {
            PerformanceTier::Outperforming
        } else if ratio >= self.on_track_min {
            PerformanceTier::OnTrack
        } else if ratio >= self.underperforming_min {
            PerformanceTier::Underperforming
        } else {
            PerformanceTier::NeedsAttention
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::CANONICAL
    }
}

impl FromStr for TierThresholds {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canonical" => Ok(Self::CANONICAL),
            "conservative" => Ok(Self::CONSERVATIVE),
            other => Err(CoreError::Validation(format!(
                "unknown tier threshold table '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Global shape
// ---------------------------------------------------------------------------

/// `global[age].p50 / global[1].p50`, or `None` when the curve cannot say.
pub fn global_shape_multiplier(curve: &EnvelopeCurve, age_days: i32) -> Option<f64> {
    let anchor = curve.p50_at(BASELINE_ANCHOR_DAY)?;
    if anchor <= 0.0 {
        return None;
    }
    Some(curve.p50_at(age_days)? / anchor)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Why a video could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnclassifiedReason {
    /// Neither channel nor global baseline data exists.
    NoBaseline,
    /// The envelope is missing or its day-1 median is not positive.
    NoEnvelope,
    /// Expected views came out as zero or non-finite.
    DegenerateExpectation,
}

/// The computed performance of one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceClassification {
    pub video_id: VideoId,
    pub age_days: i32,
    pub actual_views: i64,
    pub expected_views: Option<f64>,
    pub ratio: Option<f64>,
    pub tier: Option<PerformanceTier>,
    pub baseline_method: BaselineMethod,
    pub unclassified_reason: Option<UnclassifiedReason>,
    pub computed_at: Timestamp,
}

impl PerformanceClassification {
    pub fn is_classified(&self) -> bool {
        self.tier.is_some()
    }
}

/// Inputs for a single classification.
#[derive(Debug, Clone)]
pub struct ClassificationInput<'a> {
    pub video_id: &'a str,
    pub actual_views: i64,
    pub age_days: i32,
    pub channel_baseline: Option<f64>,
    pub baseline_method: BaselineMethod,
}

/// Classify one video. Degenerate inputs yield an unclassified result
/// rather than an error.
pub fn classify(
    input: &ClassificationInput<'_>,
    curve: &EnvelopeCurve,
    thresholds: &TierThresholds,
    computed_at: Timestamp,
) -> PerformanceClassification {
    let expected = match input.channel_baseline {
        None => Err(UnclassifiedReason::NoBaseline),
        Some(baseline) => match global_shape_multiplier(curve, input.age_days) {
            None => Err(UnclassifiedReason::NoEnvelope),
            Some(shape) => {
                let expected = baseline * shape;
                if expected.is_finite() && expected > 0.0 {
                    Ok(expected)
                } else {
                    Err(UnclassifiedReason::DegenerateExpectation)
                }
            }
        },
    };

    let (expected_views, ratio, tier, unclassified_reason) = match expected {
        Ok(expected) => {
            let ratio = input.actual_views as f64 / expected;
            (Some(expected), Some(ratio), Some(thresholds.tier_for(ratio)), None)
        }
        Err(reason) => (None, None, None, Some(reason)),
    };

    PerformanceClassification {
        video_id: input.video_id.to_string(),
        age_days: input.age_days,
        actual_views: input.actual_views,
        expected_views,
        ratio,
        tier,
        baseline_method: input.baseline_method,
        unclassified_reason,
        computed_at,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
