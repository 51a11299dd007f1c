//! Global performance envelope: view-count percentiles by day since publish.
//!
//! The envelope is precomputed across the whole video corpus by an external
//! batch job and is read-only here. Lookups clamp to the supported day range
//! and fall back to the nearest stored day when the exact day is missing.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest day the envelope is guaranteed to cover. Older videos reuse it.
pub const MAX_ENVELOPE_DAY: i32 = 730;

/// Day the channel baseline is anchored to on the global curve.
pub const BASELINE_ANCHOR_DAY: i32 = 1;

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

/// One row of the global envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalEnvelopePoint {
    pub day_since_published: i32,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl GlobalEnvelopePoint {
    /// Percentiles in ascending order `[p10, p25, p50, p75, p90]`.
    pub fn percentiles(&self) -> [f64; 5] {
        [self.p10, self.p25, self.p50, self.p75, self.p90]
    }

    /// True when `p10 <= p25 <= p50 <= p75 <= p90`.
    pub fn is_monotonic(&self) -> bool {
        self.percentiles().windows(2).all(|w| w[0] <= w[1])
    }
}

/// Reason a loaded envelope was rejected by [`EnvelopeCurve::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvelopeDefect {
    #[error("day {day}: percentiles are not ordered p10 <= p25 <= p50 <= p75 <= p90")]
    NotMonotonic { day: i32 },

    #[error("day {day}: percentile values must be finite and non-negative")]
    InvalidValue { day: i32 },

    #[error("day {day}: negative day since publish")]
    NegativeDay { day: i32 },
}

// ---------------------------------------------------------------------------
// Curve
// ---------------------------------------------------------------------------

/// The global envelope, keyed by day since publish.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCurve {
    points: BTreeMap<i32, GlobalEnvelopePoint>,
}

impl EnvelopeCurve {
    /// Build a curve from rows. Later duplicates of the same day win.
    pub fn new(points: impl IntoIterator<Item = GlobalEnvelopePoint>) -> Self {
        Self {
            points: points
                .into_iter()
                .map(|p| (p.day_since_published, p))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Largest stored day, if any.
    pub fn max_day(&self) -> Option<i32> {
        self.points.keys().next_back().copied()
    }

    /// All stored points in ascending day order.
    pub fn points(&self) -> impl Iterator<Item = &GlobalEnvelopePoint> {
        self.points.values()
    }

    /// Check every point for ordering and value sanity.
    ///
    /// Returns the first defect found, in day order.
    pub fn validate(&self) -> Result<(), EnvelopeDefect> {
        for point in self.points.values() {
            let day = point.day_since_published;
            if day < 0 {
                return Err(EnvelopeDefect::NegativeDay { day });
            }
            if point
                .percentiles()
                .iter()
                .any(|v| !v.is_finite() || *v < 0.0)
            {
                return Err(EnvelopeDefect::InvalidValue { day });
            }
            if !point.is_monotonic() {
                return Err(EnvelopeDefect::NotMonotonic { day });
            }
        }
        Ok(())
    }

    /// Look up the envelope point for `day`.
    ///
    /// `day` is clamped to `[0, min(MAX_ENVELOPE_DAY, max stored day)]`. When
    /// the clamped day is not stored, the nearest stored day by absolute
    /// distance is used, ties going to the smaller day. Returns `None` only
    /// for an empty curve.
    pub fn lookup(&self, day: i32) -> Option<GlobalEnvelopePoint> {
        let max_day = self.max_day()?.min(MAX_ENVELOPE_DAY);
        let day = day.clamp(0, max_day.max(0));

        let below = self.points.range(..=day).next_back();
        let above = self.points.range(day..).next();

        match (below, above) {
            (Some((&lo_day, lo)), Some((&hi_day, hi))) => {
                if day - lo_day <= hi_day - day {
                    Some(*lo)
                } else {
                    Some(*hi)
                }
            }
            (Some((_, p)), None) | (None, Some((_, p))) => Some(*p),
            (None, None) => None,
        }
    }

    /// Median views at `day`, or `None` if the curve is empty.
    pub fn p50_at(&self, day: i32) -> Option<f64> {
        self.lookup(day).map(|p| p.p50)
    }
}

// ---------------------------------------------------------------------------
// Per-batch lookup cache
// ---------------------------------------------------------------------------

/// Memoizes [`EnvelopeCurve::lookup`] results for one batch invocation.
///
/// The backfill estimator asks for the same handful of days once per video;
/// this keeps each distinct day to a single tree search.
pub struct EnvelopeLookupCache<'a> {
    curve: &'a EnvelopeCurve,
    memo: HashMap<i32, Option<GlobalEnvelopePoint>>,
}

impl<'a> EnvelopeLookupCache<'a> {
    pub fn new(curve: &'a EnvelopeCurve) -> Self {
        Self {
            curve,
            memo: HashMap::new(),
        }
    }

    pub fn lookup(&mut self, day: i32) -> Option<GlobalEnvelopePoint> {
        let curve = self.curve;
        *self.memo.entry(day).or_insert_with(|| curve.lookup(day))
    }

    /// Number of distinct days resolved so far.
    pub fn resolved_days(&self) -> usize {
        self.memo.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
