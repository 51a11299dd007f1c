//! Batch reclassification of stale cached classifications.
//!
//! Picks videos whose cached classification is missing or older than the
//! engine's cache age budget, classifies them in one batch and writes the
//! results back to the cache.

use chrono::Utc;
use vidpulse_core::engine::PerformanceEngine;
use vidpulse_core::error::CoreError;
use vidpulse_core::stores::VideoStore;

/// Counts from one reclassification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclassifySummary {
    pub selected: usize,
    pub classified: usize,
    pub unclassified: usize,
    pub failed: usize,
    pub persisted: usize,
}

/// Run a single pass over at most `batch_size` stale videos.
///
/// Per-video errors are logged and counted; only failing to list the
/// candidates aborts the pass.
pub async fn run_once(
    engine: &PerformanceEngine,
    videos: &dyn VideoStore,
    batch_size: i64,
) -> anyhow::Result<ReclassifySummary> {
    let cutoff = Utc::now() - engine.config().cache_max_age();
    let ids = videos
        .list_videos_needing_classification(cutoff, batch_size)
        .await?;

    let mut summary = ReclassifySummary {
        selected: ids.len(),
        ..Default::default()
    };
    if ids.is_empty() {
        tracing::debug!("Reclassification: nothing stale");
        return Ok(summary);
    }

    for (video_id, result) in engine.classify_videos(&ids).await {
        match result {
            Ok(classification) => {
                if classification.is_classified() {
                    summary.classified += 1;
                } else {
                    summary.unclassified += 1;
                }
                if engine.persist(&classification).await {
                    summary.persisted += 1;
                }
            }
            Err(CoreError::NotFound { .. }) => {
                tracing::debug!(%video_id, "Reclassification: video vanished");
                summary.failed += 1;
            }
            Err(e) => {
                tracing::warn!(%video_id, error = %e, "Reclassification: video failed");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        selected = summary.selected,
        classified = summary.classified,
        unclassified = summary.unclassified,
        failed = summary.failed,
        persisted = summary.persisted,
        "Reclassification pass finished"
    );
    Ok(summary)
}
