//! Shared threshold validation helpers.
//!
//! Range checks used by the engine and by configuration loading.

use crate::error::CoreError;

/// Validate that a video age (in whole days since publish) is not negative.
///
/// A negative age means `published_at` lies after the evaluation time.
pub fn validate_video_age(age_days: i64) -> Result<(), CoreError> {
    if age_days < 0 {
        return Err(CoreError::Validation(format!(
            "video age must be non-negative, got {age_days} days"
        )));
    }
    Ok(())
}

/// Validate that a tier threshold table is strictly descending.
pub fn validate_descending(values: &[f64], name: &str) -> Result<(), CoreError> {
    if values.windows(2).any(|w| w[0] <= w[1]) {
        return Err(CoreError::Validation(format!(
            "{name} must be strictly descending, got {values:?}"
        )));
    }
    Ok(())
}
