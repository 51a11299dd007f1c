use anyhow::Context;
use vidpulse_core::channel_envelope::ScalingStrategy;
use vidpulse_core::classification::TierThresholds;
use vidpulse_core::engine::{EngineConfig, DEFAULT_CACHE_MAX_AGE_HOURS};

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Connection pool size (default: `20`).
    pub max_connections: u32,
    /// Videos reclassified per run (default: `500`).
    pub batch_size: i64,
    pub engine: EngineConfig,
    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default      |
    /// |--------------------------------|--------------|
    /// | `DATABASE_URL`                 | (required)   |
    /// | `DB_MAX_CONNECTIONS`           | `20`         |
    /// | `RECLASSIFY_BATCH_SIZE`        | `500`        |
    /// | `CLASSIFICATION_MAX_AGE_HOURS` | `24`         |
    /// | `BASELINE_DAYS_TRACKED`        | unset        |
    /// | `ENVELOPE_SCALING`             | `uniform`    |
    /// | `TIER_THRESHOLDS`              | `canonical`  |
    /// | `LOG_FORMAT`                   | `text`       |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let max_connections: u32 = parse_or(&lookup, "DB_MAX_CONNECTIONS", 20)?;
        let batch_size: i64 = parse_or(&lookup, "RECLASSIFY_BATCH_SIZE", 500)?;
        anyhow::ensure!(batch_size > 0, "RECLASSIFY_BATCH_SIZE must be positive");

        let cache_max_age_hours: i64 = parse_or(
            &lookup,
            "CLASSIFICATION_MAX_AGE_HOURS",
            DEFAULT_CACHE_MAX_AGE_HOURS,
        )?;
        let days_tracked: Option<u32> = lookup("BASELINE_DAYS_TRACKED")
            .map(|v| v.parse())
            .transpose()
            .context("BASELINE_DAYS_TRACKED must be a valid u32")?;
        let scaling: ScalingStrategy =
            parse_or(&lookup, "ENVELOPE_SCALING", ScalingStrategy::default())?;
        let thresholds: TierThresholds =
            parse_or(&lookup, "TIER_THRESHOLDS", TierThresholds::default())?;

        let json_logs = lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            max_connections,
            batch_size,
            engine: EngineConfig {
                days_tracked,
                scaling,
                thresholds,
                cache_max_age_hours,
                ..EngineConfig::default()
            },
            json_logs,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid ('{raw}'): {e}")),
        None => Ok(default),
    }
}
