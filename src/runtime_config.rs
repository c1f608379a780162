// =============================================================================
// Runtime Configuration — pipeline paths, scoring and coverage settings
// =============================================================================
//
// Every stage receives what it needs from this value; there are no global
// paths. All fields carry `#[serde(default)]` so that adding new fields never
// breaks loading an older config file. Persistence uses an atomic tmp + rename
// write.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_raw_prices_path() -> PathBuf {
    PathBuf::from("data/raw/daily_prices.json")
}

fn default_company_master_path() -> PathBuf {
    PathBuf::from("data/reference/company_master.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_watchlist_size() -> usize {
    20
}

fn default_weekly_trend_points() -> i32 {
    3
}

fn default_one_point() -> i32 {
    1
}

fn default_rsi_zone_low() -> f64 {
    40.0
}

fn default_rsi_zone_high() -> f64 {
    65.0
}

fn default_near_high_threshold() -> f64 {
    -0.25
}

fn default_deep_drawdown_threshold() -> f64 {
    -0.35
}

fn default_max_staleness_days() -> i64 {
    2
}

fn default_min_history_rows() -> usize {
    20
}

// =============================================================================
// ScoringParams
// =============================================================================

/// Points and thresholds of the composite watchlist score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    /// Added when weekly SMA-50 > weekly SMA-200.
    #[serde(default = "default_weekly_trend_points")]
    pub weekly_trend_points: i32,

    /// Added when daily close > daily SMA-50.
    #[serde(default = "default_one_point")]
    pub close_above_sma_points: i32,

    /// Inclusive lower bound of the healthy daily RSI zone.
    #[serde(default = "default_rsi_zone_low")]
    pub rsi_zone_low: f64,

    /// Inclusive upper bound of the healthy daily RSI zone.
    #[serde(default = "default_rsi_zone_high")]
    pub rsi_zone_high: f64,

    #[serde(default = "default_one_point")]
    pub rsi_zone_points: i32,

    /// Weekly distance to the 52-week high must be strictly above this.
    #[serde(default = "default_near_high_threshold")]
    pub near_high_threshold: f64,

    #[serde(default = "default_one_point")]
    pub near_high_points: i32,

    /// Weekly drawdown strictly below this is penalised.
    #[serde(default = "default_deep_drawdown_threshold")]
    pub deep_drawdown_threshold: f64,

    /// Subtracted (as a positive number) for a deep weekly drawdown.
    #[serde(default = "default_one_point")]
    pub deep_drawdown_penalty: i32,

    /// Added when the daily MACD histogram is positive.
    #[serde(default = "default_one_point")]
    pub macd_positive_points: i32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            weekly_trend_points: default_weekly_trend_points(),
            close_above_sma_points: default_one_point(),
            rsi_zone_low: default_rsi_zone_low(),
            rsi_zone_high: default_rsi_zone_high(),
            rsi_zone_points: default_one_point(),
            near_high_threshold: default_near_high_threshold(),
            near_high_points: default_one_point(),
            deep_drawdown_threshold: default_deep_drawdown_threshold(),
            deep_drawdown_penalty: default_one_point(),
            macd_positive_points: default_one_point(),
        }
    }
}

// =============================================================================
// CoverageParams
// =============================================================================

/// Thresholds of the coverage audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageParams {
    /// An instrument whose last row is older than the dataset horizon minus
    /// this many days is STALE.
    #[serde(default = "default_max_staleness_days")]
    pub max_staleness_days: i64,

    /// Fewer rows than this is LOW_HISTORY.
    #[serde(default = "default_min_history_rows")]
    pub min_history_rows: usize,
}

impl Default for CoverageParams {
    fn default() -> Self {
        Self {
            max_staleness_days: default_max_staleness_days(),
            min_history_rows: default_min_history_rows(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for a pipeline run (and the API server).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Inputs / outputs ---------------------------------------------------

    /// JSON array of raw price rows.
    #[serde(default = "default_raw_prices_path")]
    pub raw_prices_path: PathBuf,

    /// JSON array of `{symbol, company_name}` rows.
    #[serde(default = "default_company_master_path")]
    pub company_master_path: PathBuf,

    /// Directory receiving the derived tables.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Listen address for `serve`.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Pipeline -----------------------------------------------------------

    /// Number of watchlist rows kept after ranking.
    #[serde(default = "default_watchlist_size")]
    pub watchlist_size: usize,

    /// Compute instruments on the rayon pool (needs the `parallel` feature).
    #[serde(default = "default_true")]
    pub parallel: bool,

    #[serde(default)]
    pub scoring: ScoringParams,

    #[serde(default)]
    pub coverage: CoverageParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            raw_prices_path: default_raw_prices_path(),
            company_master_path: default_company_master_path(),
            output_dir: default_output_dir(),
            bind_addr: default_bind_addr(),
            watchlist_size: default_watchlist_size(),
            parallel: true,
            scoring: ScoringParams::default(),
            coverage: CoverageParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            raw_prices = %config.raw_prices_path.display(),
            watchlist_size = config.watchlist_size,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}
