// =============================================================================
// Table writer
// =============================================================================
//
// One pretty-printed JSON file per table, each written atomically (tmp +
// rename) so a reader never sees a half-written file. The manifest carries no
// wall-clock timestamp so reruns on unchanged input leave every file
// byte-identical.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::indicators::{IndicatorRow, InstrumentSeries};
use crate::pipeline::{InstrumentFailure, PipelineOutput};

pub const INDICATORS_DAILY: &str = "indicators_daily.json";
pub const INDICATORS_WEEKLY: &str = "indicators_weekly.json";
pub const LATEST_DAILY: &str = "latest_daily.json";
pub const LATEST_WEEKLY: &str = "latest_weekly.json";
pub const WATCHLIST: &str = "watchlist.json";
pub const COVERAGE_REPORT: &str = "coverage_report.json";
pub const MANIFEST: &str = "manifest.json";

/// Summary of one run, written next to the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub digest: String,
    pub horizon: Option<NaiveDate>,
    pub daily_instruments: usize,
    pub weekly_instruments: usize,
    pub daily_rows: usize,
    pub weekly_rows: usize,
    pub watchlist_rows: usize,
    pub skipped_rows: usize,
    pub failures: Vec<InstrumentFailure>,
    pub files: Vec<String>,
}

impl Manifest {
    pub fn from_output(output: &PipelineOutput) -> Self {
        Self {
            digest: output.digest.clone(),
            horizon: output.horizon,
            daily_instruments: output.daily.len(),
            weekly_instruments: output.weekly.len(),
            daily_rows: output.daily.iter().map(|s| s.rows.len()).sum(),
            weekly_rows: output.weekly.iter().map(|s| s.rows.len()).sum(),
            watchlist_rows: output.watchlist.len(),
            skipped_rows: output.skipped_rows,
            failures: output.failures.clone(),
            files: [
                INDICATORS_DAILY,
                INDICATORS_WEEKLY,
                LATEST_DAILY,
                LATEST_WEEKLY,
                WATCHLIST,
                COVERAGE_REPORT,
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
        }
    }
}

/// Serialise `value` and move it into place at `path`.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialise {}", path.display()))?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &content)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename {} into place", path.display()))?;

    debug!(path = %path.display(), bytes = content.len(), "table written");
    Ok(())
}

/// Long-format rows: every series flattened in instrument order.
fn flatten(series: &[InstrumentSeries]) -> Vec<&IndicatorRow> {
    series.iter().flat_map(|s| s.rows.iter()).collect()
}

/// Write every table plus the manifest into `dir`, creating it if needed.
/// Returns the manifest path.
pub fn write_tables(dir: impl AsRef<Path>, output: &PipelineOutput) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    write_json_atomic(&dir.join(INDICATORS_DAILY), &flatten(&output.daily))?;
    write_json_atomic(&dir.join(INDICATORS_WEEKLY), &flatten(&output.weekly))?;
    write_json_atomic(&dir.join(LATEST_DAILY), &output.latest_daily)?;
    write_json_atomic(&dir.join(LATEST_WEEKLY), &output.latest_weekly)?;
    write_json_atomic(&dir.join(WATCHLIST), &output.watchlist)?;
    write_json_atomic(&dir.join(COVERAGE_REPORT), &output.coverage)?;

    let manifest_path = dir.join(MANIFEST);
    write_json_atomic(&manifest_path, &Manifest::from_output(output))?;

    info!(
        dir = %dir.display(),
        digest = %output.digest,
        "tables written"
    );
    Ok(manifest_path)
}
