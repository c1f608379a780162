// =============================================================================
// Pipeline — store → indicators → snapshots → watchlist + coverage
// =============================================================================
//
// The store is partitioned once by instrument and each partition is computed
// independently (daily series, then the weekly resample). A failing
// instrument is logged, recorded, and left out of every downstream join; the
// rest of the run carries on. A weekly-only failure just drops the weekly
// snapshot for that instrument.
//
// Instrument order is fixed by the partition, so parallel and sequential runs
// produce identical tables. The SHA-256 digest over the serialized tables
// makes that checkable.
// =============================================================================

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::coverage::{audit_coverage, CoverageRecord};
use crate::errors::PipelineError;
use crate::indicators::{compute_indicators, IndicatorRow, InstrumentSeries};
use crate::market_data::{load_raw_prices, CompanyMaster, PriceObservation, PriceStore};
use crate::resample::to_weekly;
use crate::runtime_config::RuntimeConfig;
use crate::signals::{build_watchlist, CompositeScorer, WatchlistEntry};
use crate::snapshot::latest_rows;
use crate::types::Frequency;

/// An instrument that could not be computed at one frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentFailure {
    pub instrument_id: String,
    pub frequency: Frequency,
    pub error: String,
}

/// Every table produced by one run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub daily: Vec<InstrumentSeries>,
    pub weekly: Vec<InstrumentSeries>,
    pub latest_daily: Vec<IndicatorRow>,
    pub latest_weekly: Vec<IndicatorRow>,
    pub watchlist: Vec<WatchlistEntry>,
    pub coverage: Vec<CoverageRecord>,
    pub failures: Vec<InstrumentFailure>,
    /// Most recent daily date in the dataset.
    pub horizon: Option<NaiveDate>,
    /// Raw rows dropped at parse time.
    pub skipped_rows: usize,
    /// Hex SHA-256 over the serialized tables.
    pub digest: String,
}

impl PipelineOutput {
    pub fn series(&self, frequency: Frequency, instrument_id: &str) -> Option<&InstrumentSeries> {
        let tables = match frequency {
            Frequency::Daily => &self.daily,
            Frequency::Weekly => &self.weekly,
        };
        tables.iter().find(|s| s.instrument_id == instrument_id)
    }

    pub fn latest(&self, frequency: Frequency) -> &[IndicatorRow] {
        match frequency {
            Frequency::Daily => &self.latest_daily,
            Frequency::Weekly => &self.latest_weekly,
        }
    }
}

struct InstrumentResult {
    daily: Result<InstrumentSeries, PipelineError>,
    weekly: Option<Result<InstrumentSeries, PipelineError>>,
}

fn compute_instrument(instrument_id: &str, bars: &[PriceObservation]) -> InstrumentResult {
    match compute_indicators(instrument_id, bars) {
        Ok(daily) => InstrumentResult {
            daily: Ok(daily),
            weekly: Some(compute_indicators(instrument_id, &to_weekly(bars))),
        },
        Err(e) => InstrumentResult {
            daily: Err(e),
            weekly: None,
        },
    }
}

/// Map over the partitions, on the rayon pool when enabled. Output order
/// always matches input order.
fn map_partitions(
    partitions: &[(String, Vec<PriceObservation>)],
    parallel: bool,
) -> Vec<InstrumentResult> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return partitions
                .par_iter()
                .map(|(id, bars)| compute_instrument(id, bars))
                .collect();
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        if parallel {
            tracing::debug!("built without the parallel feature, computing sequentially");
        }
    }

    partitions
        .iter()
        .map(|(id, bars)| compute_instrument(id, bars))
        .collect()
}

/// Log and record an excluded instrument. The id carried by the error wins
/// over the partition key.
fn record_failure(
    failures: &mut Vec<InstrumentFailure>,
    frequency: Frequency,
    partition_id: &str,
    error: &PipelineError,
) {
    let instrument_id = error.instrument_id().unwrap_or(partition_id);
    warn!(
        instrument = instrument_id,
        %frequency,
        error = %error,
        "instrument excluded"
    );
    failures.push(InstrumentFailure {
        instrument_id: instrument_id.to_string(),
        frequency,
        error: error.to_string(),
    });
}

fn table_digest(output: &PipelineOutput) -> Result<String> {
    let mut hasher = Sha256::new();
    let tables: [(&str, Vec<u8>); 6] = [
        ("daily", serde_json::to_vec(&output.daily)?),
        ("weekly", serde_json::to_vec(&output.weekly)?),
        ("latest_daily", serde_json::to_vec(&output.latest_daily)?),
        ("latest_weekly", serde_json::to_vec(&output.latest_weekly)?),
        ("watchlist", serde_json::to_vec(&output.watchlist)?),
        ("coverage", serde_json::to_vec(&output.coverage)?),
    ];
    for (name, bytes) in &tables {
        hasher.update(name.as_bytes());
        hasher.update(bytes);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Run every stage over an in-memory store.
pub fn run_pipeline(
    store: &PriceStore,
    master: &CompanyMaster,
    config: &RuntimeConfig,
) -> Result<PipelineOutput> {
    let partitions = store.partition();
    info!(
        instruments = store.instrument_count(),
        observations = store.observation_count(),
        parallel = config.parallel,
        "computing indicators"
    );

    let mut daily = Vec::with_capacity(partitions.len());
    let mut weekly = Vec::with_capacity(partitions.len());
    let mut failures = Vec::new();

    let results = map_partitions(&partitions, config.parallel);
    for ((instrument_id, _), result) in partitions.iter().zip(results) {
        match result.daily {
            Ok(series) => daily.push(series),
            Err(e) => {
                record_failure(&mut failures, Frequency::Daily, instrument_id, &e);
                continue;
            }
        }
        match result.weekly {
            Some(Ok(series)) => weekly.push(series),
            Some(Err(e)) => record_failure(&mut failures, Frequency::Weekly, instrument_id, &e),
            None => {}
        }
    }

    let latest_daily = latest_rows(&daily);
    let latest_weekly = latest_rows(&weekly);

    let scorer = CompositeScorer::new(config.scoring.clone());
    let watchlist = build_watchlist(
        &latest_daily,
        &latest_weekly,
        master,
        &scorer,
        config.watchlist_size,
    );
    let coverage = audit_coverage(&daily, master, &config.coverage);
    let horizon = latest_daily.iter().map(|r| r.date).max();

    let mut output = PipelineOutput {
        daily,
        weekly,
        latest_daily,
        latest_weekly,
        watchlist,
        coverage,
        failures,
        horizon,
        skipped_rows: 0,
        digest: String::new(),
    };
    output.digest = table_digest(&output).context("failed to serialise tables for digest")?;

    info!(
        daily = output.daily.len(),
        weekly = output.weekly.len(),
        watchlist = output.watchlist.len(),
        failures = output.failures.len(),
        digest = %output.digest,
        "pipeline complete"
    );

    Ok(output)
}

/// Load both inputs named by `config` and run the pipeline.
///
/// A schema problem in the raw price file aborts; a missing company master
/// only costs the company names.
pub fn run_from_files(config: &RuntimeConfig) -> Result<PipelineOutput> {
    let raw = load_raw_prices(&config.raw_prices_path)?;
    let master = CompanyMaster::load_or_empty(&config.company_master_path)?;
    if master.is_empty() {
        warn!("company master has no names, watchlist and coverage names will be null");
    }
    let store = PriceStore::from_observations(raw.observations);
    if store.is_empty() {
        warn!(
            path = %config.raw_prices_path.display(),
            skipped = raw.skipped_rows,
            "no usable price rows, every table will be empty"
        );
    }

    let mut output = run_pipeline(&store, &master, config)?;
    output.skipped_rows = raw.skipped_rows;
    Ok(output)
}
