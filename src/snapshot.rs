// =============================================================================
// Snapshot Extractor — latest row per instrument
// =============================================================================

use std::collections::HashMap;

use crate::indicators::{IndicatorRow, InstrumentSeries};

/// Most recent row of each series, ordered by instrument id. Empty series are
/// skipped.
pub fn latest_rows(series: &[InstrumentSeries]) -> Vec<IndicatorRow> {
    let mut latest: Vec<IndicatorRow> = series
        .iter()
        .filter_map(|s| s.rows.iter().max_by_key(|r| r.date).cloned())
        .collect();
    latest.sort_by(|a, b| a.instrument_id.cmp(&b.instrument_id));
    latest
}

/// Key a snapshot table by instrument id for joins.
pub fn index_by_instrument(rows: &[IndicatorRow]) -> HashMap<&str, &IndicatorRow> {
    rows.iter().map(|r| (r.instrument_id.as_str(), r)).collect()
}
