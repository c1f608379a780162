use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One end-of-day price observation for a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub instrument_id: String,
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

impl PriceObservation {
    pub fn new(instrument_id: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            date,
            close,
            open: None,
            high: None,
            low: None,
            volume: None,
            source: None,
        }
    }
}

// ---------------------------------------------------------------------------
// PriceStore -- canonical per-instrument series
// ---------------------------------------------------------------------------

/// In-memory table of observations grouped by instrument and keyed by date.
///
/// Ingesting an observation for an existing `(instrument_id, date)` replaces
/// the previous one, so every series is date-ascending with unique dates no
/// matter the input order.
#[derive(Debug, Default, Clone)]
pub struct PriceStore {
    series: BTreeMap<String, BTreeMap<NaiveDate, PriceObservation>>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observations(observations: impl IntoIterator<Item = PriceObservation>) -> Self {
        let mut store = Self::new();
        store.ingest_all(observations);
        store
    }

    /// Insert one observation; last write wins for a duplicate date.
    pub fn ingest(&mut self, observation: PriceObservation) {
        self.series
            .entry(observation.instrument_id.clone())
            .or_default()
            .insert(observation.date, observation);
    }

    pub fn ingest_all(&mut self, observations: impl IntoIterator<Item = PriceObservation>) {
        for obs in observations {
            self.ingest(obs);
        }
    }

    /// Split the whole table into independent per-instrument series, ordered
    /// by instrument id.
    pub fn partition(&self) -> Vec<(String, Vec<PriceObservation>)> {
        self.series
            .iter()
            .map(|(id, by_date)| (id.clone(), by_date.values().cloned().collect()))
            .collect()
    }

    pub fn instrument_count(&self) -> usize {
        self.series.len()
    }

    pub fn observation_count(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn series_sorted_regardless_of_input_order() {
        let store = PriceStore::from_observations(vec![
            PriceObservation::new("AAA", d(2024, 1, 3), 3.0),
            PriceObservation::new("AAA", d(2024, 1, 1), 1.0),
            PriceObservation::new("AAA", d(2024, 1, 2), 2.0),
        ]);
        let parts = store.partition();
        let series = &parts[0].1;
        let dates: Vec<_> = series.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)]);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn duplicate_date_last_write_wins() {
        let store = PriceStore::from_observations(vec![
            PriceObservation::new("AAA", d(2024, 1, 1), 10.0),
            PriceObservation::new("AAA", d(2024, 1, 2), 11.0),
            PriceObservation::new("AAA", d(2024, 1, 1), 12.5),
        ]);
        let parts = store.partition();
        let series = &parts[0].1;
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].close, 12.5);
        assert_eq!(store.observation_count(), 2);
    }

    #[test]
    fn partition_keeps_instruments_apart() {
        let store = PriceStore::from_observations(vec![
            PriceObservation::new("BBB", d(2024, 1, 1), 5.0),
            PriceObservation::new("AAA", d(2024, 1, 1), 1.0),
            PriceObservation::new("BBB", d(2024, 1, 2), 6.0),
        ]);
        let parts = store.partition();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, "AAA");
        assert_eq!(parts[0].1.len(), 1);
        assert_eq!(parts[1].0, "BBB");
        assert_eq!(parts[1].1.len(), 2);
        assert!(parts[1].1.iter().all(|o| o.instrument_id == "BBB"));
    }

    #[test]
    fn new_store_is_empty() {
        let store = PriceStore::new();
        assert!(store.partition().is_empty());
        assert!(store.is_empty());
        assert_eq!(store.instrument_count(), 0);
    }
}
