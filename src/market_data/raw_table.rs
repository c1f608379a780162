// =============================================================================
// Raw price table ingest
// =============================================================================
//
// The raw table is a JSON array of row objects. Column names are resolved once
// for the whole table (with the `symbol` / `close_price` fallbacks) and any
// missing required column is a fatal schema error. After that, rows whose
// required values cannot be parsed are skipped and counted, and unparseable
// optional values simply become `None`.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::errors::PipelineError;
use crate::market_data::PriceObservation;

const DATE_COLUMN: &str = "date";
const INSTRUMENT_COLUMNS: &[&str] = &["instrument_id", "symbol"];
const CLOSE_COLUMNS: &[&str] = &["close", "close_price"];

/// Parsed raw table plus the number of rows that had to be dropped.
#[derive(Debug, Clone, Default)]
pub struct RawPriceTable {
    pub observations: Vec<PriceObservation>,
    pub skipped_rows: usize,
}

/// Column names actually used for this table after fallback resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    instrument: &'static str,
    close: &'static str,
}

impl ColumnMap {
    fn resolve(available: &BTreeSet<String>) -> Result<Self, PipelineError> {
        let pick = |candidates: &[&'static str]| {
            candidates
                .iter()
                .copied()
                .find(|c| available.contains(*c))
        };

        let instrument = pick(INSTRUMENT_COLUMNS);
        let close = pick(CLOSE_COLUMNS);

        let mut missing = Vec::new();
        if !available.contains(DATE_COLUMN) {
            missing.push(DATE_COLUMN.to_string());
        }
        if instrument.is_none() {
            missing.push(INSTRUMENT_COLUMNS[0].to_string());
        }
        if close.is_none() {
            missing.push(CLOSE_COLUMNS[0].to_string());
        }

        match (instrument, close) {
            (Some(instrument), Some(close)) if missing.is_empty() => Ok(Self { instrument, close }),
            _ => Err(PipelineError::Schema {
                missing,
                available: available.iter().cloned().collect(),
            }),
        }
    }
}

/// Parse an in-memory raw table.
pub fn parse_records(records: &[Value]) -> Result<RawPriceTable, PipelineError> {
    let rows: Vec<&Map<String, Value>> = records.iter().filter_map(Value::as_object).collect();

    let available: BTreeSet<String> = rows.iter().flat_map(|r| r.keys().cloned()).collect();
    let columns = ColumnMap::resolve(&available)?;

    let mut table = RawPriceTable {
        observations: Vec::with_capacity(rows.len()),
        skipped_rows: records.len() - rows.len(),
    };

    for (idx, row) in rows.iter().enumerate() {
        match parse_row(row, columns) {
            Ok(obs) => table.observations.push(obs),
            Err(e) => {
                debug!(row = idx, error = %e, "skipping raw price row");
                table.skipped_rows += 1;
            }
        }
    }

    if table.skipped_rows > 0 {
        warn!(
            skipped = table.skipped_rows,
            kept = table.observations.len(),
            "raw price rows skipped (unparseable required values)"
        );
    }

    Ok(table)
}

/// Read and parse the raw price table at `path`.
pub fn load_raw_prices(path: impl AsRef<Path>) -> Result<RawPriceTable> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read raw prices from {}", path.display()))?;
    let records: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse raw prices from {}", path.display()))?;

    let table = parse_records(&records)
        .with_context(|| format!("raw price table {} has an invalid schema", path.display()))?;

    info!(
        path = %path.display(),
        rows = table.observations.len(),
        skipped = table.skipped_rows,
        "raw prices loaded"
    );

    Ok(table)
}

// =============================================================================
// Row helpers
// =============================================================================

fn parse_row(row: &Map<String, Value>, columns: ColumnMap) -> Result<PriceObservation> {
    let instrument_id = row
        .get(columns.instrument)
        .and_then(value_as_text)
        .context("missing instrument id")?;
    if instrument_id.is_empty() {
        anyhow::bail!("blank instrument id");
    }

    let date = parse_date(row.get(DATE_COLUMN).context("missing date")?)?;
    let close = parse_number(row.get(columns.close).context("missing close")?, columns.close)?;

    let mut obs = PriceObservation::new(instrument_id, date, close);
    obs.open = optional_number(row, "open");
    obs.high = optional_number(row, "high");
    obs.low = optional_number(row, "low");
    obs.volume = optional_number(row, "volume");
    obs.source = row
        .get("source")
        .and_then(value_as_text)
        .filter(|s| !s.is_empty());
    Ok(obs)
}

/// Trimmed text form of a scalar cell; numbers are rendered as text.
fn value_as_text(val: &Value) -> Option<String> {
    match val {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD`, ignoring any time suffix.
fn parse_date(val: &Value) -> Result<NaiveDate> {
    let text = val.as_str().context("date is not a string")?.trim();
    let day = text
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("failed to parse date: {text}"))
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn parse_number(val: &Value, name: &str) -> Result<f64> {
    let parsed = match val {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}"))?,
        Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64"))?,
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    };
    if !parsed.is_finite() {
        anyhow::bail!("field {name} is not finite");
    }
    Ok(parsed)
}

fn optional_number(row: &Map<String, Value>, name: &str) -> Option<f64> {
    match row.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(val) => parse_number(val, name).ok(),
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_standard_columns() {
        let records = vec![json!({
            "date": "2024-03-01",
            "instrument_id": " JKH.N0000 ",
            "close": 191.5,
            "high": "193.0",
            "low": 189.25,
            "volume": 12000,
            "source": "yahoo"
        })];
        let table = parse_records(&records).unwrap();
        assert_eq!(table.skipped_rows, 0);
        let obs = &table.observations[0];
        assert_eq!(obs.instrument_id, "JKH.N0000");
        assert_eq!(obs.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(obs.close, 191.5);
        assert_eq!(obs.high, Some(193.0));
        assert_eq!(obs.low, Some(189.25));
        assert_eq!(obs.volume, Some(12000.0));
        assert_eq!(obs.open, None);
        assert_eq!(obs.source.as_deref(), Some("yahoo"));
    }

    #[test]
    fn falls_back_to_symbol_and_close_price() {
        let records = vec![json!({
            "date": "2024-03-01T00:00:00",
            "symbol": "COMB.N0000",
            "yahoo_ticker": "COMB-N0000.CM",
            "close_price": "101.25"
        })];
        let table = parse_records(&records).unwrap();
        assert_eq!(table.observations.len(), 1);
        assert_eq!(table.observations[0].instrument_id, "COMB.N0000");
        assert_eq!(table.observations[0].close, 101.25);
    }

    #[test]
    fn missing_columns_are_named() {
        let records = vec![json!({ "symbol": "AAA", "open": 1.0 })];
        let err = parse_records(&records).unwrap_err();
        match err {
            PipelineError::Schema { missing, available } => {
                assert_eq!(missing, vec!["date".to_string(), "close".to_string()]);
                assert_eq!(available, vec!["open".to_string(), "symbol".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_table_is_a_schema_error() {
        let err = parse_records(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { ref missing, .. } if missing.len() == 3));
    }

    #[test]
    fn bad_rows_are_skipped_not_fatal() {
        let records = vec![
            json!({ "date": "2024-03-01", "symbol": "AAA", "close": 10.0 }),
            json!({ "date": "not-a-date", "symbol": "AAA", "close": 11.0 }),
            json!({ "date": "2024-03-02", "symbol": "AAA", "close": "n/a" }),
            json!({ "date": "2024-03-03", "symbol": "", "close": 12.0 }),
            json!(["not", "an", "object"]),
            json!({ "date": "2024-03-04", "symbol": "AAA", "close": 13.0, "volume": "bad" }),
        ];
        let table = parse_records(&records).unwrap();
        assert_eq!(table.observations.len(), 2);
        assert_eq!(table.skipped_rows, 4);
        assert_eq!(table.observations[1].volume, None);
    }
}
