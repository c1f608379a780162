// =============================================================================
// Indicator Engine
// =============================================================================
//
// Turns one instrument's date-ascending observations into a parallel series of
// indicator rows. Pure and per-instrument: nothing here looks across
// instrument boundaries, and the same input always yields the same rows.
//
// Columns (see the individual indicator modules for the formulas):
//   ret_1d, sma_50, sma_200, ema_20, rsi_14, macd / signal / hist, atr_14,
//   vol_20, high_252, dist_to_52w_high, peak_close, drawdown, vol_sma_20,
//   vol_spike, trend_long, rsi_state
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::market_data::PriceObservation;
use crate::types::{RsiState, TrendState};

use super::rolling::{
    rolling_max, rolling_mean, rolling_std, running_max, safe_ratio, with_previous,
};
use super::{atr, ema, macd, rsi};

pub const SMA_FAST: usize = 50;
pub const SMA_SLOW: usize = 200;
pub const EMA_SPAN: usize = 20;
pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const VOLATILITY_WINDOW: usize = 20;
pub const HIGH_WINDOW: usize = 252;
pub const VOLUME_WINDOW: usize = 20;
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// One observation extended with every derived indicator column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub instrument_id: String,
    pub date: NaiveDate,
    pub close: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
    pub source: Option<String>,

    pub ret_1d: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_20: f64,
    pub rsi_14: Option<f64>,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    pub atr_14: Option<f64>,
    pub vol_20: Option<f64>,
    pub high_252: Option<f64>,
    pub dist_to_52w_high: Option<f64>,
    pub peak_close: f64,
    pub drawdown: f64,
    pub vol_sma_20: Option<f64>,
    pub vol_spike: Option<f64>,

    pub trend_long: TrendState,
    pub rsi_state: RsiState,
}

/// Ordered indicator rows for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSeries {
    pub instrument_id: String,
    pub rows: Vec<IndicatorRow>,
}

impl InstrumentSeries {
    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }
}

/// Reject series the engine cannot give meaning to.
fn validate(instrument_id: &str, bars: &[PriceObservation]) -> Result<(), PipelineError> {
    if bars.is_empty() {
        return Err(PipelineError::EmptySeries {
            instrument_id: instrument_id.to_string(),
        });
    }
    if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(PipelineError::NonMonotonicDates {
            instrument_id: instrument_id.to_string(),
            date: w[1].date,
        });
    }
    if let Some(bad) = bars.iter().find(|b| !b.close.is_finite() || b.close <= 0.0) {
        return Err(PipelineError::InvalidClose {
            instrument_id: instrument_id.to_string(),
            date: bad.date,
            close: bad.close,
        });
    }
    Ok(())
}

/// Compute every indicator column for one instrument's observations.
///
/// `bars` must be date-ascending with unique dates (as produced by the price
/// store or the resampler).
pub fn compute_indicators(
    instrument_id: &str,
    bars: &[PriceObservation],
) -> Result<InstrumentSeries, PipelineError> {
    validate(instrument_id, bars)?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let close_col: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    let volumes: Vec<Option<f64>> = bars.iter().map(|b| b.volume).collect();

    let ret_1d = with_previous(&closes, |prev, close| {
        safe_ratio(Some(close), Some(prev)).map(|r| r - 1.0)
    });

    let sma_50 = rolling_mean(&close_col, SMA_FAST);
    let sma_200 = rolling_mean(&close_col, SMA_SLOW);
    let ema_20 = ema::calculate_ema(&closes, EMA_SPAN);
    let rsi_14 = rsi::calculate_rsi(&closes, RSI_PERIOD);
    let macd = macd::calculate(&closes);
    let atr_14 = atr::calculate_atr(bars, ATR_PERIOD);

    let annualise = TRADING_DAYS_PER_YEAR.sqrt();
    let vol_20: Vec<Option<f64>> = rolling_std(&ret_1d, VOLATILITY_WINDOW)
        .into_iter()
        .map(|s| s.map(|v| v * annualise))
        .collect();

    let high_252 = rolling_max(&close_col, HIGH_WINDOW);
    let peak_close = running_max(&closes);
    let vol_sma_20 = rolling_mean(&volumes, VOLUME_WINDOW);

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let dist_to_52w_high = safe_ratio(Some(bar.close), high_252[i]).map(|r| r - 1.0);
            // close > 0 is validated above, so the running peak is positive.
            let drawdown = bar.close / peak_close[i] - 1.0;

            IndicatorRow {
                instrument_id: instrument_id.to_string(),
                date: bar.date,
                close: bar.close,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                volume: bar.volume,
                source: bar.source.clone(),
                ret_1d: ret_1d[i],
                sma_50: sma_50[i],
                sma_200: sma_200[i],
                ema_20: ema_20[i],
                rsi_14: rsi_14[i],
                macd: macd.macd[i],
                macd_signal: macd.signal[i],
                macd_hist: macd.hist[i],
                atr_14: atr_14[i],
                vol_20: vol_20[i],
                high_252: high_252[i],
                dist_to_52w_high,
                peak_close: peak_close[i],
                drawdown,
                vol_sma_20: vol_sma_20[i],
                vol_spike: safe_ratio(bar.volume, vol_sma_20[i]),
                trend_long: TrendState::from_averages(sma_50[i], sma_200[i]),
                rsi_state: RsiState::from_rsi(rsi_14[i]),
            }
        })
        .collect();

    Ok(InstrumentSeries {
        instrument_id: instrument_id.to_string(),
        rows,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(closes: &[f64]) -> Vec<PriceObservation> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceObservation::new("TEST", start + Duration::days(i as i64), c))
            .collect()
    }

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.21).sin() * 12.0 + (i as f64 * 0.9).cos() * 3.0)
            .collect()
    }

    #[test]
    fn four_row_scenario() {
        let out = compute_indicators("TEST", &series(&[100.0, 110.0, 90.0, 95.0])).unwrap();
        let rows = &out.rows;
        assert_eq!(rows.len(), 4);

        assert!(rows[0].ret_1d.is_none());
        assert!((rows[1].ret_1d.unwrap() - 0.1).abs() < 1e-12);

        assert_eq!(rows[2].peak_close, 110.0);
        assert!((rows[2].drawdown - (90.0 / 110.0 - 1.0)).abs() < 1e-12);
        assert!((rows[2].drawdown + 0.181_818_181_8).abs() < 1e-9);

        for row in rows {
            assert!(row.sma_50.is_none());
            assert!(row.sma_200.is_none());
            assert!(row.rsi_14.is_none());
            assert!(row.atr_14.is_none());
            assert!(row.vol_sma_20.is_none());
            assert!(row.vol_spike.is_none());
            assert!(row.vol_20.is_none());
            assert!(row.high_252.is_none());
            assert_eq!(row.trend_long, TrendState::Down);
            assert_eq!(row.rsi_state, RsiState::Normal);
        }
        assert_eq!(rows[0].ema_20, 100.0);
        assert_eq!(rows[0].drawdown, 0.0);
    }

    #[test]
    fn drawdown_nonpositive_and_peak_nondecreasing() {
        let out = compute_indicators("TEST", &series(&wavy(400))).unwrap();
        for w in out.rows.windows(2) {
            assert!(w[1].peak_close >= w[0].peak_close);
        }
        for row in &out.rows {
            assert!(row.drawdown <= 0.0);
            if let Some(rsi) = row.rsi_14 {
                assert!((0.0..=100.0).contains(&rsi));
            }
        }
    }

    #[test]
    fn windows_fill_at_expected_rows() {
        let out = compute_indicators("TEST", &series(&wavy(260))).unwrap();
        let rows = &out.rows;
        assert!(rows[48].sma_50.is_none());
        assert!(rows[49].sma_50.is_some());
        assert!(rows[198].sma_200.is_none());
        assert!(rows[199].sma_200.is_some());
        assert!(rows[19].vol_20.is_none());
        assert!(rows[20].vol_20.is_some());
        assert!(rows[250].high_252.is_none());
        assert!(rows[251].high_252.is_some());
        assert!(rows[251].dist_to_52w_high.unwrap() <= 0.0);
    }

    #[test]
    fn uptrend_labels() {
        let closes: Vec<f64> = (0..220).map(|i| 50.0 + i as f64 * 0.5).collect();
        let out = compute_indicators("TEST", &series(&closes)).unwrap();
        let last = out.latest().unwrap();
        assert_eq!(last.trend_long, TrendState::Up);
        assert!(last.sma_50.unwrap() > last.sma_200.unwrap());
        // Monotonic gains: no losses, RSI undefined, label falls back.
        assert!(last.rsi_14.is_none());
        assert_eq!(last.rsi_state, RsiState::Normal);
    }

    #[test]
    fn downtrend_is_oversold() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let out = compute_indicators("TEST", &series(&closes)).unwrap();
        let last = out.latest().unwrap();
        assert_eq!(last.rsi_14, Some(0.0));
        assert_eq!(last.rsi_state, RsiState::Oversold);
    }

    #[test]
    fn volume_spike_when_volume_present() {
        let mut bars = series(&wavy(25));
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.volume = Some(if i == 24 { 3000.0 } else { 1000.0 });
        }
        let out = compute_indicators("TEST", &bars).unwrap();
        assert!(out.rows[18].vol_sma_20.is_none());
        assert_eq!(out.rows[19].vol_sma_20, Some(1000.0));
        assert_eq!(out.rows[19].vol_spike, Some(1.0));
        let spike = out.rows[24].vol_spike.unwrap();
        assert!((spike - 3000.0 / 1100.0).abs() < 1e-12);
    }

    #[test]
    fn zero_volume_average_gives_null_spike() {
        let mut bars = series(&wavy(20));
        for bar in bars.iter_mut() {
            bar.volume = Some(0.0);
        }
        let out = compute_indicators("TEST", &bars).unwrap();
        assert_eq!(out.rows[19].vol_sma_20, Some(0.0));
        assert!(out.rows[19].vol_spike.is_none());
    }

    #[test]
    fn atr_present_with_high_low() {
        let mut bars = series(&wavy(5));
        for bar in bars.iter_mut() {
            bar.high = Some(bar.close + 1.0);
            bar.low = Some(bar.close - 1.0);
        }
        let out = compute_indicators("TEST", &bars).unwrap();
        assert!(out.rows.iter().all(|r| r.atr_14.is_some()));
        assert_eq!(out.rows[0].atr_14, Some(2.0));
    }

    #[test]
    fn single_row_is_fine() {
        let out = compute_indicators("TEST", &series(&[42.0])).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].macd, 0.0);
        assert_eq!(out.rows[0].ret_1d, None);
        assert!(out.rows[0].rsi_14.is_none());
    }

    #[test]
    fn rejects_bad_series() {
        assert!(matches!(
            compute_indicators("TEST", &[]),
            Err(PipelineError::EmptySeries { .. })
        ));

        let mut bars = series(&[1.0, 2.0, 3.0]);
        bars.swap(0, 2);
        assert!(matches!(
            compute_indicators("TEST", &bars),
            Err(PipelineError::NonMonotonicDates { .. })
        ));

        let bars = series(&[1.0, f64::NAN, 3.0]);
        assert!(matches!(
            compute_indicators("TEST", &bars),
            Err(PipelineError::InvalidClose { .. })
        ));

        let bars = series(&[1.0, 0.0]);
        assert!(matches!(
            compute_indicators("TEST", &bars),
            Err(PipelineError::InvalidClose { .. })
        ));
    }

    #[test]
    fn rerun_is_identical() {
        let bars = series(&wavy(300));
        let a = compute_indicators("TEST", &bars).unwrap();
        let b = compute_indicators("TEST", &bars).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
