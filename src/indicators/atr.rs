// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
// The first bar has no previous close, so its TR is H - L.
//
// ATR is the EWMA of TR with alpha = 1 / period, seeded by the first TR.
// Bars without both high and low have no TR; they produce a null ATR and do
// not move the average.
// =============================================================================

use crate::market_data::PriceObservation;

use super::ema::{ewma, wilder_alpha};

/// True range per bar, `None` where high or low is missing.
pub fn true_range(bars: &[PriceObservation]) -> Vec<Option<f64>> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let (high, low) = (bar.high?, bar.low?);
            let hl = high - low;
            match i.checked_sub(1).map(|p| bars[p].close) {
                Some(prev_close) => {
                    let hc = (high - prev_close).abs();
                    let lc = (low - prev_close).abs();
                    Some(hl.max(hc).max(lc))
                }
                None => Some(hl),
            }
        })
        .collect()
}

/// Compute the ATR series, one entry per bar.
pub fn calculate_atr(bars: &[PriceObservation], period: usize) -> Vec<Option<f64>> {
    ewma(&true_range(bars), wilder_alpha(period))
}
