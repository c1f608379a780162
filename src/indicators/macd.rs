// =============================================================================
// MACD — Moving Average Convergence Divergence
// =============================================================================
//
//   macd   = EMA(12) - EMA(26)
//   signal = EMA(9) of macd
//   hist   = macd - signal
//
// All three EMAs are seeded by their first input, so every row has a value.

use super::ema::calculate_ema;

pub const FAST_SPAN: usize = 12;
pub const SLOW_SPAN: usize = 26;
pub const SIGNAL_SPAN: usize = 9;

/// Parallel MACD columns, one entry per close.
#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub hist: Vec<f64>,
}

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);
    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = calculate_ema(&macd, signal);
    let hist = macd
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    MacdSeries {
        macd,
        signal: signal_line,
        hist,
    }
}

/// Standard 12 / 26 / 9 MACD.
pub fn calculate(closes: &[f64]) -> MacdSeries {
    calculate_macd(closes, FAST_SPAN, SLOW_SPAN, SIGNAL_SPAN)
}
