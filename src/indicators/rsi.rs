// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Price deltas from consecutive closes (none for the first row).
// Step 2 — gain = max(delta, 0), loss = max(-delta, 0).
// Step 3 — Smooth both with an EWMA of alpha = 1 / period, seeded by the first
//          delta.
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// A zero average loss leaves RS undefined, so that row is null rather than
// 100. Rows before `period` deltas have accumulated are null as well.
// =============================================================================

use super::ema::{ewma, wilder_alpha};
use super::rolling::with_previous;

/// Compute the full RSI series, one entry per close.
///
/// # Edge cases
/// - `period == 0` => all null
/// - fewer than `period` deltas up to a row => null
/// - average loss of zero => null
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    let deltas = with_previous(closes, |prev, close| Some(close - prev));

    let gains: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|v| v.max(0.0))).collect();
    let losses: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|v| (-v).max(0.0))).collect();

    let alpha = wilder_alpha(period);
    let avg_gain = ewma(&gains, alpha);
    let avg_loss = ewma(&losses, alpha);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .enumerate()
        .map(|(i, (g, l))| {
            if i < period {
                return None;
            }
            rsi_from_averages((*g)?, (*l)?)
        })
        .collect()
}

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// Returns `None` when the average loss is zero or the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return None;
    }
    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - 100.0 / (1.0 + rs);
    rsi.is_finite().then(|| rsi.clamp(0.0, 100.0))
}
