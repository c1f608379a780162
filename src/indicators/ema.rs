// =============================================================================
// Exponential Moving Average (EMA / EWMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Recurrence:
//   y_0 = x_0
//   y_t = alpha * x_t + (1 - alpha) * y_{t-1}
//
// Span-based EMA uses alpha = 2 / (span + 1). Wilder smoothing (RSI, ATR) uses
// alpha = 1 / period. The recurrence is seeded with the first value, so the
// output is defined from the first row.
// =============================================================================

/// Smoothing factor for a span-based EMA.
pub fn span_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Smoothing factor for Wilder-style smoothing.
pub fn wilder_alpha(period: usize) -> f64 {
    1.0 / period.max(1) as f64
}

/// EWMA over a series that may contain gaps.
///
/// The recurrence starts at the first non-null input. A null input produces a
/// null output and leaves the smoothing state where it was, so the next
/// defined input continues from the last defined average.
pub fn ewma(values: &[Option<f64>], alpha: f64) -> Vec<Option<f64>> {
    let mut state: Option<f64> = None;
    values
        .iter()
        .map(|value| {
            let x = (*value)?;
            let next = match state {
                None => x,
                Some(prev) => alpha * x + (1.0 - alpha) * prev,
            };
            state = Some(next);
            Some(next)
        })
        .collect()
}

/// Compute the EMA series for a dense series and the given `span`.
///
/// One output per input; empty input gives an empty output.
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    let dense: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    // Dense input never hits a gap, so every row is defined.
    ewma(&dense, span_alpha(span)).into_iter().flatten().collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_seeded_by_first_value() {
        let ema = calculate_ema(&[10.0, 20.0], 20);
        assert_eq!(ema[0], 10.0);
        let alpha = 2.0 / 21.0;
        assert!((ema[1] - (alpha * 20.0 + (1.0 - alpha) * 10.0)).abs() < 1e-12);
    }

    #[test]
    fn ema_known_values() {
        // span 5 => alpha = 1/3
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = calculate_ema(&closes, 5);
        assert_eq!(ema.len(), closes.len());

        let mut expected = closes[0];
        for (i, &c) in closes.iter().enumerate().skip(1) {
            expected = c / 3.0 + expected * (2.0 / 3.0);
            assert!((ema[i] - expected).abs() < 1e-10, "row {i}");
        }
    }

    #[test]
    fn ema_of_flat_series_is_flat() {
        let ema = calculate_ema(&[42.0; 30], 12);
        assert!(ema.iter().all(|&v| (v - 42.0).abs() < 1e-12));
    }

    #[test]
    fn ewma_starts_at_first_defined_value() {
        let out = ewma(&[None, Some(4.0), Some(8.0)], 0.5);
        assert_eq!(out, vec![None, Some(4.0), Some(6.0)]);
    }

    #[test]
    fn ewma_gap_keeps_state() {
        let out = ewma(&[Some(4.0), None, Some(8.0)], 0.5);
        assert_eq!(out, vec![Some(4.0), None, Some(6.0)]);
    }

    #[test]
    fn alphas() {
        assert!((span_alpha(9) - 0.2).abs() < 1e-12);
        assert!((wilder_alpha(14) - 1.0 / 14.0).abs() < 1e-12);
    }
}
