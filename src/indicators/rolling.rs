// =============================================================================
// Trailing-window statistics
// =============================================================================
//
// Every function returns one output per input row. A window only produces a
// value once it holds `window` non-null inputs; any null inside the window
// makes that row null. Windows count rows, not calendar days.

/// Return the trailing window ending at `idx` when it is fully populated.
fn full_window(values: &[Option<f64>], idx: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || idx + 1 < window {
        return None;
    }
    values[idx + 1 - window..=idx].iter().copied().collect()
}

/// Simple moving average over the trailing `window` rows.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let w = full_window(values, i, window)?;
            Some(w.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Sample standard deviation (n - 1 denominator) over the trailing `window`
/// rows. Windows shorter than two rows never produce a value.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window < 2 {
                return None;
            }
            let w = full_window(values, i, window)?;
            let n = window as f64;
            let mean = w.iter().sum::<f64>() / n;
            let var = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
            Some(var.sqrt())
        })
        .collect()
}

/// Maximum over the trailing `window` rows.
pub fn rolling_max(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let w = full_window(values, i, window)?;
            w.into_iter().reduce(f64::max)
        })
        .collect()
}

/// Running (non-decreasing) maximum from the first row.
pub fn running_max(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            peak = peak.max(v);
            peak
        })
        .collect()
}

/// Apply `f(previous, current)` to each row; the first row has no previous
/// value and is null. One output per input.
pub fn with_previous(values: &[f64], f: impl Fn(f64, f64) -> Option<f64>) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| if i == 0 { None } else { f(values[i - 1], values[i]) })
        .collect()
}

/// `numerator / denominator`, null when either side is null or the
/// denominator is zero.
pub fn safe_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => {
            let r = n / d;
            r.is_finite().then_some(r)
        }
        _ => None,
    }
}
