// =============================================================================
// Weekly Resampler
// =============================================================================
//
// Buckets daily observations into weeks ending on Friday (Saturday..Friday)
// and keeps the last observation of each bucket. Every column, close included,
// is sampled from that last row; there is no OHLC aggregation. The emitted row
// is dated with the week-ending Friday. Empty weeks are never synthesised.

use chrono::{Datelike, Duration, NaiveDate};

use crate::market_data::PriceObservation;

/// Friday that closes the week containing `date`.
pub fn week_ending_friday(date: NaiveDate) -> NaiveDate {
    // Monday = 0 .. Sunday = 6; Friday = 4.
    let from_monday = date.weekday().num_days_from_monday() as i64;
    let ahead = (4 - from_monday).rem_euclid(7);
    date + Duration::days(ahead)
}

/// Resample a date-ascending daily series to weekly bars.
pub fn to_weekly(daily: &[PriceObservation]) -> Vec<PriceObservation> {
    let mut weekly: Vec<PriceObservation> = Vec::new();

    for obs in daily {
        let week_end = week_ending_friday(obs.date);
        let mut bar = obs.clone();
        bar.date = week_end;

        match weekly.last_mut() {
            Some(last) if last.date == week_end => *last = bar,
            _ => weekly.push(bar),
        }
    }

    weekly
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::compute_indicators;
    use crate::market_data::{CompanyMaster, PriceStore};
    use crate::pipeline::run_pipeline;
    use crate::runtime_config::RuntimeConfig;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn friday_anchor() {
        // 2024-03-08 is a Friday.
        assert_eq!(week_ending_friday(d(2024, 3, 4)), d(2024, 3, 8)); // Mon
        assert_eq!(week_ending_friday(d(2024, 3, 8)), d(2024, 3, 8)); // Fri
        assert_eq!(week_ending_friday(d(2024, 3, 9)), d(2024, 3, 15)); // Sat
        assert_eq!(week_ending_friday(d(2024, 3, 10)), d(2024, 3, 15)); // Sun
    }

    #[test]
    fn last_row_of_week_wins() {
        let mut mon = PriceObservation::new("AAA", d(2024, 3, 4), 10.0);
        mon.volume = Some(100.0);
        let mut wed = PriceObservation::new("AAA", d(2024, 3, 6), 12.0);
        wed.volume = Some(300.0);
        wed.high = Some(12.5);
        let next_tue = PriceObservation::new("AAA", d(2024, 3, 12), 11.0);

        let weekly = to_weekly(&[mon, wed, next_tue]);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].date, d(2024, 3, 8));
        assert_eq!(weekly[0].close, 12.0);
        assert_eq!(weekly[0].volume, Some(300.0));
        assert_eq!(weekly[0].high, Some(12.5));
        assert_eq!(weekly[1].date, d(2024, 3, 15));
        assert_eq!(weekly[1].close, 11.0);
    }

    #[test]
    fn empty_weeks_are_dropped() {
        let a = PriceObservation::new("AAA", d(2024, 3, 4), 10.0);
        let b = PriceObservation::new("AAA", d(2024, 3, 25), 9.0);
        let weekly = to_weekly(&[a, b]);
        let dates: Vec<_> = weekly.iter().map(|w| w.date).collect();
        assert_eq!(dates, vec![d(2024, 3, 8), d(2024, 3, 29)]);
    }

    #[test]
    fn weekly_dates_strictly_increase() {
        let start = d(2023, 1, 2);
        let daily: Vec<_> = (0..200)
            .filter(|i| i % 7 < 5)
            .map(|i| PriceObservation::new("AAA", start + Duration::days(i), 50.0 + i as f64))
            .collect();
        let weekly = to_weekly(&daily);
        assert!(weekly.windows(2).all(|w| w[0].date < w[1].date));
        assert!(weekly.iter().all(|w| w.date.weekday() == chrono::Weekday::Fri));
    }

    #[test]
    fn latest_weekly_matches_direct_computation() {
        let start = d(2022, 1, 3);
        let daily: Vec<_> = (0..600)
            .filter(|i| i % 7 < 5)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.05).sin() * 20.0 + i as f64 * 0.02;
                PriceObservation::new("AAA", start + Duration::days(i), c)
            })
            .collect();

        let mut store = PriceStore::new();
        store.ingest_all(daily.clone());
        let config = RuntimeConfig {
            parallel: false,
            ..RuntimeConfig::default()
        };
        let out = run_pipeline(&store, &CompanyMaster::default(), &config).unwrap();

        let direct = compute_indicators("AAA", &to_weekly(&daily)).unwrap();
        assert_eq!(out.latest_weekly.len(), 1);
        assert_eq!(&out.latest_weekly[0], direct.rows.last().unwrap());
        assert_eq!(out.latest_weekly[0].close, daily.last().unwrap().close);
    }
}
