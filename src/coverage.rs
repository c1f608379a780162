// =============================================================================
// Coverage Auditor — freshness and history depth per instrument
// =============================================================================
//
// Status starts at OK and each rule in `CoverageParams::rules()` order may
// overwrite it, so a later rule wins when several apply. "Today" is the most
// recent date anywhere in the daily dataset, never the wall clock.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::indicators::InstrumentSeries;
use crate::market_data::company_master::cmp_company_names;
use crate::market_data::CompanyMaster;
use crate::runtime_config::CoverageParams;
use crate::types::CoverageStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    pub company_name: Option<String>,
    pub instrument_id: String,
    pub last_update: NaiveDate,
    pub days_of_data: usize,
    pub source: Option<String>,
    pub status: CoverageStatus,
}

/// One audit rule. Rules are applied in order to a mutable status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverageRule {
    /// `last_update < today - max_age_days` → STALE.
    Stale { max_age_days: i64 },
    /// `days_of_data < min_rows` → LOW_HISTORY.
    LowHistory { min_rows: usize },
}

impl CoverageRule {
    fn apply(&self, record: &CoverageRecord, today: NaiveDate) -> Option<CoverageStatus> {
        match *self {
            CoverageRule::Stale { max_age_days } => {
                (record.last_update < today - Duration::days(max_age_days))
                    .then_some(CoverageStatus::Stale)
            }
            CoverageRule::LowHistory { min_rows } => {
                (record.days_of_data < min_rows).then_some(CoverageStatus::LowHistory)
            }
        }
    }
}

impl CoverageParams {
    /// Rules in application order.
    pub fn rules(&self) -> Vec<CoverageRule> {
        vec![
            CoverageRule::Stale {
                max_age_days: self.max_staleness_days,
            },
            CoverageRule::LowHistory {
                min_rows: self.min_history_rows,
            },
        ]
    }
}

/// Audit every non-empty daily series.
pub fn audit_coverage(
    daily: &[InstrumentSeries],
    master: &CompanyMaster,
    params: &CoverageParams,
) -> Vec<CoverageRecord> {
    let Some(today) = daily.iter().filter_map(|s| s.latest()).map(|r| r.date).max() else {
        return Vec::new();
    };
    let rules = params.rules();

    let mut records: Vec<CoverageRecord> = daily
        .iter()
        .filter_map(|series| {
            let last = series.rows.iter().map(|r| r.date).max()?;
            let mut record = CoverageRecord {
                company_name: master.company_name(&series.instrument_id).map(str::to_string),
                instrument_id: series.instrument_id.clone(),
                last_update: last,
                days_of_data: series.rows.len(),
                source: series.rows.iter().rev().find_map(|r| r.source.clone()),
                status: CoverageStatus::Ok,
            };
            for rule in &rules {
                if let Some(status) = rule.apply(&record, today) {
                    record.status = status;
                }
            }
            Some(record)
        })
        .collect();

    records.sort_by(|a, b| {
        a.status
            .as_str()
            .cmp(b.status.as_str())
            .then_with(|| cmp_company_names(a.company_name.as_deref(), b.company_name.as_deref()))
            .then_with(|| a.instrument_id.cmp(&b.instrument_id))
    });

    let stale = records.iter().filter(|r| r.status == CoverageStatus::Stale).count();
    let low = records.iter().filter(|r| r.status == CoverageStatus::LowHistory).count();
    info!(
        instruments = records.len(),
        %today,
        stale,
        low_history = low,
        "coverage audited"
    );
    debug!(rules = ?rules, "coverage rules");

    records
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::compute_indicators;
    use crate::market_data::company_master::CompanyRecord;
    use crate::market_data::PriceObservation;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// `rows` consecutive days ending on `last`.
    fn series(id: &str, rows: i64, last: NaiveDate, source: Option<&str>) -> InstrumentSeries {
        let bars: Vec<_> = (0..rows)
            .map(|i| {
                let mut obs = PriceObservation::new(id, last - Duration::days(rows - 1 - i), 10.0);
                obs.source = source.map(str::to_string);
                obs
            })
            .collect();
        compute_indicators(id, &bars).unwrap()
    }

    fn names() -> CompanyMaster {
        CompanyMaster::from_records(
            [("AAA", "Alpha"), ("BBB", "Beta"), ("CCC", "Gamma")]
                .iter()
                .map(|(s, n)| CompanyRecord {
                    symbol: (*s).into(),
                    company_name: (*n).into(),
                }),
        )
    }

    #[test]
    fn short_history_is_low_history_even_when_fresh() {
        let today = d(2024, 6, 7);
        let daily = vec![series("AAA", 19, today, Some("cse"))];
        let report = audit_coverage(&daily, &names(), &CoverageParams::default());
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].days_of_data, 19);
        assert_eq!(report[0].last_update, today);
        assert_eq!(report[0].status, CoverageStatus::LowHistory);
    }

    #[test]
    fn old_last_update_is_stale() {
        let today = d(2024, 6, 7);
        let daily = vec![
            series("AAA", 40, today, None),
            series("BBB", 40, d(2024, 6, 4), None),
        ];
        let report = audit_coverage(&daily, &names(), &CoverageParams::default());
        let bbb = report.iter().find(|r| r.instrument_id == "BBB").unwrap();
        assert_eq!(bbb.status, CoverageStatus::Stale);
        let aaa = report.iter().find(|r| r.instrument_id == "AAA").unwrap();
        assert_eq!(aaa.status, CoverageStatus::Ok);
    }

    #[test]
    fn exactly_two_days_old_is_not_stale() {
        let daily = vec![
            series("AAA", 30, d(2024, 6, 7), None),
            series("BBB", 30, d(2024, 6, 5), None),
        ];
        let report = audit_coverage(&daily, &names(), &CoverageParams::default());
        assert!(report.iter().all(|r| r.status == CoverageStatus::Ok));
    }

    #[test]
    fn low_history_overrides_stale() {
        let daily = vec![
            series("AAA", 30, d(2024, 6, 7), None),
            series("BBB", 5, d(2024, 5, 1), None),
        ];
        let report = audit_coverage(&daily, &names(), &CoverageParams::default());
        let bbb = report.iter().find(|r| r.instrument_id == "BBB").unwrap();
        assert_eq!(bbb.status, CoverageStatus::LowHistory);
    }

    #[test]
    fn sorted_by_status_then_name() {
        let today = d(2024, 6, 7);
        let daily = vec![
            series("CCC", 30, today, None),
            series("AAA", 30, today, None),
            series("BBB", 3, today, None),
            series("ZZZ", 30, d(2024, 5, 1), None),
        ];
        let report = audit_coverage(&daily, &names(), &CoverageParams::default());
        let order: Vec<_> = report
            .iter()
            .map(|r| (r.status.as_str(), r.instrument_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("LOW_HISTORY", "BBB"),
                ("OK", "AAA"),
                ("OK", "CCC"),
                ("STALE", "ZZZ"),
            ]
        );
    }

    #[test]
    fn source_is_last_non_null_tag() {
        let last = d(2024, 6, 7);
        let mut bars: Vec<_> = (0..3)
            .map(|i| PriceObservation::new("AAA", last - Duration::days(2 - i), 10.0))
            .collect();
        bars[0].source = Some("old".into());
        bars[1].source = Some("cse".into());
        let daily = vec![compute_indicators("AAA", &bars).unwrap()];
        let report = audit_coverage(&daily, &names(), &CoverageParams::default());
        assert_eq!(report[0].source.as_deref(), Some("cse"));
    }

    #[test]
    fn thresholds_are_configurable() {
        let params = CoverageParams {
            max_staleness_days: 0,
            min_history_rows: 1,
        };
        let daily = vec![
            series("AAA", 3, d(2024, 6, 7), None),
            series("BBB", 3, d(2024, 6, 6), None),
        ];
        let report = audit_coverage(&daily, &names(), &params);
        assert_eq!(report[0].instrument_id, "AAA");
        assert_eq!(report[0].status, CoverageStatus::Ok);
        assert_eq!(report[1].status, CoverageStatus::Stale);
    }

    #[test]
    fn empty_input_gives_empty_report() {
        assert!(audit_coverage(&[], &names(), &CoverageParams::default()).is_empty());
    }
}
