// =============================================================================
// Watchlist — join, score, rank, truncate
// =============================================================================
//
// Daily snapshot rows drive the join; weekly snapshot rows are looked up by
// instrument id. Ordering is score descending, then trend_long descending
// (UP before DOWN), then company name ascending with unnamed instruments last,
// then instrument id so the order is total. Presentation rounding happens
// after ranking and never feeds it.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::IndicatorRow;
use crate::market_data::company_master::cmp_company_names;
use crate::market_data::CompanyMaster;
use crate::snapshot::index_by_instrument;
use crate::types::{RsiState, TrendState};

use super::composite_score::{CompositeScorer, ScoreContribution};

/// One ranked watchlist row, presentation-ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub rank: usize,
    pub company_name: Option<String>,
    pub instrument_id: String,
    pub date: NaiveDate,
    pub close: f64,
    pub score: i32,
    pub trend_long: TrendState,
    pub weekly_trend_long: Option<TrendState>,
    pub rsi_14: Option<f64>,
    pub rsi_state: RsiState,
    pub macd_hist: f64,
    /// Percent.
    pub dist_to_52w_high: Option<f64>,
    /// Percent.
    pub drawdown: f64,
    /// Percent, annualised.
    pub vol_20: Option<f64>,
    pub score_breakdown: Vec<ScoreContribution>,
}

/// Round to 2 decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fraction → percent, 2 decimals.
pub fn as_percent(value: f64) -> f64 {
    round2(value * 100.0)
}

/// Unrounded candidate used for ranking.
struct Candidate<'a> {
    daily: &'a IndicatorRow,
    weekly: Option<&'a IndicatorRow>,
    company_name: Option<&'a str>,
    score: i32,
    breakdown: Vec<ScoreContribution>,
}

fn rank_order(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.daily.trend_long.cmp(&a.daily.trend_long))
        .then_with(|| cmp_company_names(a.company_name, b.company_name))
        .then_with(|| a.daily.instrument_id.cmp(&b.daily.instrument_id))
}

/// Score every daily snapshot row and return the top `limit` entries.
pub fn build_watchlist(
    daily_latest: &[IndicatorRow],
    weekly_latest: &[IndicatorRow],
    master: &CompanyMaster,
    scorer: &CompositeScorer,
    limit: usize,
) -> Vec<WatchlistEntry> {
    let weekly_by_id = index_by_instrument(weekly_latest);

    let mut candidates: Vec<Candidate<'_>> = daily_latest
        .iter()
        .map(|daily| {
            let weekly = weekly_by_id.get(daily.instrument_id.as_str()).copied();
            let scored = scorer.score(daily, weekly);
            Candidate {
                daily,
                weekly,
                company_name: master.company_name(&daily.instrument_id),
                score: scored.total,
                breakdown: scored.contributions,
            }
        })
        .collect();

    candidates.sort_by(rank_order);

    debug!(
        scored = candidates.len(),
        limit,
        top_score = candidates.first().map(|c| c.score),
        "watchlist ranked"
    );

    candidates
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, c)| WatchlistEntry {
            rank: i + 1,
            company_name: c.company_name.map(str::to_string),
            instrument_id: c.daily.instrument_id.clone(),
            date: c.daily.date,
            close: round2(c.daily.close),
            score: c.score,
            trend_long: c.daily.trend_long,
            weekly_trend_long: c.weekly.map(|w| w.trend_long),
            rsi_14: c.daily.rsi_14.map(round2),
            rsi_state: c.daily.rsi_state,
            macd_hist: round2(c.daily.macd_hist),
            dist_to_52w_high: c.daily.dist_to_52w_high.map(as_percent),
            drawdown: as_percent(c.daily.drawdown),
            vol_20: c.daily.vol_20.map(as_percent),
            score_breakdown: c.breakdown,
        })
        .collect()
}
