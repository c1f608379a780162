// =============================================================================
// Composite Scorer — weekly trend + daily timing
// =============================================================================
//
// The score is a sum of independent signed integer terms. Each term is a
// predicate over possibly-null indicator values, and a null value makes the
// predicate false. Weekly terms contribute nothing when an instrument has no
// weekly snapshot.
//
//   weekly_trend     weekly sma_50 > sma_200            +3
//   close_above_sma  daily close > sma_50               +1
//   rsi_zone         daily rsi_14 in [40, 65]           +1
//   near_52w_high    weekly dist_to_52w_high > -0.25    +1
//   deep_drawdown    weekly drawdown < -0.35            -1
//   macd_positive    daily macd_hist > 0                +1

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorRow;
use crate::runtime_config::ScoringParams;

/// A term that fired, with its signed points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreContribution {
    pub name: String,
    pub points: i32,
}

/// Result of scoring one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub total: i32,
    pub contributions: Vec<ScoreContribution>,
}

fn gt(value: Option<f64>, threshold: f64) -> bool {
    matches!(value, Some(v) if v > threshold)
}

fn lt(value: Option<f64>, threshold: f64) -> bool {
    matches!(value, Some(v) if v < threshold)
}

fn within(value: Option<f64>, low: f64, high: f64) -> bool {
    matches!(value, Some(v) if v >= low && v <= high)
}

fn above(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

/// Stateless scorer over a parameter set.
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    params: ScoringParams,
}

impl CompositeScorer {
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }

    /// Score one instrument from its latest daily row and, when available,
    /// its latest weekly row.
    pub fn score(&self, daily: &IndicatorRow, weekly: Option<&IndicatorRow>) -> CompositeScore {
        let p = &self.params;

        let terms = [
            (
                "weekly_trend",
                weekly.map_or(false, |w| above(w.sma_50, w.sma_200)),
                p.weekly_trend_points,
            ),
            (
                "close_above_sma",
                above(Some(daily.close), daily.sma_50),
                p.close_above_sma_points,
            ),
            (
                "rsi_zone",
                within(daily.rsi_14, p.rsi_zone_low, p.rsi_zone_high),
                p.rsi_zone_points,
            ),
            (
                "near_52w_high",
                weekly.map_or(false, |w| gt(w.dist_to_52w_high, p.near_high_threshold)),
                p.near_high_points,
            ),
            (
                "deep_drawdown",
                weekly.map_or(false, |w| lt(Some(w.drawdown), p.deep_drawdown_threshold)),
                -p.deep_drawdown_penalty,
            ),
            (
                "macd_positive",
                gt(Some(daily.macd_hist), 0.0),
                p.macd_positive_points,
            ),
        ];

        let contributions: Vec<ScoreContribution> = terms
            .iter()
            .filter(|(_, fired, _)| *fired)
            .map(|(name, _, points)| ScoreContribution {
                name: (*name).to_string(),
                points: *points,
            })
            .collect();

        CompositeScore {
            total: contributions.iter().map(|c| c.points).sum(),
            contributions,
        }
    }
}
