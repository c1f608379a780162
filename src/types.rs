// =============================================================================
// Shared types used across the signal pipeline
// =============================================================================

use serde::{Deserialize, Serialize};

/// Long-term trend label derived from the SMA-50 / SMA-200 comparison.
///
/// There is no "unknown" state: a missing moving average makes the comparison
/// false, which lands on `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendState {
    Down,
    Up,
}

impl TrendState {
    pub fn from_averages(sma_fast: Option<f64>, sma_slow: Option<f64>) -> Self {
        match (sma_fast, sma_slow) {
            (Some(fast), Some(slow)) if fast > slow => Self::Up,
            _ => Self::Down,
        }
    }
}

impl std::fmt::Display for TrendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

/// RSI zone label. A missing RSI falls through to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RsiState {
    Overbought,
    Oversold,
    Normal,
}

impl RsiState {
    pub fn from_rsi(rsi: Option<f64>) -> Self {
        match rsi {
            Some(v) if v >= 70.0 => Self::Overbought,
            Some(v) if v <= 30.0 => Self::Oversold,
            _ => Self::Normal,
        }
    }
}

impl std::fmt::Display for RsiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overbought => write!(f, "OVERBOUGHT"),
            Self::Oversold => write!(f, "OVERSOLD"),
            Self::Normal => write!(f, "NORMAL"),
        }
    }
}

/// Data-health label assigned by the coverage auditor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageStatus {
    Ok,
    Stale,
    LowHistory,
}

impl CoverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Stale => "STALE",
            Self::LowHistory => "LOW_HISTORY",
        }
    }
}

impl Default for CoverageStatus {
    fn default() -> Self {
        Self::Ok
    }
}

impl std::fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bar frequency of an indicator series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "d" => Ok(Self::Daily),
            "weekly" | "w" => Ok(Self::Weekly),
            other => Err(format!("unknown frequency '{other}' (expected daily or weekly)")),
        }
    }
}
