// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations. Series functions return
// one value per input row, with `Option` marking rows where the indicator is
// not yet (or not at all) defined.

pub mod atr;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod rolling;
pub mod rsi;

pub use engine::{compute_indicators, IndicatorRow, InstrumentSeries};
