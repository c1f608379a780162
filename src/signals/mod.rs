// =============================================================================
// Signals Module
// =============================================================================
//
// Composite scoring of the latest daily + weekly indicator snapshots and the
// ranked watchlist built from it.

pub mod composite_score;
pub mod watchlist;

pub use composite_score::CompositeScorer;
pub use watchlist::{build_watchlist, WatchlistEntry};
