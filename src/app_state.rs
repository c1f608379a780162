// =============================================================================
// Application State — shared by the API handlers
// =============================================================================
//
// Holds the runtime configuration and the tables of the most recent pipeline
// run. Each run is published whole as an `Arc<PipelineOutput>`, so a handler
// either sees the previous tables or the new ones, never a mix.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the swappable pieces.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::pipeline::PipelineOutput;
use crate::runtime_config::RuntimeConfig;

/// The last failed refresh, shown by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

pub struct AppState {
    /// Incremented every time a new pipeline output is published.
    pub state_version: AtomicU64,

    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    output: RwLock<Option<Arc<PipelineOutput>>>,
    last_error: RwLock<Option<ErrorRecord>>,

    /// Serialises refreshes so two pipeline runs never race to publish.
    pub refresh_lock: tokio::sync::Mutex<()>,

    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            state_version: AtomicU64::new(0),
            runtime_config: Arc::new(RwLock::new(config)),
            output: RwLock::new(None),
            last_error: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    /// Tables of the latest successful run, if any.
    pub fn output(&self) -> Option<Arc<PipelineOutput>> {
        self.output.read().clone()
    }

    /// Swap in a new run and clear any recorded refresh error. Returns the new
    /// version.
    pub fn publish(&self, output: PipelineOutput) -> u64 {
        *self.output.write() = Some(Arc::new(output));
        *self.last_error.write() = None;
        self.state_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Remember a failed refresh. The previously published tables stay live.
    pub fn record_error(&self, message: String) {
        *self.last_error.write() = Some(ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        });
    }

    pub fn last_error(&self) -> Option<ErrorRecord> {
        self.last_error.read().clone()
    }

    pub fn config(&self) -> RuntimeConfig {
        self.runtime_config.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::{CompanyMaster, PriceStore};
    use crate::pipeline::run_pipeline;

    fn empty_output() -> PipelineOutput {
        run_pipeline(&PriceStore::new(), &CompanyMaster::default(), &RuntimeConfig::default())
            .unwrap()
    }

    #[test]
    fn publish_bumps_version_and_clears_error() {
        let state = AppState::new(RuntimeConfig::default());
        assert_eq!(state.current_state_version(), 0);
        assert!(state.output().is_none());

        state.record_error("boom".into());
        assert!(state.last_error().is_some());

        assert_eq!(state.publish(empty_output()), 1);
        assert_eq!(state.current_state_version(), 1);
        assert!(state.output().is_some());
        assert!(state.last_error().is_none());
    }

    #[test]
    fn failed_refresh_keeps_previous_tables() {
        let state = AppState::new(RuntimeConfig::default());
        state.publish(empty_output());
        let before = state.output().map(|o| o.digest.clone());
        state.record_error("raw file vanished".into());
        assert_eq!(state.output().map(|o| o.digest.clone()), before);
        assert_eq!(state.current_state_version(), 1);
    }
}
