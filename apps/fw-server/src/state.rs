use fw_alert::AlertEmitter;
use fw_drift::ThresholdConfig;
use fw_store::Store;
use std::sync::Arc;

/// Shared handle threaded through every handler via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub thresholds: ThresholdConfig,
    pub alerts: Arc<AlertEmitter>,
}
