use std::sync::Arc;

use iotgw_core::{HistoryBuffer, RuleEngine, RuleSet};
use iotgw_events::AlertDispatcher;

use crate::config::ServerConfig;
use crate::ingest::Ingestor;
use crate::ws::Hub;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every field is behind `Arc` or is a channel handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Broadcast hub for live-feed sessions.
    pub hub: Hub,
    /// Recent points, replayed to new observers.
    pub history: Arc<HistoryBuffer>,
    /// The parse, store, check, broadcast pipeline.
    pub ingestor: Arc<Ingestor>,
}

impl AppState {
    /// Wire the pipeline for `config` and `rules`.
    ///
    /// Spawns the hub, so this must run inside a Tokio runtime.
    pub fn new(config: ServerConfig, rules: RuleSet) -> Self {
        let hub = Hub::spawn();
        let history = Arc::new(HistoryBuffer::new(config.history_capacity));
        let dispatcher = AlertDispatcher::new().with_sink(Arc::new(hub.clone()));
        let ingestor = Ingestor::new(
            Arc::clone(&history),
            RuleEngine::new(rules),
            dispatcher,
            hub.clone(),
        );

        Self {
            config: Arc::new(config),
            hub,
            history,
            ingestor: Arc::new(ingestor),
        }
    }
}
