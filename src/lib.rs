pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod liquidation;
pub mod metrics;
pub mod models;
pub mod pricing;
pub mod risk;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::analytics::RiskSnapshotRecorder;
use crate::api::rate_limit::RateLimiter;
use crate::api::ws_types::WsMessage;
use crate::config::AppConfig;
use crate::liquidation::LiquidationPipeline;
use crate::pricing::PriceResolver;
use crate::services::{BlockIndexer, ContractsMonitor};
use crate::store::{EventStore, PositionStore, SnapshotStore};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub positions: Arc<dyn PositionStore>,
    pub pipeline: Arc<LiquidationPipeline>,
    pub recorder: Arc<RiskSnapshotRecorder>,
    pub indexer: Arc<BlockIndexer>,
    pub monitor: Arc<ContractsMonitor>,
    pub rate_limiter: Arc<RateLimiter>,
    pub ws_tx: broadcast::Sender<WsMessage>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    pub started_at: Instant,
}

impl AppState {
    /// Wire every service on top of one store and one price resolver.
    pub fn new<S>(
        config: AppConfig,
        store: Arc<S>,
        prices: Arc<dyn PriceResolver>,
        metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self
    where
        S: PositionStore + SnapshotStore + EventStore + 'static,
    {
        let positions: Arc<dyn PositionStore> = store.clone();
        let snapshots: Arc<dyn SnapshotStore> = store.clone();
        let events: Arc<dyn EventStore> = store;

        let mut pipeline = LiquidationPipeline::new(positions.clone(), prices)
            .with_liquidation_threshold(config.liquidation_threshold)
            .with_collaborator_timeout(config.collaborator_timeout);
        if !config.execution_lease_enabled {
            pipeline = pipeline.without_execution_lease();
        }
        let pipeline = Arc::new(pipeline);

        let recorder = Arc::new(RiskSnapshotRecorder::new(pipeline.clone(), snapshots));
        let indexer = Arc::new(BlockIndexer::new(events));
        let monitor = Arc::new(ContractsMonitor::new(indexer.clone(), config.monitor_poll_interval));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_per_minute,
            config.rate_limit_per_hour,
        ));
        let (ws_tx, _) = broadcast::channel::<WsMessage>(256);

        Self {
            config,
            positions,
            pipeline,
            recorder,
            indexer,
            monitor,
            rate_limiter,
            ws_tx,
            metrics_handle,
            started_at: Instant::now(),
        }
    }
}
