use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use lw_history::HistoryExtractor;
use lw_monitor::MonitorEngine;
use lw_payments::PaymentBridge;
use lw_store::Store;
use lw_tariff::TariffChecker;

/// Central shared state, passed as `Arc<AppState>` to every handler.
pub struct AppState {
    pub store: Arc<Store>,
    pub tariff_checker: Arc<TariffChecker>,
    pub payment_bridge: Arc<PaymentBridge>,
    pub history_extractor: Arc<HistoryExtractor>,
    pub monitor: Arc<MonitorEngine>,
    pub support_link: String,
}

/// Assemble the full Axum router (spec §6's inbound HTTP webhook, plus the
/// liveness and admin JSON surfaces any deployed service of this shape
/// carries).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/tracking/payment/notification",
            post(crate::http::payment::payment_webhook_handler),
        )
        .route("/admin/projects/{user_id}", get(crate::http::admin::list_projects_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
