use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health — liveness probe. Exercises a real store read so a wedged
/// database surfaces here rather than only on the next tenant request.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let active_projects = state.store.list_all_active_projects().map(|p| p.len()).unwrap_or(0);

    Json(json!({
        "status": "ok",
        "active_projects": active_projects,
    }))
}
