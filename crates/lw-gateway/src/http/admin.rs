//! Read-only admin surface — `GET /admin/projects/{user_id}` lists a
//! tenant's projects for support/ops lookups. Everything else an operator
//! needs (payment history, session archive state) is reached through the
//! store directly; this endpoint exists only because it's the one lookup
//! that's awkward to do by hand against the sqlite file.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use lw_core::types::UserId;

use crate::app::AppState;

pub async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let projects = state.store.list_projects_for_user(UserId(user_id)).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        )
    })?;

    Ok(Json(json!({ "user_id": user_id, "projects": projects })))
}
