use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /sync/status — drives the degraded-mode banner
pub async fn get_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "menus": state.menus.status().await,
        "reservations": state.reservations.status().await,
    }))
}

/// DELETE /sync/error — dismiss the banner
pub async fn dismiss_error(State(state): State<AppState>) -> StatusCode {
    state.menus.clear_error().await;
    state.reservations.clear_error().await;
    StatusCode::NO_CONTENT
}
