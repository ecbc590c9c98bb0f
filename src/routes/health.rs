use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "menus": state.menus.status().await.mode,
        "reservations": state.reservations.status().await.mode,
    }))
}
