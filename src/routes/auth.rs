use axum::{extract::State, Json};

use crate::{
    error::StoreError,
    models::auth::{LoginRequest, SessionState},
    AppState,
};

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionState>, StoreError> {
    if state.session.login(&body.password).await {
        Ok(Json(state.session.state().await))
    } else {
        Err(StoreError::InvalidCredentials)
    }
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>) -> Json<SessionState> {
    state.session.logout().await;
    Json(state.session.state().await)
}

/// GET /auth/session
pub async fn session(State(state): State<AppState>) -> Json<SessionState> {
    Json(state.session.state().await)
}
