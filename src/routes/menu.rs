use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    error::StoreError,
    middleware::admin::AdminSession,
    models::menu::{DailyMenu, MenuQuery, PublishMenuRequest, UpdateMenuRequest},
    services::{sync::Snapshot, today},
    AppState,
};

/// GET /menus/today — what can be booked right now
pub async fn get_today(State(state): State<AppState>) -> Json<Snapshot<Option<DailyMenu>>> {
    Json(state.menus.fetch_today_menu(today()).await)
}

/// GET /menus?date=YYYY-MM-DD — one date, or every menu when no date is given
pub async fn get_menus(
    State(state): State<AppState>,
    Query(params): Query<MenuQuery>,
) -> Response {
    match params.date {
        Some(date) => Json(state.menus.fetch_menu_for_date(date).await).into_response(),
        None => Json(state.menus.fetch_all_menus().await).into_response(),
    }
}

/// PUT /menus — admin only; replaces the menu already published for that date
pub async fn publish_menu(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(body): Json<PublishMenuRequest>,
) -> Result<Json<DailyMenu>, StoreError> {
    state.menus.publish_menu(&body).await.map(Json)
}

/// PATCH /menus/{id} — admin only
pub async fn update_menu(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMenuRequest>,
) -> Result<Json<DailyMenu>, StoreError> {
    state.menus.update_menu(id, &body).await.map(Json)
}

/// DELETE /menus/{id} — admin only
pub async fn delete_menu(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StoreError> {
    if state.menus.delete_menu(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StoreError::not_found("menu", id))
    }
}
