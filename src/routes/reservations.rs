use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::StoreError,
    middleware::admin::AdminSession,
    models::reservation::{
        CreateReservationRequest, PaymentStatusRequest, Reservation, ReservationQuery,
    },
    services::{export::reservations_csv, reservation::ReservationService, today},
    AppState,
};

/// POST /reservations — diners book a lunch for a date that has a menu
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(body): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), StoreError> {
    body.validate()?;

    let date = body.date.unwrap_or_else(today);
    if state.menus.fetch_menu_for_date(date).await.data.is_none() {
        return Err(StoreError::Conflict(format!(
            "no menu published for {date}"
        )));
    }

    let reservation = state.reservations.add_reservation(&body).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /reservations/{id} — confirmation view
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, StoreError> {
    state.reservations.get_reservation(id).await.map(Json)
}

/// GET /admin/reservations?date=YYYY-MM-DD — bookings for a day (today by default) with totals
pub async fn list_reservations(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(params): Query<ReservationQuery>,
) -> Json<Value> {
    let date = params.date.unwrap_or_else(today);
    let snapshot = state.reservations.fetch_reservations(Some(date)).await;
    let stats = ReservationService::compute_stats(&snapshot.data);

    Json(json!({
        "date": date,
        "reservations": snapshot.data,
        "stats": stats,
        "sync": snapshot.sync,
        "fromSample": snapshot.from_sample,
    }))
}

/// GET /admin/reservations/export?date=YYYY-MM-DD — CSV for the spreadsheet; every booking without a date
pub async fn export_reservations(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(params): Query<ReservationQuery>,
) -> Result<Response, StoreError> {
    let (reservations, filename) = match params.date {
        Some(date) => (
            state.reservations.list_reservations_for_date(date).await,
            format!("reservations-{date}.csv"),
        ),
        None => (
            state.reservations.list_all_reservations().await,
            "reservations.csv".to_string(),
        ),
    };
    let body = reservations_csv(&reservations)?;

    Ok((
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// PUT /admin/reservations/{id}/payment
pub async fn set_payment_status(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentStatusRequest>,
) -> Result<Json<Reservation>, StoreError> {
    state
        .reservations
        .set_payment_status(id, body.is_paid)
        .await
        .map(Json)
}

/// POST /admin/reservations/{id}/toggle-payment
pub async fn toggle_payment_status(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, StoreError> {
    state.reservations.toggle_payment_status(id).await.map(Json)
}

/// DELETE /admin/reservations/{id}
pub async fn delete_reservation(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StoreError> {
    if state.reservations.delete_reservation(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StoreError::not_found("reservation", id))
    }
}
