pub mod auth;
pub mod health;
pub mod menu;
pub mod metrics;
pub mod reservations;
pub mod sync;
pub mod websocket;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Every endpoint of the API. CORS is layered on by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Menus
        .route("/menus/today", get(menu::get_today))
        .route("/menus", get(menu::get_menus).put(menu::publish_menu))
        .route("/menus/{id}", patch(menu::update_menu).delete(menu::delete_menu))
        // Reservations
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations/{id}", get(reservations::get_reservation))
        .route("/admin/reservations", get(reservations::list_reservations))
        .route("/admin/reservations/export", get(reservations::export_reservations))
        .route("/admin/reservations/{id}", delete(reservations::delete_reservation))
        .route("/admin/reservations/{id}/payment", put(reservations::set_payment_status))
        .route("/admin/reservations/{id}/toggle-payment", post(reservations::toggle_payment_status))
        // Admin session
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session))
        // Sync banner
        .route("/sync/status", get(sync::get_status))
        .route("/sync/error", delete(sync::dismiss_error))
        // WebSocket
        .route("/ws", get(websocket::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, services::today};

    fn app() -> Router {
        let state = AppState::in_memory(Config::default()).unwrap();
        router(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn login(app: &Router) {
        let (status, body) =
            send_json(app, "POST", "/auth/login", Some(json!({ "password": "admin123" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "isAdmin": true }));
    }

    async fn publish_today(app: &Router) -> Value {
        let (status, menu) = send_json(
            app,
            "PUT",
            "/menus",
            Some(json!({
                "date": today(),
                "name": "Curry rice",
                "description": "Beef curry with pickles and salad",
                "price": 850,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        menu
    }

    #[tokio::test]
    async fn lunch_day_end_to_end() {
        let app = app();
        login(&app).await;
        let menu = publish_today(&app).await;

        let (status, today_menu) = send_json(&app, "GET", "/menus/today", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(today_menu["data"], menu);
        assert_eq!(today_menu["fromSample"], json!(false));

        let (status, booked) = send_json(
            &app,
            "POST",
            "/reservations",
            Some(json!({ "name": "  Ken Suzuki ", "roomNumber": "305" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(booked["name"], "Ken Suzuki");
        assert_eq!(booked["isPaid"], json!(false));
        let id = booked["id"].as_str().unwrap().to_string();

        let (status, confirmation) = send_json(&app, "GET", &format!("/reservations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmation, booked);

        let (status, _) = send_json(
            &app,
            "PUT",
            &format!("/admin/reservations/{id}/payment"),
            Some(json!({ "isPaid": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, listing) = send_json(&app, "GET", "/admin/reservations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["stats"], json!({ "total": 1, "paid": 1, "unpaid": 0 }));
        assert_eq!(listing["sync"]["mode"], "local_only");

        let (status, toggled) = send_json(
            &app,
            "POST",
            &format!("/admin/reservations/{id}/toggle-payment"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["isPaid"], json!(false));

        let (status, csv) = send(&app, "GET", "/admin/reservations/export", None).await;
        assert_eq!(status, StatusCode::OK);
        let csv = String::from_utf8(csv).unwrap();
        assert!(csv.contains("Ken Suzuki"));
        assert!(csv.contains("305"));

        let (status, _) = send(&app, "DELETE", &format!("/admin/reservations/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "DELETE", &format!("/admin/reservations/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "GET", &format!("/reservations/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn one_paid_booking_for_a_dated_menu() {
        let app = app();
        login(&app).await;

        let (status, menu) = send_json(
            &app,
            "PUT",
            "/menus",
            Some(json!({
                "date": "2024-06-01",
                "name": "Set A",
                "description": "Grilled fish, rice and miso soup",
                "price": 800,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(menu["date"], "2024-06-01");
        assert_eq!(menu["price"], 800);

        let (status, booked) = send_json(
            &app,
            "POST",
            "/reservations",
            Some(json!({ "name": "Taro", "roomNumber": "101", "date": "2024-06-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = booked["id"].as_str().unwrap().to_string();

        let (status, listing) =
            send_json(&app, "GET", "/admin/reservations?date=2024-06-01", None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = listing["reservations"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], id.as_str());
        assert_eq!(rows[0]["name"], "Taro");
        assert_eq!(rows[0]["roomNumber"], "101");
        assert_eq!(rows[0]["isPaid"], json!(false));

        let (status, paid) = send_json(
            &app,
            "PUT",
            &format!("/admin/reservations/{id}/payment"),
            Some(json!({ "isPaid": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(paid["isPaid"], json!(true));

        let (_, listing) = send_json(&app, "GET", "/admin/reservations?date=2024-06-01", None).await;
        assert_eq!(listing["stats"], json!({ "total": 1, "paid": 1, "unpaid": 0 }));
    }

    #[tokio::test]
    async fn management_routes_require_login() {
        let app = app();

        let (status, body) = send_json(&app, "GET", "/admin/reservations", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Admin session required");

        let (status, _) = send_json(
            &app,
            "PUT",
            "/menus",
            Some(json!({ "date": today(), "name": "x", "description": "y", "price": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        login(&app).await;
        let (status, body) = send_json(&app, "POST", "/auth/logout", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "isAdmin": false }));
        let (status, _) = send_json(&app, "GET", "/admin/reservations", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = app();
        let (status, body) =
            send_json(&app, "POST", "/auth/login", Some(json!({ "password": "nope" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid password");

        let (_, session) = send_json(&app, "GET", "/auth/session", None).await;
        assert_eq!(session, json!({ "isAdmin": false }));
    }

    #[tokio::test]
    async fn invalid_reservation_reports_fields() {
        let app = app();
        login(&app).await;
        publish_today(&app).await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/reservations",
            Some(json!({ "name": " ", "roomNumber": "12345" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["name"].is_string());
        assert!(body["fields"]["roomNumber"].is_string());
    }

    #[tokio::test]
    async fn booking_needs_a_published_menu() {
        let app = app();
        let (status, body) = send_json(
            &app,
            "POST",
            "/reservations",
            Some(json!({ "name": "Ken", "roomNumber": "12" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().starts_with("no menu published"));
    }

    #[tokio::test]
    async fn menu_can_be_edited_then_deleted() {
        let app = app();
        login(&app).await;
        let menu = publish_today(&app).await;
        let id = menu["id"].as_str().unwrap();

        let (status, updated) =
            send_json(&app, "PATCH", &format!("/menus/{id}"), Some(json!({ "price": 900 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["price"], 900);

        let (status, _) = send(&app, "DELETE", &format!("/menus/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "DELETE", &format!("/menus/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_sync_modes() {
        let (status, body) = send_json(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "ok", "menus": "local_only", "reservations": "local_only" })
        );
    }
}
