use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::StoreError, AppState};

/// Extractor for management routes: succeeds only while the admin session
/// flag is set.
pub struct AdminSession;

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = StoreError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.session.is_admin().await {
            Ok(AdminSession)
        } else {
            Err(StoreError::Unauthorized)
        }
    }
}
