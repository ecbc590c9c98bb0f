use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Field name → human-readable message, reported back to the form that
/// submitted the values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), StoreError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(self))
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Admin session required")]
    Unauthorized,

    #[error("Invalid password")]
    InvalidCredentials,

    #[error("Remote sync failed: {0}")]
    Remote(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::Unauthorized | StoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            StoreError::Remote(_) => StatusCode::BAD_GATEWAY,
            StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let StoreError::Internal(e) = &self {
            tracing::error!("Request failed: {:#}", e);
        }
        let body = match &self {
            StoreError::Validation(fields) => {
                json!({ "error": self.to_string(), "fields": fields })
            }
            StoreError::Internal(_) => json!({ "error": "Internal error" }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
