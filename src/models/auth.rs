use serde::{Deserialize, Serialize};

/// Persisted layout of `auth-storage`. The admin secret itself is never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub is_admin: bool,
}

/// Body for POST /auth/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}
