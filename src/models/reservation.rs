use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{FieldErrors, StoreError};

/// One diner's booking against a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub name: String,
    pub room_number: String,
    pub date: NaiveDate,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Persisted layout of `reservation-storage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationState {
    pub reservations: Vec<Reservation>,
    /// Deleted locally but not yet removed from the remote mirror.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_deletes: Vec<Uuid>,
}

/// Body for POST /reservations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub name: String,
    pub room_number: String,
    /// Defaults to today when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl CreateReservationRequest {
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert("name", "name is required");
        }
        let room = self.room_number.trim();
        if room.is_empty() {
            errors.insert("roomNumber", "room number is required");
        } else if !is_valid_room_number(room) {
            errors.insert("roomNumber", "room number must be 1 to 4 digits");
        }
        errors.into_result()
    }
}

/// 1–4 ASCII digits.
pub fn is_valid_room_number(room: &str) -> bool {
    (1..=4).contains(&room.len()) && room.bytes().all(|b| b.is_ascii_digit())
}

/// Body for PUT /admin/reservations/{id}/payment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    pub is_paid: bool,
}

/// Query params for reservation listings and export.
#[derive(Debug, Deserialize)]
pub struct ReservationQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationStats {
    pub total: usize,
    pub paid: usize,
    pub unpaid: usize,
}

/// Sample bookings served in degraded mode when nothing local matches.
pub fn sample_reservations(today: NaiveDate, now: DateTime<Utc>) -> Vec<Reservation> {
    vec![
        Reservation {
            id: Uuid::from_u128(0x5a3b_1001),
            name: "Taro Yamada".into(),
            room_number: "101".into(),
            date: today,
            is_paid: false,
            created_at: now - chrono::Duration::hours(1),
        },
        Reservation {
            id: Uuid::from_u128(0x5a3b_1002),
            name: "Hanako Sato".into(),
            room_number: "202".into(),
            date: today,
            is_paid: true,
            created_at: now - chrono::Duration::hours(2),
        },
    ]
}
