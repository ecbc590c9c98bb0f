pub mod auth;
pub mod events;
pub mod export;
pub mod menu;
pub mod metrics;
pub mod mirror;
pub mod reservation;
pub mod sheets;
pub mod sync;

use chrono::{NaiveDate, Utc};

/// The calendar day reservations default to, in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
