use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{FieldErrors, StoreError};

/// The single published lunch offering for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyMenu {
    pub id: Uuid,
    pub date: NaiveDate,
    pub name: String,
    pub description: String,
    /// Whole yen.
    pub price: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Persisted layout of `menu-storage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuState {
    pub menus: Vec<DailyMenu>,
    /// Deleted locally but not yet removed from the remote mirror.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_deletes: Vec<Uuid>,
}

/// Body for PUT /menus (create or replace the menu for a specific date).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishMenuRequest {
    pub date: NaiveDate,
    pub name: String,
    pub description: String,
    pub price: i32,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl PublishMenuRequest {
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert("name", "menu name is required");
        }
        if self.description.trim().is_empty() {
            errors.insert("description", "menu description is required");
        }
        if self.price <= 0 {
            errors.insert("price", "price must be a positive amount");
        }
        errors.into_result()
    }
}

/// Body for PATCH /menus/{id}. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i32>,
    pub image_url: Option<String>,
}

impl UpdateMenuRequest {
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut errors = FieldErrors::new();
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            errors.insert("name", "menu name is required");
        }
        if matches!(&self.description, Some(d) if d.trim().is_empty()) {
            errors.insert("description", "menu description is required");
        }
        if matches!(self.price, Some(p) if p <= 0) {
            errors.insert("price", "price must be a positive amount");
        }
        errors.into_result()
    }

    pub(crate) fn apply(&self, menu: &mut DailyMenu) {
        if let Some(name) = &self.name {
            menu.name = name.clone();
        }
        if let Some(description) = &self.description {
            menu.description = description.clone();
        }
        if let Some(price) = self.price {
            menu.price = price;
        }
        if let Some(image_url) = &self.image_url {
            menu.image_url = Some(image_url.clone()).filter(|u| !u.is_empty());
        }
    }
}

/// Query params for GET /menus.
#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    /// ISO 8601 date, e.g. "2024-06-01". Lists every menu when absent.
    pub date: Option<NaiveDate>,
}

/// Built-in menus served in degraded mode when nothing local matches.
pub fn sample_menus(today: NaiveDate) -> Vec<DailyMenu> {
    vec![
        DailyMenu {
            id: Uuid::from_u128(0x5a3b_0001),
            date: today,
            name: "Today's lunch set".into(),
            description: "Hamburg steak with seasonal vegetables, served with salad, soup and rice."
                .into(),
            price: 850,
            image_url: None,
        },
        DailyMenu {
            id: Uuid::from_u128(0x5a3b_0002),
            date: today.succ_opt().unwrap_or(today),
            name: "Seafood pasta lunch".into(),
            description: "Homemade tomato sauce with fresh seafood, served with salad and bread."
                .into(),
            price: 900,
            image_url: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, price: i32) -> PublishMenuRequest {
        PublishMenuRequest {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            name: name.into(),
            description: "Rice, miso soup".into(),
            price,
            image_url: None,
        }
    }

    #[test]
    fn publish_request_rejects_blank_name_and_zero_price() {
        let err = request("  ", 0).validate().unwrap_err();
        match err {
            StoreError::Validation(fields) => {
                assert!(fields.get("name").is_some());
                assert!(fields.get("price").is_some());
                assert!(fields.get("description").is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(request("Set A", 800).validate().is_ok());
    }

    #[test]
    fn menu_serializes_with_persisted_field_names() {
        let menu = DailyMenu {
            id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            name: "Set A".into(),
            description: "Karaage".into(),
            price: 800,
            image_url: Some("https://example.com/a.jpg".into()),
        };
        let value = serde_json::to_value(&menu).unwrap();
        assert_eq!(value["date"], "2024-06-01");
        assert_eq!(value["imageUrl"], "https://example.com/a.jpg");
    }
}
