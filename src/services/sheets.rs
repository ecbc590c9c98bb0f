use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use uuid::Uuid;

use crate::{
    models::{menu::DailyMenu, reservation::Reservation},
    services::mirror::RemoteMirror,
};

/// Spreadsheet webhook (e.g. an Apps Script endpoint). Every POST appends a
/// row, so only new reservations are sent; it has no read surface and ignores
/// menus and later changes.
pub struct SheetsWebhook {
    client: Client,
    url: String,
}

impl SheetsWebhook {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self { client, url })
    }

    async fn post(&self, reservation: &Reservation) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(reservation)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow!("webhook returned {}: {}", status, text));
        }
        // The body is informational only.
        tracing::debug!("Sheets webhook response: {}", text);
        Ok(())
    }
}

#[async_trait]
impl RemoteMirror for SheetsWebhook {
    fn name(&self) -> &'static str {
        "sheets-webhook"
    }

    fn supports_queries(&self) -> bool {
        false
    }

    async fn upsert_menu(&self, _menu: &DailyMenu) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete_menu(&self, _id: Uuid) -> anyhow::Result<()> {
        Ok(())
    }

    async fn menus_for_date(&self, _date: NaiveDate) -> anyhow::Result<Vec<DailyMenu>> {
        Err(anyhow!("the sheets webhook cannot be queried"))
    }

    async fn all_menus(&self) -> anyhow::Result<Vec<DailyMenu>> {
        Err(anyhow!("the sheets webhook cannot be queried"))
    }

    async fn upsert_reservation(&self, reservation: &Reservation) -> anyhow::Result<()> {
        self.post(reservation).await
    }

    async fn update_payment(&self, reservation: &Reservation) -> anyhow::Result<()> {
        tracing::debug!(
            "Sheets webhook is append-only; payment change for {} not sent",
            reservation.id
        );
        Ok(())
    }

    async fn delete_reservation(&self, id: Uuid) -> anyhow::Result<()> {
        tracing::debug!("Sheets webhook has no delete; reservation {} kept remotely", id);
        Ok(())
    }

    async fn reservation(&self, _id: Uuid) -> anyhow::Result<Option<Reservation>> {
        Err(anyhow!("the sheets webhook cannot be queried"))
    }

    async fn reservations(&self, _date: Option<NaiveDate>) -> anyhow::Result<Vec<Reservation>> {
        Err(anyhow!("the sheets webhook cannot be queried"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    // Nothing listens on the discard port, so any request that is actually
    // sent fails.
    fn unreachable_webhook() -> SheetsWebhook {
        SheetsWebhook::new("http://127.0.0.1:9/hook".into(), Duration::from_secs(2)).unwrap()
    }

    fn reservation() -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            name: "Taro".into(),
            room_number: "101".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            is_paid: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn only_new_reservations_are_posted() {
        let webhook = unreachable_webhook();
        let r = reservation();

        assert!(webhook.upsert_reservation(&r).await.is_err());
        webhook.update_payment(&r).await.unwrap();
        webhook.delete_reservation(r.id).await.unwrap();
    }

    #[tokio::test]
    async fn menus_are_ignored_and_reads_unsupported() {
        let webhook = unreachable_webhook();
        let menu = DailyMenu {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            name: "Set A".into(),
            description: "Soup and rice".into(),
            price: 800,
            image_url: None,
        };

        assert!(!webhook.supports_queries());
        webhook.upsert_menu(&menu).await.unwrap();
        webhook.delete_menu(menu.id).await.unwrap();
        assert!(webhook.reservations(None).await.is_err());
        assert!(webhook.reservation(menu.id).await.is_err());
    }
}
