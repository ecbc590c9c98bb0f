//! Best-effort remote copy of the stores.
//!
//! A mirror is never authoritative: stores commit locally first and only then
//! call the mirror, and a failed call is reported through the store's
//! [`SyncStatus`](super::sync::SyncStatus) instead of undoing anything.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::{Config, RemoteBackend},
    db,
    error::{StoreError, StoreResult},
    models::{menu::DailyMenu, reservation::Reservation},
    services::{metrics::REMOTE_FAILURES_COUNTER, sheets::SheetsWebhook},
};

#[async_trait]
pub trait RemoteMirror: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write-only mirrors (webhooks) return false; stores then skip remote reads.
    fn supports_queries(&self) -> bool {
        true
    }

    async fn upsert_menu(&self, menu: &DailyMenu) -> anyhow::Result<()>;

    async fn delete_menu(&self, id: Uuid) -> anyhow::Result<()>;

    async fn menus_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<DailyMenu>>;

    async fn all_menus(&self) -> anyhow::Result<Vec<DailyMenu>>;

    /// Create the reservation or overwrite its mutable fields.
    async fn upsert_reservation(&self, reservation: &Reservation) -> anyhow::Result<()>;

    /// Payment flag changes only. Append-only mirrors may ignore these.
    async fn update_payment(&self, reservation: &Reservation) -> anyhow::Result<()>;

    async fn delete_reservation(&self, id: Uuid) -> anyhow::Result<()>;

    async fn reservation(&self, id: Uuid) -> anyhow::Result<Option<Reservation>>;

    /// Most recent first.
    async fn reservations(&self, date: Option<NaiveDate>) -> anyhow::Result<Vec<Reservation>>;
}

/// A [`RemoteMirror`] with a deadline on every call.
#[derive(Clone)]
pub struct Mirror {
    remote: Arc<dyn RemoteMirror>,
    timeout: Duration,
}

impl Mirror {
    pub fn new(remote: Arc<dyn RemoteMirror>, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    pub fn remote(&self) -> &dyn RemoteMirror {
        self.remote.as_ref()
    }

    pub fn supports_queries(&self) -> bool {
        self.remote.supports_queries()
    }

    /// Run one remote call under the configured timeout. Failures are logged
    /// and counted here so callers only decide what to show.
    pub async fn call<T, F>(
        &self,
        collection: &'static str,
        operation: &'static str,
        fut: F,
    ) -> StoreResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let outcome = match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => format!("{e:#}"),
            Err(_) => format!("timed out after {}s", self.timeout.as_secs()),
        };
        warn!(
            "{} mirror: {} {} failed: {}",
            self.remote.name(),
            operation,
            collection,
            outcome
        );
        REMOTE_FAILURES_COUNTER
            .with_label_values(&[collection, operation])
            .inc();
        Err(StoreError::Remote(outcome))
    }
}

/// Build the mirror selected by `REMOTE_BACKEND`, if any.
pub async fn build_mirror(config: &Config) -> anyhow::Result<Option<Mirror>> {
    let remote: Arc<dyn RemoteMirror> = match &config.remote_backend {
        RemoteBackend::None => {
            info!("No remote mirror configured, running local-only");
            return Ok(None);
        }
        RemoteBackend::Postgres { database_url } => {
            let pool = db::create_lazy_pool(database_url, config.remote_timeout)?;
            // An unreachable database must not stop the API from starting.
            if let Err(e) = db::run_migrations(&pool).await {
                warn!("Postgres mirror unavailable at startup: {:#}", e);
            }
            Arc::new(db::documents::PgDocumentMirror::new(pool))
        }
        RemoteBackend::Webhook { url } => {
            Arc::new(SheetsWebhook::new(url.clone(), config.remote_timeout)?)
        }
    };
    info!("Remote mirror enabled: {}", remote.name());
    Ok(Some(Mirror::new(remote, config.remote_timeout)))
}

/// Mirrors used by the store tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    use anyhow::anyhow;

    use super::*;

    /// In-memory remote. While `fail` is set every call errors out; `query_delay`
    /// holds query answers back after they have been read.
    #[derive(Default)]
    pub struct FakeMirror {
        pub fail: AtomicBool,
        pub query_delay: Duration,
        pub menus: Mutex<Vec<DailyMenu>>,
        pub reservations: Mutex<Vec<Reservation>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeMirror {
        pub fn failing() -> Self {
            Self {
                fail: AtomicBool::new(true),
                ..Self::default()
            }
        }

        pub fn slow(query_delay: Duration) -> Self {
            Self {
                query_delay,
                ..Self::default()
            }
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(call.to_string());
            if self.fail.load(Ordering::SeqCst) {
                Err(anyhow!("connection refused"))
            } else {
                Ok(())
            }
        }

        async fn answer<T>(&self, value: T) -> anyhow::Result<T> {
            if !self.query_delay.is_zero() {
                tokio::time::sleep(self.query_delay).await;
            }
            Ok(value)
        }
    }

    #[async_trait]
    impl RemoteMirror for FakeMirror {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn upsert_menu(&self, menu: &DailyMenu) -> anyhow::Result<()> {
            self.record("upsert_menu")?;
            let mut menus = self.menus.lock().unwrap();
            menus.retain(|m| m.id != menu.id);
            menus.push(menu.clone());
            Ok(())
        }

        async fn delete_menu(&self, id: Uuid) -> anyhow::Result<()> {
            self.record("delete_menu")?;
            self.menus.lock().unwrap().retain(|m| m.id != id);
            Ok(())
        }

        async fn menus_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<DailyMenu>> {
            self.record("menus_for_date")?;
            let menus: Vec<DailyMenu> = {
                let menus = self.menus.lock().unwrap();
                menus.iter().filter(|m| m.date == date).cloned().collect()
            };
            self.answer(menus).await
        }

        async fn all_menus(&self) -> anyhow::Result<Vec<DailyMenu>> {
            self.record("all_menus")?;
            let menus = self.menus.lock().unwrap().clone();
            self.answer(menus).await
        }

        async fn upsert_reservation(&self, reservation: &Reservation) -> anyhow::Result<()> {
            self.record("upsert_reservation")?;
            let mut reservations = self.reservations.lock().unwrap();
            reservations.retain(|r| r.id != reservation.id);
            reservations.push(reservation.clone());
            Ok(())
        }

        async fn update_payment(&self, reservation: &Reservation) -> anyhow::Result<()> {
            self.record("update_payment")?;
            let mut reservations = self.reservations.lock().unwrap();
            if let Some(r) = reservations.iter_mut().find(|r| r.id == reservation.id) {
                r.is_paid = reservation.is_paid;
            }
            Ok(())
        }

        async fn delete_reservation(&self, id: Uuid) -> anyhow::Result<()> {
            self.record("delete_reservation")?;
            self.reservations.lock().unwrap().retain(|r| r.id != id);
            Ok(())
        }

        async fn reservation(&self, id: Uuid) -> anyhow::Result<Option<Reservation>> {
            self.record("reservation")?;
            let found = self.reservations.lock().unwrap().iter().find(|r| r.id == id).cloned();
            self.answer(found).await
        }

        async fn reservations(&self, date: Option<NaiveDate>) -> anyhow::Result<Vec<Reservation>> {
            self.record("reservations")?;
            let mut out: Vec<Reservation> = self
                .reservations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| date.map_or(true, |d| r.date == d))
                .cloned()
                .collect();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            self.answer(out).await
        }
    }

    /// Never answers; exercises the timeout path.
    pub struct StalledMirror;

    #[async_trait]
    impl RemoteMirror for StalledMirror {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn upsert_menu(&self, _menu: &DailyMenu) -> anyhow::Result<()> {
            std::future::pending().await
        }

        async fn delete_menu(&self, _id: Uuid) -> anyhow::Result<()> {
            std::future::pending().await
        }

        async fn menus_for_date(&self, _date: NaiveDate) -> anyhow::Result<Vec<DailyMenu>> {
            std::future::pending().await
        }

        async fn all_menus(&self) -> anyhow::Result<Vec<DailyMenu>> {
            std::future::pending().await
        }

        async fn upsert_reservation(&self, _reservation: &Reservation) -> anyhow::Result<()> {
            std::future::pending().await
        }

        async fn update_payment(&self, _reservation: &Reservation) -> anyhow::Result<()> {
            std::future::pending().await
        }

        async fn delete_reservation(&self, _id: Uuid) -> anyhow::Result<()> {
            std::future::pending().await
        }

        async fn reservation(&self, _id: Uuid) -> anyhow::Result<Option<Reservation>> {
            std::future::pending().await
        }

        async fn reservations(&self, _date: Option<NaiveDate>) -> anyhow::Result<Vec<Reservation>> {
            std::future::pending().await
        }
    }
}
