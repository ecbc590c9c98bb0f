use std::{collections::HashSet, sync::Arc};

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::storage::{Persisted, StateRepository},
    error::{StoreError, StoreResult},
    models::reservation::{
        sample_reservations, CreateReservationRequest, Reservation, ReservationState,
        ReservationStats,
    },
    services::{
        events::{EventBus, StoreEvent},
        metrics::RESERVATIONS_COUNTER,
        mirror::Mirror,
        sync::{Snapshot, SyncStatus},
        today,
    },
};

/// Owns every reservation and its payment flag.
pub struct ReservationService {
    inner: Mutex<ReservationInner>,
    mirror: Option<Mirror>,
    events: EventBus,
}

struct ReservationInner {
    store: Persisted<ReservationState>,
    /// Ids deleted locally. Remote answers never bring these back.
    deleted: HashSet<Uuid>,
    status: SyncStatus,
}

impl ReservationInner {
    fn absorb_save_error(&mut self) {
        if let Some(error) = self.store.take_save_error() {
            self.status.local_failed(error);
        }
    }

    fn position(&self, id: Uuid) -> StoreResult<usize> {
        self.store
            .get()
            .reservations
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("reservation", id))
    }

    fn local(&self, date: Option<NaiveDate>) -> Vec<Reservation> {
        newest_first(
            self.store
                .get()
                .reservations
                .iter()
                .filter(|r| date.map_or(true, |d| r.date == d)),
        )
    }
}

/// Most recent first; equal timestamps keep the later insertion first.
fn newest_first<'a>(reservations: impl DoubleEndedIterator<Item = &'a Reservation>) -> Vec<Reservation> {
    let mut out: Vec<Reservation> = reservations.rev().cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

impl ReservationService {
    pub fn new(
        repo: Arc<dyn StateRepository<ReservationState>>,
        mirror: Option<Mirror>,
        events: EventBus,
    ) -> anyhow::Result<Self> {
        let store = Persisted::load(repo)?;
        info!(
            "Reservation store loaded with {} reservation(s)",
            store.get().reservations.len()
        );
        let deleted = store.get().pending_deletes.iter().copied().collect();
        Ok(Self {
            inner: Mutex::new(ReservationInner {
                store,
                deleted,
                status: SyncStatus::new(mirror.is_some()),
            }),
            mirror,
            events,
        })
    }

    /// Book a lunch. The returned record's id keys the confirmation view.
    pub async fn add_reservation(&self, req: &CreateReservationRequest) -> StoreResult<Reservation> {
        req.validate()?;

        let reservation = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            inner.status.clear_error();

            let mut id = Uuid::new_v4();
            while inner.store.get().reservations.iter().any(|r| r.id == id) {
                id = Uuid::new_v4();
            }
            let reservation = Reservation {
                id,
                name: req.name.trim().to_string(),
                room_number: req.room_number.trim().to_string(),
                date: req.date.unwrap_or_else(today),
                is_paid: false,
                created_at: Utc::now(),
            };
            inner.store.edit().reservations.push(reservation.clone());
            inner.absorb_save_error();
            reservation
        };

        RESERVATIONS_COUNTER.with_label_values(&["created"]).inc();
        info!(
            "Reservation {} added for {} (room {})",
            reservation.id, reservation.date, reservation.room_number
        );

        self.events.publish(StoreEvent::ReservationAdded(reservation.clone()));
        if let Some(mirror) = &self.mirror {
            let result = mirror
                .call(
                    "reservations",
                    "create",
                    mirror.remote().upsert_reservation(&reservation),
                )
                .await;
            self.record_remote(result, "Could not sync the reservation").await;
        }
        Ok(reservation)
    }

    pub async fn get_reservation(&self, id: Uuid) -> StoreResult<Reservation> {
        let inner = self.inner.lock().await;
        let index = inner.position(id)?;
        Ok(inner.store.get().reservations[index].clone())
    }

    /// Reservations for exactly `date`, most recent first.
    pub async fn list_reservations_for_date(&self, date: NaiveDate) -> Vec<Reservation> {
        self.inner.lock().await.local(Some(date))
    }

    pub async fn list_all_reservations(&self) -> Vec<Reservation> {
        self.inner.lock().await.local(None)
    }

    /// Setting the flag to its current value changes nothing.
    pub async fn set_payment_status(&self, id: Uuid, is_paid: bool) -> StoreResult<Reservation> {
        self.ensure_local(id).await?;
        let (reservation, changed) = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            inner.status.clear_error();

            let index = inner.position(id)?;
            if inner.store.get().reservations[index].is_paid == is_paid {
                (inner.store.get().reservations[index].clone(), false)
            } else {
                let reservation = {
                    let mut state = inner.store.edit();
                    let reservation = &mut state.reservations[index];
                    reservation.is_paid = is_paid;
                    reservation.clone()
                };
                inner.absorb_save_error();
                (reservation, true)
            }
        };

        if changed {
            self.payment_changed(&reservation).await;
        }
        Ok(reservation)
    }

    pub async fn toggle_payment_status(&self, id: Uuid) -> StoreResult<Reservation> {
        self.ensure_local(id).await?;
        let reservation = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            inner.status.clear_error();

            let index = inner.position(id)?;
            let reservation = {
                let mut state = inner.store.edit();
                let reservation = &mut state.reservations[index];
                reservation.is_paid = !reservation.is_paid;
                reservation.clone()
            };
            inner.absorb_save_error();
            reservation
        };

        self.payment_changed(&reservation).await;
        Ok(reservation)
    }

    /// Permanently remove a reservation. Returns false when the id is unknown
    /// both locally and to the mirror.
    pub async fn delete_reservation(&self, id: Uuid) -> bool {
        if self.ensure_local(id).await.is_err() {
            return false;
        }
        {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            inner.status.clear_error();

            let Ok(index) = inner.position(id) else {
                return false;
            };
            {
                let mut state = inner.store.edit();
                if self.mirror.is_some() {
                    state.pending_deletes.push(id);
                }
                state.reservations.remove(index);
            }
            inner.absorb_save_error();
            inner.deleted.insert(id);
        }

        RESERVATIONS_COUNTER.with_label_values(&["deleted"]).inc();
        info!("Reservation {} deleted", id);

        self.events.publish(StoreEvent::ReservationDeleted { id });
        if let Some(mirror) = &self.mirror {
            let result = mirror
                .call("reservations", "delete", mirror.remote().delete_reservation(id))
                .await;
            if self
                .record_remote(result, "Could not delete the reservation remotely")
                .await
                .is_some()
            {
                self.forget_pending_delete(id).await;
            }
        }
        true
    }

    /// Derived counts for an already-filtered collection. Never stored.
    pub fn compute_stats(reservations: &[Reservation]) -> ReservationStats {
        let total = reservations.len();
        let paid = reservations.iter().filter(|r| r.is_paid).count();
        ReservationStats {
            total,
            paid,
            unpaid: total - paid,
        }
    }

    /// Reservations for `date` (or all of them), merged with remote-only
    /// records when the mirror can be queried. Falls back to the sample
    /// bookings when the remote fails and nothing local matches.
    pub async fn fetch_reservations(&self, date: Option<NaiveDate>) -> Snapshot<Vec<Reservation>> {
        let remote = match self.queryable_mirror().await {
            None => Some(Vec::new()),
            Some(mirror) => {
                self.retry_pending_deletes(mirror).await;
                let result = mirror
                    .call("reservations", "query", mirror.remote().reservations(date))
                    .await;
                self.record_remote(result, "Could not load reservations").await
            }
        };

        let inner = self.inner.lock().await;
        let local = inner.local(date);
        let (data, from_sample) = match remote {
            Some(remote) => {
                let mut merged = local;
                for reservation in remote {
                    if !inner.deleted.contains(&reservation.id)
                        && !merged.iter().any(|r| r.id == reservation.id)
                    {
                        merged.push(reservation);
                    }
                }
                merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                (merged, false)
            }
            None if !local.is_empty() => (local, false),
            None => {
                let sample: Vec<Reservation> = sample_reservations(today(), Utc::now())
                    .into_iter()
                    .filter(|r| date.map_or(true, |d| r.date == d))
                    .collect();
                let from_sample = !sample.is_empty();
                (sample, from_sample)
            }
        };
        Snapshot {
            data,
            sync: inner.status.clone(),
            from_sample,
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.inner.lock().await.status.clone()
    }

    pub async fn clear_error(&self) {
        self.inner.lock().await.status.clear_error();
    }

    /// Make a reservation that is only known to the mirror local, so the
    /// admin list can act on every row it shows.
    async fn ensure_local(&self, id: Uuid) -> StoreResult<()> {
        if self.inner.lock().await.position(id).is_ok() {
            return Ok(());
        }
        let Some(mirror) = self.queryable_mirror().await else {
            return Err(StoreError::not_found("reservation", id));
        };
        let result = mirror
            .call("reservations", "get", mirror.remote().reservation(id))
            .await;
        let remote = self
            .record_remote(result, "Could not load the reservation")
            .await
            .flatten();

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.position(id).is_ok() {
            return Ok(());
        }
        match remote.filter(|r| !inner.deleted.contains(&r.id)) {
            Some(reservation) => {
                info!("Reservation {} adopted from the remote mirror", id);
                inner.store.edit().reservations.push(reservation);
                inner.absorb_save_error();
                Ok(())
            }
            None => Err(StoreError::not_found("reservation", id)),
        }
    }

    async fn payment_changed(&self, reservation: &Reservation) {
        let action = if reservation.is_paid { "paid" } else { "unpaid" };
        RESERVATIONS_COUNTER.with_label_values(&[action]).inc();
        info!("Reservation {} marked {}", reservation.id, action);

        self.events.publish(StoreEvent::PaymentChanged {
            id: reservation.id,
            is_paid: reservation.is_paid,
        });
        if let Some(mirror) = &self.mirror {
            let result = mirror
                .call(
                    "reservations",
                    "update",
                    mirror.remote().update_payment(reservation),
                )
                .await;
            self.record_remote(result, "Could not sync the payment").await;
        }
    }

    async fn queryable_mirror(&self) -> Option<&Mirror> {
        let mirror = self.mirror.as_ref().filter(|m| m.supports_queries())?;
        self.inner.lock().await.status.clear_error();
        Some(mirror)
    }

    /// Deletes that failed earlier go out again before the mirror is read.
    async fn retry_pending_deletes(&self, mirror: &Mirror) {
        let pending = self.inner.lock().await.store.get().pending_deletes.clone();
        for id in pending {
            let result = mirror
                .call("reservations", "delete", mirror.remote().delete_reservation(id))
                .await;
            if result.is_ok() {
                self.forget_pending_delete(id).await;
            }
        }
    }

    async fn forget_pending_delete(&self, id: Uuid) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.store.get().pending_deletes.contains(&id) {
            inner.store.edit().pending_deletes.retain(|p| *p != id);
            inner.absorb_save_error();
        }
    }

    async fn record_remote<T>(&self, result: StoreResult<T>, failure: &str) -> Option<T> {
        let mut inner = self.inner.lock().await;
        match result {
            Ok(value) => {
                inner.status.remote_succeeded();
                Some(value)
            }
            Err(e) => {
                inner
                    .status
                    .remote_failed(format!("{failure} ({e}). Check the network connection."));
                None
            }
        }
    }
}
