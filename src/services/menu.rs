use std::{collections::HashSet, sync::Arc};

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::storage::{Persisted, StateRepository},
    error::{StoreError, StoreResult},
    models::menu::{sample_menus, DailyMenu, MenuState, PublishMenuRequest, UpdateMenuRequest},
    services::{
        events::{EventBus, StoreEvent},
        metrics::MENUS_PUBLISHED_COUNTER,
        mirror::Mirror,
        sync::{Snapshot, SyncStatus},
        today,
    },
};

/// Owns the date → menu mapping. At most one menu exists per date.
pub struct MenuService {
    inner: Mutex<MenuInner>,
    mirror: Option<Mirror>,
    events: EventBus,
    overwrite_protection: bool,
}

struct MenuInner {
    store: Persisted<MenuState>,
    /// Last result of `fetch_today_menu`.
    today: Option<DailyMenu>,
    /// Ids deleted locally. Remote answers never bring these back.
    deleted: HashSet<Uuid>,
    status: SyncStatus,
}

impl MenuInner {
    fn absorb_save_error(&mut self) {
        if let Some(error) = self.store.take_save_error() {
            self.status.local_failed(error);
        }
    }

    fn local_for_date(&self, date: NaiveDate) -> Option<DailyMenu> {
        self.store.get().menus.iter().find(|m| m.date == date).cloned()
    }

    /// The local menu for `date`, else the remote one. `remote` is `None`
    /// when the query failed, which falls back to the sample menu.
    fn resolve_date(
        &self,
        date: NaiveDate,
        remote: Option<Vec<DailyMenu>>,
    ) -> (Option<DailyMenu>, bool) {
        let local = self.local_for_date(date);
        match remote {
            Some(remote) => {
                let menu = local.or_else(|| {
                    remote
                        .into_iter()
                        .find(|m| m.date == date && !self.deleted.contains(&m.id))
                });
                (menu, false)
            }
            None if local.is_some() => (local, false),
            None => {
                let sample = sample_menus(today()).into_iter().find(|m| m.date == date);
                let from_sample = sample.is_some();
                (sample, from_sample)
            }
        }
    }

    fn snapshot<T>(&self, data: T, from_sample: bool) -> Snapshot<T> {
        Snapshot {
            data,
            sync: self.status.clone(),
            from_sample,
        }
    }
}

impl MenuService {
    pub fn new(
        repo: Arc<dyn StateRepository<MenuState>>,
        mirror: Option<Mirror>,
        events: EventBus,
    ) -> anyhow::Result<Self> {
        let store = Persisted::load(repo)?;
        info!("Menu store loaded with {} menu(s)", store.get().menus.len());
        let deleted = store.get().pending_deletes.iter().copied().collect();
        Ok(Self {
            inner: Mutex::new(MenuInner {
                store,
                today: None,
                deleted,
                status: SyncStatus::new(mirror.is_some()),
            }),
            mirror,
            events,
            overwrite_protection: false,
        })
    }

    /// Reject publishing over an existing date instead of replacing in place.
    pub fn with_overwrite_protection(mut self, enabled: bool) -> Self {
        self.overwrite_protection = enabled;
        self
    }

    pub async fn get_menu_for_date(&self, date: NaiveDate) -> Option<DailyMenu> {
        self.inner.lock().await.local_for_date(date)
    }

    /// Every menu, in insertion order.
    pub async fn list_all_menus(&self) -> Vec<DailyMenu> {
        self.inner.lock().await.store.get().menus.clone()
    }

    /// Create the menu for `req.date`, or replace the existing one keeping its id.
    pub async fn publish_menu(&self, req: &PublishMenuRequest) -> StoreResult<DailyMenu> {
        req.validate()?;

        let (menu, replaced) = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            inner.status.clear_error();

            let existing = inner.store.get().menus.iter().position(|m| m.date == req.date);
            if existing.is_some() && self.overwrite_protection {
                return Err(StoreError::Conflict("this date already has a menu".into()));
            }

            let menu = {
                let mut state = inner.store.edit();
                match existing {
                    Some(index) => {
                        let menu = &mut state.menus[index];
                        menu.name = req.name.clone();
                        menu.description = req.description.clone();
                        menu.price = req.price;
                        menu.image_url = req.image_url.clone();
                        menu.clone()
                    }
                    None => {
                        let menu = DailyMenu {
                            id: Uuid::new_v4(),
                            date: req.date,
                            name: req.name.clone(),
                            description: req.description.clone(),
                            price: req.price,
                            image_url: req.image_url.clone(),
                        };
                        state.menus.push(menu.clone());
                        menu
                    }
                }
            };
            inner.absorb_save_error();

            if inner.today.as_ref().is_some_and(|t| t.date == menu.date) {
                inner.today = Some(menu.clone());
            }
            (menu, existing.is_some())
        };

        let outcome = if replaced { "replaced" } else { "created" };
        MENUS_PUBLISHED_COUNTER.with_label_values(&[outcome]).inc();
        info!("Menu {} for {}: {} ({})", outcome, menu.date, menu.name, menu.id);

        self.events.publish(StoreEvent::MenuPublished(menu.clone()));
        if let Some(mirror) = &self.mirror {
            let result = mirror
                .call("menus", "upsert", mirror.remote().upsert_menu(&menu))
                .await;
            self.record_remote(result, "Could not sync the menu").await;
        }
        Ok(menu)
    }

    /// Patch fields of an existing menu. Its id and date never change.
    pub async fn update_menu(&self, id: Uuid, req: &UpdateMenuRequest) -> StoreResult<DailyMenu> {
        req.validate()?;

        let menu = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            inner.status.clear_error();

            let index = inner
                .store
                .get()
                .menus
                .iter()
                .position(|m| m.id == id)
                .ok_or_else(|| StoreError::not_found("menu", id))?;

            let menu = {
                let mut state = inner.store.edit();
                let menu = &mut state.menus[index];
                req.apply(menu);
                menu.clone()
            };
            inner.absorb_save_error();

            if inner.today.as_ref().is_some_and(|t| t.id == id) {
                inner.today = Some(menu.clone());
            }
            menu
        };

        MENUS_PUBLISHED_COUNTER.with_label_values(&["updated"]).inc();
        self.events.publish(StoreEvent::MenuPublished(menu.clone()));
        if let Some(mirror) = &self.mirror {
            let result = mirror
                .call("menus", "update", mirror.remote().upsert_menu(&menu))
                .await;
            self.record_remote(result, "Could not sync the menu").await;
        }
        Ok(menu)
    }

    /// Remove a menu. Returns false when no menu has this id.
    pub async fn delete_menu(&self, id: Uuid) -> bool {
        {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            inner.status.clear_error();

            let Some(index) = inner.store.get().menus.iter().position(|m| m.id == id) else {
                return false;
            };
            let removed = {
                let mut state = inner.store.edit();
                if self.mirror.is_some() {
                    state.pending_deletes.push(id);
                }
                state.menus.remove(index)
            };
            inner.absorb_save_error();
            inner.deleted.insert(id);

            if inner.today.as_ref().is_some_and(|t| t.id == id) {
                inner.today = None;
            }
            info!("Menu deleted for {} ({})", removed.date, removed.id);
        }

        self.events.publish(StoreEvent::MenuDeleted { id });
        if let Some(mirror) = &self.mirror {
            let result = mirror
                .call("menus", "delete", mirror.remote().delete_menu(id))
                .await;
            if self
                .record_remote(result, "Could not delete the menu remotely")
                .await
                .is_some()
            {
                self.forget_pending_delete(id).await;
            }
        }
        true
    }

    /// Menu for `date`, consulting the remote mirror when it can be queried.
    /// Local records win over remote ones; when the remote fails and nothing
    /// local exists, the built-in sample menu for that date is served.
    pub async fn fetch_menu_for_date(&self, date: NaiveDate) -> Snapshot<Option<DailyMenu>> {
        let remote = self.remote_menus_for_date(date).await;
        let inner = self.inner.lock().await;
        let (menu, from_sample) = inner.resolve_date(date, remote);
        inner.snapshot(menu, from_sample)
    }

    /// Fetch today's menu and remember it. While the remote is down, the
    /// remembered menu stands in for one that is not stored locally.
    pub async fn fetch_today_menu(&self, today: NaiveDate) -> Snapshot<Option<DailyMenu>> {
        let remote = self.remote_menus_for_date(today).await;

        // Resolve and cache under one lock so a concurrent delete cannot be undone.
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let remembered = inner
            .today
            .clone()
            .filter(|m| m.date == today && !inner.deleted.contains(&m.id));
        let (menu, from_sample) = match remembered {
            Some(menu) if remote.is_none() && inner.local_for_date(today).is_none() => {
                (Some(menu), false)
            }
            _ => inner.resolve_date(today, remote),
        };
        if !from_sample {
            inner.today = menu.clone();
        }
        inner.snapshot(menu, from_sample)
    }

    /// All menus, merged with remote-only records for dates that have no
    /// local menu.
    pub async fn fetch_all_menus(&self) -> Snapshot<Vec<DailyMenu>> {
        let remote = match self.queryable_mirror().await {
            None => Some(Vec::new()),
            Some(mirror) => {
                self.retry_pending_deletes(mirror).await;
                let result = mirror
                    .call("menus", "query", mirror.remote().all_menus())
                    .await;
                self.record_remote(result, "Could not load the menus").await
            }
        };

        let inner = self.inner.lock().await;
        let mut menus = inner.store.get().menus.clone();
        match remote {
            Some(remote) => {
                for menu in remote {
                    if !inner.deleted.contains(&menu.id)
                        && !menus.iter().any(|m| m.id == menu.id || m.date == menu.date)
                    {
                        menus.push(menu);
                    }
                }
                inner.snapshot(menus, false)
            }
            None if !menus.is_empty() => inner.snapshot(menus, false),
            None => inner.snapshot(sample_menus(today()), true),
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.inner.lock().await.status.clone()
    }

    pub async fn clear_error(&self) {
        self.inner.lock().await.status.clear_error();
    }

    /// Remote menus for `date`; `None` when the query failed. Without a
    /// queryable mirror there is nothing remote to add.
    async fn remote_menus_for_date(&self, date: NaiveDate) -> Option<Vec<DailyMenu>> {
        let Some(mirror) = self.queryable_mirror().await else {
            return Some(Vec::new());
        };
        self.retry_pending_deletes(mirror).await;
        let result = mirror
            .call("menus", "query", mirror.remote().menus_for_date(date))
            .await;
        self.record_remote(result, "Could not load the menu").await
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
                .call("menus", "delete", mirror.remote().delete_menu(id))
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
