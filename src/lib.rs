// Library exports for the API binary, the seeding tool and tests
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use tracing::info;

use config::Config;
use db::storage::{
    JsonFileRepository, MemoryRepository, AUTH_STORAGE, MENU_STORAGE, RESERVATION_STORAGE,
};
use services::{
    auth::SessionGate, events::EventBus, menu::MenuService, mirror::build_mirror,
    reservation::ReservationService,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub menus: Arc<MenuService>,
    pub reservations: Arc<ReservationService>,
    pub session: Arc<SessionGate>,
    pub events: EventBus,
}

impl AppState {
    /// Stores backed by JSON files under `data_dir`, mirrored to the
    /// configured remote backend.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        info!("Local data directory: {}", config.data_dir.display());

        let mirror = build_mirror(&config).await?;
        let events = EventBus::new();

        let menus = MenuService::new(
            Arc::new(JsonFileRepository::new(&config.data_dir, MENU_STORAGE)),
            mirror.clone(),
            events.clone(),
        )?
        .with_overwrite_protection(config.menu_overwrite_protection);
        let reservations = ReservationService::new(
            Arc::new(JsonFileRepository::new(&config.data_dir, RESERVATION_STORAGE)),
            mirror,
            events.clone(),
        )?;
        let session = SessionGate::new(
            Arc::new(JsonFileRepository::new(&config.data_dir, AUTH_STORAGE)),
            config.admin_password.clone(),
        )?;

        Ok(Self {
            config: Arc::new(config),
            menus: Arc::new(menus),
            reservations: Arc::new(reservations),
            session: Arc::new(session),
            events,
        })
    }

    /// Local-only state kept in memory. Nothing touches the disk.
    pub fn in_memory(config: Config) -> anyhow::Result<Self> {
        let events = EventBus::new();
        let menus = MenuService::new(Arc::new(MemoryRepository::new()), None, events.clone())?
            .with_overwrite_protection(config.menu_overwrite_protection);
        let reservations =
            ReservationService::new(Arc::new(MemoryRepository::new()), None, events.clone())?;
        let session = SessionGate::new(
            Arc::new(MemoryRepository::new()),
            config.admin_password.clone(),
        )?;

        Ok(Self {
            config: Arc::new(config),
            menus: Arc::new(menus),
            reservations: Arc::new(reservations),
            session: Arc::new(session),
            events,
        })
    }
}
