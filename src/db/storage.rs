//! Local key-value persistence for the stores.
//!
//! Each store owns one entry (`auth-storage`, `menu-storage`,
//! `reservation-storage`) holding its whole state as JSON. Stores never call
//! `save` directly: they mutate through [`Persisted::edit`], whose guard
//! writes the state back when it goes out of scope.

use std::{
    fs, io,
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context};
use serde::{de::DeserializeOwned, Serialize};

pub const AUTH_STORAGE: &str = "auth-storage";
pub const MENU_STORAGE: &str = "menu-storage";
pub const RESERVATION_STORAGE: &str = "reservation-storage";

pub trait StateRepository<S>: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> anyhow::Result<Option<S>>;
    fn save(&self, state: &S) -> anyhow::Result<()>;
}

/// One `<key>.json` file per store under the data directory.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(data_dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<S> StateRepository<S> for JsonFileRepository
where
    S: Serialize + DeserializeOwned,
{
    fn load(&self) -> anyhow::Result<Option<S>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {:?}", self.path))
            }
        };
        let state = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt state file {:?}", self.path))?;
        Ok(Some(state))
    }

    fn save(&self, state: &S) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data dir {:?}", dir))?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        // Write-then-rename so a crash never leaves a half-written file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;
        Ok(())
    }
}

/// Keeps the serialized JSON in memory. Used by tests and by the API when no
/// data directory should be touched.
#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    json: Arc<Mutex<Option<String>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON of the last save.
    pub fn raw(&self) -> Option<String> {
        self.json.lock().ok().and_then(|json| json.clone())
    }
}

impl<S> StateRepository<S> for MemoryRepository
where
    S: Serialize + DeserializeOwned,
{
    fn load(&self) -> anyhow::Result<Option<S>> {
        let json = self.json.lock().map_err(|_| anyhow!("memory repository poisoned"))?;
        json.as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(Into::into)
    }

    fn save(&self, state: &S) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(state)?;
        let mut json = self.json.lock().map_err(|_| anyhow!("memory repository poisoned"))?;
        *json = Some(serialized);
        Ok(())
    }
}

/// A store's state together with the repository it is persisted to.
pub struct Persisted<S> {
    state: S,
    repo: Arc<dyn StateRepository<S>>,
    save_error: Option<String>,
}

impl<S> Persisted<S>
where
    S: Default,
{
    /// Load the saved state, or start empty when nothing was saved yet.
    pub fn load(repo: Arc<dyn StateRepository<S>>) -> anyhow::Result<Self> {
        let state = repo.load()?.unwrap_or_default();
        Ok(Self {
            state,
            repo,
            save_error: None,
        })
    }
}

impl<S> Persisted<S> {
    pub fn get(&self) -> &S {
        &self.state
    }

    /// Mutable access; the state is saved when the returned guard is dropped,
    /// provided it was actually borrowed mutably.
    pub fn edit(&mut self) -> SaveOnDrop<'_, S> {
        SaveOnDrop {
            persisted: self,
            dirty: false,
        }
    }

    /// Error from the most recent failed save, if any. Cleared on read.
    pub fn take_save_error(&mut self) -> Option<String> {
        self.save_error.take()
    }
}

pub struct SaveOnDrop<'a, S> {
    persisted: &'a mut Persisted<S>,
    dirty: bool,
}

impl<S> Deref for SaveOnDrop<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.persisted.state
    }
}

impl<S> DerefMut for SaveOnDrop<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.dirty = true;
        &mut self.persisted.state
    }
}

impl<S> Drop for SaveOnDrop<'_, S> {
    fn drop(&mut self) {
        if !self.dirty {
            return;
        }
        match self.persisted.repo.save(&self.persisted.state) {
            Ok(()) => self.persisted.save_error = None,
            Err(e) => {
                tracing::error!("Failed to persist store state: {:#}", e);
                crate::services::metrics::PERSIST_FAILURES.inc();
                self.persisted.save_error = Some(format!("Could not save changes locally: {e}"));
            }
        }
    }
}
