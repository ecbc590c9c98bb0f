use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    db::storage::{Persisted, StateRepository},
    models::auth::SessionState,
    services::metrics::LOGINS_COUNTER,
};

/// The single "is admin" flag guarding the management screens.
///
/// There is one shared secret and one session: logging in from anywhere
/// flips the persisted flag for everyone until `logout`.
pub struct SessionGate {
    secret: String,
    session: Mutex<Persisted<SessionState>>,
}

impl SessionGate {
    pub fn new(repo: Arc<dyn StateRepository<SessionState>>, secret: String) -> anyhow::Result<Self> {
        Ok(Self {
            secret,
            session: Mutex::new(Persisted::load(repo)?),
        })
    }

    /// Returns whether the secret matched. A mismatch leaves the flag alone.
    pub async fn login(&self, password: &str) -> bool {
        if !secrets_match(password, &self.secret) {
            LOGINS_COUNTER.with_label_values(&["rejected"]).inc();
            warn!("Admin login rejected");
            return false;
        }

        let mut session = self.session.lock().await;
        session.edit().is_admin = true;
        if let Some(error) = session.take_save_error() {
            warn!("Admin session not persisted: {}", error);
        }
        LOGINS_COUNTER.with_label_values(&["success"]).inc();
        info!("Admin logged in");
        true
    }

    pub async fn logout(&self) {
        let mut session = self.session.lock().await;
        if session.get().is_admin {
            session.edit().is_admin = false;
            info!("Admin logged out");
        }
        if let Some(error) = session.take_save_error() {
            warn!("Admin logout not persisted: {}", error);
        }
    }

    pub async fn is_admin(&self) -> bool {
        self.session.lock().await.get().is_admin
    }

    pub async fn state(&self) -> SessionState {
        *self.session.lock().await.get()
    }
}

/// Compares every byte regardless of where the first difference is.
fn secrets_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::storage::MemoryRepository;

    fn gate(repo: &MemoryRepository) -> SessionGate {
        SessionGate::new(Arc::new(repo.clone()), "1234".into()).unwrap()
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let gate = gate(&MemoryRepository::new());
        assert!(!gate.login("123").await);
        assert!(!gate.login("4321").await);
        assert!(!gate.login("").await);
        assert!(!gate.is_admin().await);
    }

    #[tokio::test]
    async fn login_state_survives_restart_until_logout() {
        let repo = MemoryRepository::new();
        assert!(gate(&repo).login("1234").await);
        assert!(gate(&repo).is_admin().await);

        let restarted = gate(&repo);
        restarted.logout().await;
        assert!(!gate(&repo).is_admin().await);
    }

    #[tokio::test]
    async fn secret_is_never_persisted() {
        let repo = MemoryRepository::new();
        gate(&repo).login("1234").await;
        let raw = repo.raw().unwrap();
        assert_eq!(raw, r#"{"isAdmin":true}"#);
    }
}
