use std::{env, path::PathBuf, time::Duration};

/// Where store mutations are mirrored, from `REMOTE_BACKEND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteBackend {
    None,
    Postgres { database_url: String },
    Webhook { url: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub admin_password: String,
    pub remote_backend: RemoteBackend,
    pub remote_timeout: Duration,
    /// Reject a second publish for a date instead of replacing the menu.
    pub menu_overwrite_protection: bool,
    pub app_base_url: String,
}

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            admin_password: DEFAULT_ADMIN_PASSWORD.into(),
            remote_backend: RemoteBackend::None,
            remote_timeout: Duration::from_secs(10),
            menu_overwrite_protection: false,
            app_base_url: "http://localhost".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let admin_password = match env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()) {
            Some(password) => password,
            None => {
                tracing::warn!("ADMIN_PASSWORD not set, using the built-in default");
                defaults.admin_password
            }
        };

        let remote_backend = match env::var("REMOTE_BACKEND")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "" | "none" => RemoteBackend::None,
            "postgres" => RemoteBackend::Postgres {
                database_url: required("DATABASE_URL")?,
            },
            "webhook" | "sheets" => RemoteBackend::Webhook {
                url: required("SHEETS_WEBHOOK_URL")?,
            },
            other => anyhow::bail!("Unknown REMOTE_BACKEND: {}", other),
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()?,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            admin_password,
            remote_backend,
            remote_timeout: match env::var("REMOTE_TIMEOUT_SECS") {
                Ok(secs) => Duration::from_secs(secs.parse()?),
                Err(_) => defaults.remote_timeout,
            },
            menu_overwrite_protection: env::var("MENU_OVERWRITE_PROTECTION")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.menu_overwrite_protection),
            app_base_url: env::var("APP_BASE_URL").unwrap_or(defaults.app_base_url),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required env var: {}", key))
}
