use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Page size rules for the listing endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ListingConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub listing: ListingConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match std::env::var("STORE_BACKEND") {
            Ok(v) => parse_backend(&v)?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        let defaults = ListingConfig::default();
        let default_limit = env_or("LIST_DEFAULT_LIMIT", defaults.default_limit).max(1);
        let max_limit = env_or("LIST_MAX_LIMIT", defaults.max_limit).max(default_limit);

        Ok(Self {
            backend,
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            listing: ListingConfig {
                default_limit,
                max_limit,
            },
        })
    }

    /// Config for tests and local runs without PostgreSQL.
    pub fn in_memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            listing: ListingConfig::default(),
        }
    }
}

fn parse_backend(raw: &str) -> anyhow::Result<StoreBackend> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
        .with_context(|| format!("unknown STORE_BACKEND {raw:?}, expected postgres or memory"))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
