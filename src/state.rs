use std::sync::Arc;

use anyhow::Context;

use crate::config::{AppConfig, StoreBackend};
use crate::db::create_pool;
use crate::users::{memory::MemoryUserStore, repo::PgUserStore, repo::UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store = match config.backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let db = create_pool(url, config.max_connections)
                    .await
                    .context("connect to database")?;

                // Run migrations if present
                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory user store; data is lost on exit");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(MemoryUserStore::new()),
            Arc::new(AppConfig::in_memory()),
        )
    }
}
