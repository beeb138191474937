use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{auth::session::SessionManager, config::AppConfig, db};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub sessions: SessionManager,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.db_path).await?;
        Ok(Self::from_parts(db, Arc::new(config)))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>) -> Self {
        let sessions = SessionManager::new(&config.session);
        Self {
            db,
            config,
            sessions,
        }
    }

    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::config::SessionConfig;

        let config = Arc::new(AppConfig {
            db_path: ":memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            seed_data: false,
            allowed_origins: vec!["http://localhost:5173".into()],
            session: SessionConfig {
                secret: "test-secret".into(),
                issuer: "tasklist-test".into(),
                ttl_days: 7,
                cookie_secure: false,
            },
        });
        Self::from_parts(db::test_pool().await, config)
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
