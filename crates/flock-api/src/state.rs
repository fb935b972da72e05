use std::sync::Arc;

use chrono::Duration;
use flock_db::Database;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Lifetime of a freshly issued session.
    pub session_ttl: Duration,
    /// Adds `Secure` to the session cookie. Off only for plain-HTTP development.
    pub secure_cookies: bool,
}

impl AppStateInner {
    pub fn new(db: Database, session_ttl: Duration, secure_cookies: bool) -> AppState {
        Arc::new(Self {
            db,
            session_ttl,
            secure_cookies,
        })
    }

    /// Runs a blocking store call off the async runtime.
    pub async fn db_call<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&state.db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.to_string())
            })?
            .map_err(ApiError::from)
    }
}
