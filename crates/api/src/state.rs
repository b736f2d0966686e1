//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::JapemConfig;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: JapemConfig,
    pool: PgPool,
}

impl AppState {
    /// Create application state from loaded configuration and a pool.
    #[must_use]
    pub fn new(config: JapemConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pool }),
        }
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &JapemConfig {
        &self.inner.config
    }

    /// Database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }
}
