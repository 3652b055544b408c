use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::store::Stores;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub config: Arc<AppConfig>,
    /// Present when the stores are backed by the local database.
    pub db: Option<SqlitePool>,
}
