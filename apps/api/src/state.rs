use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::documents::storage::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Document body storage. Default: S3DocumentStore.
    pub documents: Arc<dyn DocumentStore>,
}
