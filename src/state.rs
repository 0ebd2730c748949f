//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::engine::PdfEngine;
use crate::error::Result;
use crate::service::DocumentService;
use crate::storage::FileStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    service: DocumentService,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool, files: FileStore) -> Self {
        let engine = PdfEngine::new(
            config.engine.edit,
            config.engine.render_zoom,
            config.engine.operation_timeout,
        );
        let service = DocumentService::new(db, files, engine);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                service,
            }),
        }
    }

    /// Open the database, create storage directories and build the state.
    pub async fn from_config(config: Config) -> Result<Self> {
        let pool = db::create_pool(&config.database.url).await?;
        let files = FileStore::new(&config.storage.pdf_dir, &config.storage.render_dir);
        files.init().await?;
        Ok(Self::new(config, pool, files))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the document service
    pub fn service(&self) -> &DocumentService {
        &self.inner.service
    }
}
