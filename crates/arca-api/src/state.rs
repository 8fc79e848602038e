//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. Cloning is cheap: the repository wraps a connection
//! pool and the rest sits behind `Arc`.

use std::sync::Arc;

use arca_catalog::{CatalogError, Repository};

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;

#[derive(Debug, Clone)]
pub struct AppState {
    pub repository: Repository,
    pub config: Arc<AppConfig>,
    pub metrics: ApiMetrics,
}

impl AppState {
    pub fn new(repository: Repository, config: AppConfig) -> Self {
        Self {
            repository,
            config: Arc::new(config),
            metrics: ApiMetrics::new(),
        }
    }

    /// Open the repository rooted at `config.root` and build the state.
    pub async fn open(config: AppConfig) -> Result<Self, CatalogError> {
        let repository = Repository::open(&config.layout(), &config.package_extension).await?;
        Ok(Self::new(repository, config))
    }
}
