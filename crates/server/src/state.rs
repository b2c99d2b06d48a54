use std::sync::Arc;
use fanpass_core::{Config, Optimizer, SqliteCatalog};

/// Shared application state
pub struct AppState {
    config: Config,
    catalog: Arc<SqliteCatalog>,
    optimizer: Arc<Optimizer>,
}

impl AppState {
    pub fn new(config: Config, catalog: Arc<SqliteCatalog>, optimizer: Arc<Optimizer>) -> Self {
        Self {
            config,
            catalog,
            optimizer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The stored catalog, used for browsing and imports.
    pub fn catalog(&self) -> &SqliteCatalog {
        self.catalog.as_ref()
    }

    pub fn optimizer(&self) -> &Optimizer {
        self.optimizer.as_ref()
    }
}
