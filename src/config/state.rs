// Application state module
// Immutable configuration shared by every request handler

use super::types::{Config, StorageConfig};

/// Application state
///
/// Built once at startup and handed to handlers behind an `Arc`.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
}

impl AppState {
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    pub const fn storage(&self) -> &StorageConfig {
        &self.config.storage
    }

    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
