// Configuration module entry point
// Loads layered configuration and exposes the shared application state

mod state;
mod types;

use std::net::SocketAddr;
use std::path::PathBuf;

pub use state::AppState;
pub use types::{Config, LoggingConfig, PerformanceConfig, ServerConfig, StorageConfig};

/// Default config file name (extension resolved by the `config` crate)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from `config_path`, then `FILEDROP_*` environment variables.
    ///
    /// Nested keys use `__`, e.g. `FILEDROP_STORAGE__BASE_PATH=/srv/files`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FILEDROP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8123)?
            .set_default("server.backlog", 128)?
            .set_default("storage.base_path", ".")?
            .set_default("storage.disable_directory_listing", false)?
            .set_default("storage.keep_partial_uploads_on_error", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.shutdown_grace_period", 5)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Canonicalize the base path in place.
    ///
    /// Fails if it does not exist or is not a directory.
    pub fn resolve_base_path(&mut self) -> Result<(), String> {
        let base = &self.storage.base_path;
        let canonical: PathBuf = base
            .canonicalize()
            .map_err(|e| format!("Base path '{}' is not accessible: {e}", base.display()))?;
        if !canonical.is_dir() {
            return Err(format!(
                "Base path '{}' is not a directory",
                canonical.display()
            ));
        }
        self.storage.base_path = canonical;
        Ok(())
    }
}
