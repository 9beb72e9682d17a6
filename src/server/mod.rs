// Server module entry point
// Binds the listener, runs the accept loop and drains connections on shutdown

pub mod connection;
pub mod listener;
pub mod serve;
pub mod signal;

use std::sync::Arc;

use crate::config::{AppState, Config};
use crate::logger;

pub use listener::create_listener;
pub use serve::serve;

/// Bind the configured address and serve until SIGINT/SIGTERM
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.get_socket_addr()?;
    let listener = create_listener(addr, config.server.backlog)?;

    logger::log_server_start(&listener.local_addr()?, &config);

    let state = Arc::new(AppState::new(config));
    let shutdown = Arc::new(tokio::sync::Notify::new());
    signal::start_signal_handler(Arc::clone(&shutdown));

    serve(listener, state, shutdown).await;
    Ok(())
}
