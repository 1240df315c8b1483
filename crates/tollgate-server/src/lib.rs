//!
//! Tollgate Server - HTTP API for the Tollgate approval platform
//!
//! This module exports all the components of the Tollgate Server.

#![forbid(unsafe_code)]

/// API module
pub mod api;

/// Server module
pub mod server;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

// Re-export key types
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::TollgateServer;

use tollgate_state_inmemory::InMemoryStateProvider;

/// Run function
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    // Initialize logging
    init_logging(&config);

    let state = InMemoryStateProvider::new();
    let server = TollgateServer::new(config, &state);
    server.run().await
}

/// Initialize logging
fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    fmt().with_env_filter(filter).with_target(true).init();
}
