//! Centralized error types for the gateway library.
//!
//! Per-request failures never surface as these types; handlers map them to
//! fixed client messages (see `api::response`). `GatewayError` covers the
//! faults that stop the gateway from starting or serving.

use thiserror::Error;

use crate::config::ConfigError;
use crate::mpd::MpdError;

/// Errors raised while constructing or running the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration could not be loaded. The caller may retry with another source.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The initial handshake with the daemon failed.
    #[error("MPD startup failed: {0}")]
    Startup(#[source] MpdError),

    /// An extension route collides with a built-in or already registered path.
    #[error("Route already registered: {0}")]
    RouteConflict(String),

    /// An extension route path is not a valid absolute path.
    #[error("Invalid route path: {0:?}")]
    InvalidRoute(String),

    /// The outbound HTTP client used by the stream proxy could not be built.
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The listen socket could not be bound.
    #[error("Failed to bind to port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The listener failed while serving.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Convenient Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
