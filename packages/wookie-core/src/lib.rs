//! Wookie Core - shared library for the Turbo Wookie jukebox gateway.
//!
//! Turbo Wookie puts a music daemon (MPD) behind a single HTTP port: the web
//! frontend is served as static files, the daemon's library and queue are
//! exposed as JSON endpoints, and the daemon's audio stream is reverse-proxied.
//!
//! # Architecture
//!
//! - [`config`]: Key/value configuration loaded from YAML
//! - [`mpd`]: MPD line protocol, control client and change watcher
//! - [`api`]: The [`Gateway`], its route table and handlers
//! - [`state`]: Playback cache kept fresh by the change watcher
//! - [`events`]: Daemon change events
//! - [`runtime`]: Task spawning abstraction
//! - [`error`]: Startup and serving errors
//!
//! # Abstraction Traits
//!
//! - [`ControlClient`](mpd::ControlClient): Everything the gateway asks of the
//!   daemon. [`MpdClient`](mpd::MpdClient) is the production implementation.
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod events;
pub mod mpd;
pub mod protocol_constants;
pub mod runtime;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use config::{ConfigError, ConfigResult, ConfigStore};
pub use error::{GatewayError, GatewayResult};
pub use events::{DaemonEvent, Subsystem};
pub use protocol_constants::SERVICE_ID;
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{PlaybackSnapshot, PlaybackState};
pub use utils::now_millis;

// Re-export MPD types
pub use mpd::{
    ChangeWatcher, ControlClient, MpdClient, MpdError, MpdLibrary, MpdQueue, MpdResult,
    MpdSession, PlayerState, Track,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, bootstrap_with_client, BootstrappedServices};

// Re-export API types
pub use api::{AppState, Gateway, StreamProxy};
