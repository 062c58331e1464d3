//! MPD control and change notification.
//!
//! # Module Structure
//!
//! - `types` - Domain types for tracks and player status
//! - `protocol` - Line protocol encoding, response parsing, single connection
//! - `traits` - Trait abstractions for testability
//! - `client` - `MpdClient` concrete trait implementation
//! - `watcher` - `idle`-driven change watcher feeding the playback cache

pub mod client;
pub mod protocol;
pub mod traits;
pub mod types;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export domain types
pub use types::{PlayerState, PlayerStatus, Track};

// Re-export protocol errors
pub use protocol::{MpdError, MpdResult};

// Re-export trait abstractions
pub use traits::{ControlClient, MpdLibrary, MpdQueue, MpdSession};

// Re-export concrete implementations
pub use client::MpdClient;
pub use watcher::ChangeWatcher;
