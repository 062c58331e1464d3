//! Trait abstractions for MPD operations.
//!
//! The gateway depends on these traits rather than on [`MpdClient`], so
//! handlers can be exercised against fake clients and the gateway stays
//! agnostic of the wire protocol.
//!
//! Implementations are shared across concurrently running request handlers
//! and must be safe to call concurrently (or serialize internally).
//!
//! [`MpdClient`]: super::client::MpdClient

use async_trait::async_trait;

use super::protocol::MpdResult;
use super::types::Track;

/// One-time connection setup.
#[async_trait]
pub trait MpdSession: Send + Sync {
    /// Connects to the daemon and prepares it for jukebox use.
    ///
    /// The gateway refuses to start if this fails.
    async fn startup(&self) -> MpdResult<()>;
}

/// Read access to the music database.
#[async_trait]
pub trait MpdLibrary: Send + Sync {
    /// Lists every song in the database, in database order.
    async fn list_tracks(&self) -> MpdResult<Vec<Track>>;
}

/// Queue inspection and control.
#[async_trait]
pub trait MpdQueue: Send + Sync {
    /// Returns the song currently playing (empty if none).
    async fn current_track(&self) -> MpdResult<Track>;

    /// Returns the songs queued after the current one.
    async fn upcoming(&self) -> MpdResult<Vec<Track>>;

    /// Appends a song to the queue.
    ///
    /// # Arguments
    /// * `uri` - Song URI relative to the music directory (the `file` attribute)
    async fn enqueue(&self, uri: &str) -> MpdResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Traits (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Combined trait for everything the gateway needs from the daemon.
///
/// Used by `AppState` to hold a single `Arc<dyn ControlClient>`.
#[async_trait]
pub trait ControlClient: MpdSession + MpdLibrary + MpdQueue {}

/// Blanket implementation for any type implementing all traits.
impl<T: MpdSession + MpdLibrary + MpdQueue> ControlClient for T {}
