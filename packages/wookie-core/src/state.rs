//! Cached daemon state kept fresh by the change watcher.
//!
//! Request handlers never read from here; they always ask the daemon. The
//! cache exists for consumers that want cheap, possibly slightly stale
//! answers (the health endpoint, event subscribers).

use parking_lot::RwLock;
use serde::Serialize;

use crate::mpd::types::{PlayerState, PlayerStatus, Track};
use crate::utils::now_millis;

/// Point-in-time copy of the cached state.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    /// Whether the watcher currently holds a connection to the daemon.
    pub connected: bool,
    /// Last known player state.
    pub state: Option<PlayerState>,
    /// Last known current song (`None` when nothing is playing).
    pub current: Option<Track>,
    /// Last known queue version.
    pub playlist_version: Option<u64>,
    /// Unix timestamp (ms) of the last update, 0 if never updated.
    pub updated_at_ms: u64,
}

/// Shared playback cache.
///
/// Written only by the change watcher; read from anywhere.
#[derive(Debug, Default)]
pub struct PlaybackState {
    inner: RwLock<PlaybackSnapshot>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current cache contents.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.read().clone()
    }

    /// Records a fresh `currentsong` + `status` pair.
    pub fn update(&self, current: Track, status: &PlayerStatus) {
        let mut inner = self.inner.write();
        inner.connected = true;
        inner.state = status.state;
        inner.current = if current.is_empty() { None } else { Some(current) };
        inner.playlist_version = status.playlist_version;
        inner.updated_at_ms = now_millis();
    }

    /// Marks the watcher connection as lost, keeping the last known values.
    pub fn mark_disconnected(&self) {
        let mut inner = self.inner.write();
        inner.connected = false;
        inner.updated_at_ms = now_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_replaces_current_and_marks_connected() {
        let state = PlaybackState::new();
        let track: Track = [("file", "a.mp3")].into_iter().collect();
        let status = PlayerStatus {
            state: Some(PlayerState::Play),
            playlist_version: Some(4),
            ..Default::default()
        };

        state.update(track.clone(), &status);
        let snap = state.snapshot();
        assert!(snap.connected);
        assert_eq!(snap.current, Some(track));
        assert_eq!(snap.playlist_version, Some(4));
        assert!(snap.updated_at_ms > 0);
    }

    #[test]
    fn empty_current_song_is_none() {
        let state = PlaybackState::new();
        state.update(Track::new(), &PlayerStatus::default());
        assert_eq!(state.snapshot().current, None);
    }

    #[test]
    fn disconnect_keeps_last_known_values() {
        let state = PlaybackState::new();
        let track: Track = [("file", "a.mp3")].into_iter().collect();
        state.update(track.clone(), &PlayerStatus::default());
        state.mark_disconnected();

        let snap = state.snapshot();
        assert!(!snap.connected);
        assert_eq!(snap.current, Some(track));
    }
}
