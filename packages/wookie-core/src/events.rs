//! Daemon change events published by the change watcher.

use serde::Serialize;

/// MPD subsystem named in a `changed:` idle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    Player,
    Playlist,
    Database,
    Options,
    Mixer,
    Other,
}

impl Subsystem {
    /// Maps the protocol name to a subsystem.
    pub fn parse(name: &str) -> Self {
        match name {
            "player" => Self::Player,
            "playlist" => Self::Playlist,
            "database" => Self::Database,
            "options" => Self::Options,
            "mixer" => Self::Mixer,
            _ => Self::Other,
        }
    }
}

/// Something the watcher observed on the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DaemonEvent {
    /// The watcher (re)established its connection.
    Connected,
    /// The watcher lost its connection and will retry.
    Disconnected,
    /// MPD reported a change in a subsystem.
    Changed { subsystem: Subsystem },
}
