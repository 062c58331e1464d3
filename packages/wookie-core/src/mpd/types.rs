//! Domain types returned by the MPD client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single song as reported by MPD.
///
/// MPD describes songs as flat `key: value` attribute lists (`file`, `Title`,
/// `Artist`, `Time`, `Pos`, ...). The set of attributes depends on the tags
/// present in the file and the MPD version, so the track is kept as an
/// ordered map and serialized as a plain JSON object. When a tag repeats, the
/// last value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track(BTreeMap<String, String>);

impl Track {
    /// Creates an empty track.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns an attribute value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The song URI relative to the music directory.
    pub fn file(&self) -> Option<&str> {
        self.get("file")
    }

    /// Returns `true` if MPD reported no attributes (e.g. nothing is playing).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Track {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Player state from the `state` field of `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Play,
    Pause,
    Stop,
}

impl PlayerState {
    /// Parses the protocol representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "play" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// The subset of `status` the gateway cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStatus {
    pub state: Option<PlayerState>,
    /// Position of the current song in the queue.
    pub song_pos: Option<usize>,
    /// Queue version, bumped by MPD on every queue change.
    pub playlist_version: Option<u64>,
    pub playlist_length: usize,
}

impl PlayerStatus {
    /// Builds a status from `status` response pairs, ignoring unknown keys.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut status = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "state" => status.state = PlayerState::parse(value),
                "song" => status.song_pos = value.parse().ok(),
                "playlist" => status.playlist_version = value.parse().ok(),
                "playlistlength" => status.playlist_length = value.parse().unwrap_or(0),
                _ => {}
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn track_serializes_as_plain_object() {
        let track: Track = [("file", "a/b.mp3"), ("Title", "B")].into_iter().collect();
        let json = serde_json::to_value(&track).expect("serialize");
        assert_eq!(json, serde_json::json!({ "file": "a/b.mp3", "Title": "B" }));
        assert_eq!(track.file(), Some("a/b.mp3"));
    }

    #[test]
    fn status_parses_known_fields() {
        let status = PlayerStatus::from_pairs(&pairs(&[
            ("volume", "80"),
            ("state", "play"),
            ("song", "2"),
            ("playlist", "17"),
            ("playlistlength", "5"),
        ]));
        assert_eq!(status.state, Some(PlayerState::Play));
        assert_eq!(status.song_pos, Some(2));
        assert_eq!(status.playlist_version, Some(17));
        assert_eq!(status.playlist_length, 5);
    }

    #[test]
    fn stopped_status_has_no_song() {
        let status = PlayerStatus::from_pairs(&pairs(&[("state", "stop")]));
        assert_eq!(status.state, Some(PlayerState::Stop));
        assert_eq!(status.song_pos, None);
    }
}
