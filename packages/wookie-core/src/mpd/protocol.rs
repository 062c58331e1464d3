//! Low-level MPD control protocol implementation.
//!
//! This module handles command encoding, the connection greeting and
//! response parsing. For the high-level client, see `client.rs`.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

use super::types::Track;
use crate::protocol_constants::{
    MPD_ACK_PREFIX, MPD_CONNECT_TIMEOUT_SECS, MPD_GREETING_PREFIX, MPD_OK,
};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to MPD.
#[derive(Debug, Error)]
pub enum MpdError {
    /// Socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connecting to MPD did not complete in time.
    #[error("Timed out connecting to MPD")]
    ConnectTimeout,

    /// The server did not greet us like MPD does.
    #[error("Unexpected greeting: {0:?}")]
    Greeting(String),

    /// MPD rejected the command.
    #[error("MPD error {code} in {{{command}}}: {message}")]
    Ack {
        code: u32,
        command: String,
        message: String,
    },

    /// MPD sent something we could not parse.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A command argument cannot be encoded on a single protocol line.
    #[error("Invalid argument: {0:?}")]
    InvalidArgument(String),

    /// MPD closed the connection.
    #[error("Connection closed by MPD")]
    Closed,
}

/// Convenient Result alias for MPD operations.
pub type MpdResult<T> = Result<T, MpdError>;

impl MpdError {
    /// Returns true if the error means the connection is unusable.
    ///
    /// Command-level errors (`Ack`, `InvalidArgument`) leave the connection
    /// in a good state and are never worth a reconnect.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::ConnectTimeout | Self::Closed | Self::Greeting(_) | Self::Protocol(_)
        )
    }
}

/// A `key: value` line from an MPD response.
pub type Pair = (String, String);

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// A single protocol command with quoted arguments.
///
/// # Example
/// ```ignore
/// let line = Command::new("add").arg("Artist/Album/01 Song.flac").encode()?;
/// assert_eq!(line, "add \"Artist/Album/01 Song.flac\"\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    args: Vec<String>,
}

impl Command {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// The command name, for logging.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Encodes the command as one newline-terminated protocol line.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if an argument contains a line break, which
    /// would otherwise let it smuggle a second command onto the wire.
    pub fn encode(&self) -> MpdResult<String> {
        let mut line = String::from(self.name);
        for arg in &self.args {
            if arg.contains(['\n', '\r']) {
                return Err(MpdError::InvalidArgument(arg.clone()));
            }
            line.push(' ');
            line.push_str(&quote_arg(arg));
        }
        line.push('\n');
        Ok(line)
    }
}

/// Quotes an argument, escaping backslashes and double quotes.
pub fn quote_arg(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parses an `ACK [code@index] {command} message` line.
pub fn parse_ack(line: &str) -> MpdError {
    let malformed = || MpdError::Protocol(format!("malformed ACK line: {:?}", line));

    let Some(rest) = line.strip_prefix(MPD_ACK_PREFIX) else {
        return malformed();
    };
    let Some((header, rest)) = rest
        .strip_prefix('[')
        .and_then(|r| r.split_once(']'))
    else {
        return malformed();
    };
    let Some(code) = header
        .split_once('@')
        .and_then(|(code, _index)| code.parse::<u32>().ok())
    else {
        return malformed();
    };
    let Some((command, message)) = rest
        .trim_start()
        .strip_prefix('{')
        .and_then(|r| r.split_once('}'))
    else {
        return malformed();
    };

    MpdError::Ack {
        code,
        command: command.to_string(),
        message: message.trim().to_string(),
    }
}

/// Reads one command response up to its `OK` terminator.
pub async fn read_response<R>(reader: &mut R) -> MpdResult<Vec<Pair>>
where
    R: AsyncBufRead + Unpin,
{
    let mut pairs = Vec::new();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(MpdError::Closed);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);

        if trimmed == MPD_OK {
            return Ok(pairs);
        }
        if trimmed.starts_with(MPD_ACK_PREFIX) {
            return Err(parse_ack(trimmed));
        }
        match trimmed.split_once(": ") {
            Some((key, value)) => pairs.push((key.to_string(), value.to_string())),
            None => {
                return Err(MpdError::Protocol(format!(
                    "unexpected response line: {:?}",
                    trimmed
                )))
            }
        }
    }
}

/// Splits a flat response into song records.
///
/// Each record starts at a `file` key. `directory` and `playlist` keys start
/// records that are not songs; they and their attributes are dropped.
pub fn parse_tracks(pairs: Vec<Pair>) -> Vec<Track> {
    let mut tracks = Vec::new();
    let mut current: Option<Track> = None;
    let mut in_song = false;

    for (key, value) in pairs {
        match key.as_str() {
            "file" => {
                tracks.extend(current.take());
                let mut track = Track::new();
                track.insert(key, value);
                current = Some(track);
                in_song = true;
            }
            "directory" | "playlist" => {
                tracks.extend(current.take());
                in_song = false;
            }
            _ if in_song => {
                if let Some(track) = current.as_mut() {
                    track.insert(key, value);
                }
            }
            _ => {}
        }
    }
    tracks.extend(current);
    tracks
}

/// Collects a single-record response (e.g. `currentsong`) into a track.
pub fn parse_single_track(pairs: Vec<Pair>) -> Track {
    pairs.into_iter().collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────────────────────────

/// One established, greeted connection to MPD.
pub struct MpdConnection {
    stream: BufStream<TcpStream>,
    version: String,
}

impl MpdConnection {
    /// Connects to `addr` and consumes the `OK MPD <version>` greeting.
    pub async fn connect(addr: &str) -> MpdResult<Self> {
        let tcp = tokio::time::timeout(
            Duration::from_secs(MPD_CONNECT_TIMEOUT_SECS),
            TcpStream::connect(addr),
        )
        .await
        .map_err(|_| MpdError::ConnectTimeout)??;
        tcp.set_nodelay(true)?;

        let mut stream = BufStream::new(tcp);
        let mut greeting = String::new();
        if stream.read_line(&mut greeting).await? == 0 {
            return Err(MpdError::Closed);
        }
        let greeting = greeting.trim_end();
        let version = greeting
            .strip_prefix(MPD_GREETING_PREFIX)
            .ok_or_else(|| MpdError::Greeting(greeting.to_string()))?
            .to_string();

        log::debug!("[Mpd] Connected to {} (protocol {})", addr, version);
        Ok(Self { stream, version })
    }

    /// Protocol version announced in the greeting.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Sends a command and reads its full response.
    pub async fn execute(&mut self, command: &Command) -> MpdResult<Vec<Pair>> {
        let line = command.encode()?;
        log::trace!("[Mpd] -> {}", line.trim_end());
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await?;
        read_response(&mut self.stream).await
    }
}
