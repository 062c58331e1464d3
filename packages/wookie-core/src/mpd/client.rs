//! `MpdClient` - concrete implementation of the control traits.
//!
//! Holds one persistent connection to the daemon's control port. Commands
//! from concurrent callers are serialized on that connection by an async
//! mutex. A broken connection is dropped and re-established on the next
//! command; a command that fails on a connection which had been sitting
//! idle is retried once on a fresh connection (MPD closes idle clients
//! after its `connection_timeout`).

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::protocol::{parse_single_track, parse_tracks, Command, MpdConnection, MpdResult, Pair};
use super::traits::{MpdLibrary, MpdQueue, MpdSession};
use super::types::{PlayerState, PlayerStatus, Track};

/// MPD control client over a single shared connection.
pub struct MpdClient {
    addr: String,
    connection: Mutex<Option<MpdConnection>>,
}

impl MpdClient {
    /// Creates a client for `host:port`. No connection is made until the first command.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connection: Mutex::new(None),
        }
    }

    /// Address of the daemon's control port.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Runs one command, reconnecting once if a reused connection turns out to be dead.
    async fn execute(&self, command: Command) -> MpdResult<Vec<Pair>> {
        let mut slot = self.connection.lock().await;
        let reused = slot.is_some();

        match self.execute_on(&mut slot, &command).await {
            Err(e) if reused && e.is_connection() => {
                log::warn!(
                    "[Mpd] {} failed on existing connection ({}), reconnecting",
                    command.name(),
                    e
                );
                self.execute_on(&mut slot, &command).await
            }
            result => result,
        }
    }

    async fn execute_on(
        &self,
        slot: &mut Option<MpdConnection>,
        command: &Command,
    ) -> MpdResult<Vec<Pair>> {
        // The connection stays out of the slot while a command is in flight. If
        // the caller drops this future mid-response, the half-read connection is
        // dropped with it and the next command starts on a fresh one.
        let mut connection = match slot.take() {
            Some(connection) => connection,
            None => {
                let connection = MpdConnection::connect(&self.addr).await?;
                log::info!(
                    "[Mpd] Connected to {} (protocol {})",
                    self.addr,
                    connection.version()
                );
                connection
            }
        };

        let result = connection.execute(command).await;
        match &result {
            Err(e) if e.is_connection() => {
                log::debug!("[Mpd] Dropping connection after {}: {}", command.name(), e);
            }
            _ => *slot = Some(connection),
        }
        result
    }

    async fn status(&self) -> MpdResult<PlayerStatus> {
        let pairs = self.execute(Command::new("status")).await?;
        Ok(PlayerStatus::from_pairs(&pairs))
    }
}

#[async_trait]
impl MpdSession for MpdClient {
    /// Connects and switches the queue to consume mode, so played songs drop
    /// off the queue and `upcoming` reflects what is left to play.
    async fn startup(&self) -> MpdResult<()> {
        self.execute(Command::new("ping")).await?;
        self.execute(Command::new("consume").arg("1")).await?;
        log::info!("[Mpd] Startup complete for {}", self.addr);
        Ok(())
    }
}

#[async_trait]
impl MpdLibrary for MpdClient {
    async fn list_tracks(&self) -> MpdResult<Vec<Track>> {
        let pairs = self.execute(Command::new("listallinfo")).await?;
        let tracks = parse_tracks(pairs);
        log::debug!("[Mpd] listallinfo returned {} track(s)", tracks.len());
        Ok(tracks)
    }
}

#[async_trait]
impl MpdQueue for MpdClient {
    async fn current_track(&self) -> MpdResult<Track> {
        let pairs = self.execute(Command::new("currentsong")).await?;
        Ok(parse_single_track(pairs))
    }

    async fn upcoming(&self) -> MpdResult<Vec<Track>> {
        let status = self.status().await?;
        let queue = parse_tracks(self.execute(Command::new("playlistinfo")).await?);

        let skip = match status.song_pos {
            Some(pos) if status.state != Some(PlayerState::Stop) => pos + 1,
            _ => 0,
        };
        Ok(queue.into_iter().skip(skip).collect())
    }

    /// Appends the song and starts playback if the player is stopped.
    async fn enqueue(&self, uri: &str) -> MpdResult<()> {
        self.execute(Command::new("add").arg(uri)).await?;
        log::info!("[Mpd] Added {}", uri);

        if self.status().await?.state == Some(PlayerState::Stop) {
            self.execute(Command::new("play")).await?;
            log::info!("[Mpd] Player was stopped, started playback");
        }
        Ok(())
    }
}
