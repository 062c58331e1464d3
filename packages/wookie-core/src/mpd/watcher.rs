//! Change watcher - keeps the playback cache in sync with the daemon.
//!
//! Runs on its own connection, separate from the request-serving client,
//! because `idle` blocks the connection until something changes. Each
//! `changed:` notification triggers a `currentsong` + `status` refresh of
//! [`PlaybackState`] and is then broadcast as a [`DaemonEvent`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::protocol::{parse_single_track, Command, MpdConnection, MpdResult};
use super::types::PlayerStatus;
use crate::events::{DaemonEvent, Subsystem};
use crate::protocol_constants::{
    EVENT_CHANNEL_CAPACITY, WATCHED_SUBSYSTEMS, WATCHER_RECONNECT_DELAYS_MS,
};
use crate::runtime::TaskSpawner;
use crate::state::PlaybackState;

/// Background task that waits on MPD `idle` notifications.
pub struct ChangeWatcher {
    addr: String,
    state: Arc<PlaybackState>,
    events: broadcast::Sender<DaemonEvent>,
    cancel: CancellationToken,
    reconnect_delays: Vec<Duration>,
}

impl ChangeWatcher {
    pub fn new(
        addr: impl Into<String>,
        state: Arc<PlaybackState>,
        cancel: CancellationToken,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            addr: addr.into(),
            state,
            events,
            cancel,
            reconnect_delays: WATCHER_RECONNECT_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }

    /// Replaces the reconnect backoff schedule. The last delay repeats.
    #[must_use]
    pub fn with_reconnect_delays(mut self, delays: Vec<Duration>) -> Self {
        if !delays.is_empty() {
            self.reconnect_delays = delays;
        }
        self
    }

    /// Subscribes to daemon events. Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<DaemonEvent> {
        self.events.subscribe()
    }

    /// Shared cache this watcher writes to.
    pub fn state(&self) -> &Arc<PlaybackState> {
        &self.state
    }

    /// Spawns the watch loop. It runs until the cancellation token fires.
    pub fn start<S: TaskSpawner>(self: &Arc<Self>, spawner: &S) {
        let watcher = Arc::clone(self);
        spawner.spawn(async move { watcher.run().await });
    }

    async fn run(&self) {
        log::info!("[Watcher] Watching {} for changes", self.addr);
        let mut attempt = 0usize;

        loop {
            let session = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.watch_session(&mut attempt) => result,
            };

            let Err(e) = session else { break };
            self.state.mark_disconnected();
            let _ = self.events.send(DaemonEvent::Disconnected);

            let delay = self.delay_for(attempt);
            attempt += 1;
            log::warn!(
                "[Watcher] Lost connection to {}: {} (retrying in {:?})",
                self.addr,
                e,
                delay
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        log::info!("[Watcher] Stopped");
    }

    /// One connected session. Only returns on error.
    async fn watch_session(&self, attempt: &mut usize) -> MpdResult<()> {
        let mut connection = MpdConnection::connect(&self.addr).await?;
        self.refresh(&mut connection).await?;
        *attempt = 0;
        log::info!("[Watcher] Connected (protocol {})", connection.version());
        let _ = self.events.send(DaemonEvent::Connected);

        let idle = WATCHED_SUBSYSTEMS
            .iter()
            .fold(Command::new("idle"), |cmd, subsystem| cmd.arg(*subsystem));

        loop {
            let changed = connection.execute(&idle).await?;
            self.refresh(&mut connection).await?;

            for (key, value) in changed {
                if key != "changed" {
                    continue;
                }
                let subsystem = Subsystem::parse(&value);
                log::debug!("[Watcher] {} changed", value);
                // No receivers is fine.
                let _ = self.events.send(DaemonEvent::Changed { subsystem });
            }
        }
    }

    async fn refresh(&self, connection: &mut MpdConnection) -> MpdResult<()> {
        let current = parse_single_track(connection.execute(&Command::new("currentsong")).await?);
        let status = PlayerStatus::from_pairs(&connection.execute(&Command::new("status")).await?);
        self.state.update(current, &status);
        Ok(())
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        self.reconnect_delays
            .get(attempt)
            .or_else(|| self.reconnect_delays.last())
            .copied()
            .unwrap_or(Duration::from_secs(1))
    }
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("addr", &self.addr)
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}
