//! Application bootstrap and dependency wiring.
//!
//! This is the composition root: the one place where the control client,
//! the change watcher, the proxy's HTTP client and the shutdown token are
//! created and wired together.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::config::ConfigStore;
use crate::error::GatewayResult;
use crate::mpd::{ChangeWatcher, ControlClient, MpdClient};
use crate::protocol_constants::STREAM_CONNECT_TIMEOUT_SECS;
use crate::runtime::TokioSpawner;
use crate::state::PlaybackState;

/// Container for all bootstrapped services.
///
/// Consumed by the `Gateway` to build its `AppState`.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Control client shared by all request handlers.
    pub control: Arc<dyn ControlClient>,
    /// Playback cache written by the watcher.
    pub playback: Arc<PlaybackState>,
    /// Background `idle` watcher (not yet started).
    pub watcher: Arc<ChangeWatcher>,
    /// HTTP client used by the stream proxy.
    http_client: Client,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Returns the shared HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }
}

/// Creates the HTTP client for the stream proxy.
///
/// Only the connect phase is bounded: the proxied audio stream never ends.
pub fn create_http_client() -> GatewayResult<Client> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(STREAM_CONNECT_TIMEOUT_SECS))
        // Redirects are relayed to the listener as-is.
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}

/// Bootstraps all services against the daemon named in `config`.
///
/// Must be called from within a Tokio runtime.
pub fn bootstrap_services(config: &ConfigStore) -> GatewayResult<BootstrappedServices> {
    let client: Arc<dyn ControlClient> = Arc::new(MpdClient::new(config.control_addr()));
    bootstrap_with_client(config, client)
}

/// Bootstraps services around an existing control client.
///
/// The watcher still connects to the address in `config`.
pub fn bootstrap_with_client(
    config: &ConfigStore,
    control: Arc<dyn ControlClient>,
) -> GatewayResult<BootstrappedServices> {
    let cancel_token = CancellationToken::new();
    let playback = Arc::new(PlaybackState::new());
    let watcher = Arc::new(ChangeWatcher::new(
        config.control_addr(),
        Arc::clone(&playback),
        cancel_token.child_token(),
    ));

    log::debug!(
        "[Bootstrap] Control at {}, stream at {}",
        config.control_addr(),
        config.stream_url()
    );

    Ok(BootstrappedServices {
        control,
        playback,
        watcher,
        http_client: create_http_client()?,
        spawner: TokioSpawner::current(),
        cancel_token,
    })
}
