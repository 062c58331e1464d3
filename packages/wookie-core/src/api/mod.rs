//! HTTP API layer.
//!
//! This module contains the [`Gateway`], which owns the collaborators and the
//! route table, and the thin handlers that delegate to them.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::MethodRouter;
use axum::Router;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::{bootstrap_services, bootstrap_with_client, BootstrappedServices};
use crate::config::ConfigStore;
use crate::error::{GatewayError, GatewayResult};
use crate::events::DaemonEvent;
use crate::mpd::{ChangeWatcher, ControlClient};
use crate::runtime::TokioSpawner;
use crate::state::PlaybackState;

pub mod http;
pub mod proxy;
pub mod response;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use http::{create_router, RESERVED_PATHS};
pub use proxy::StreamProxy;

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
#[derive(Clone)]
pub struct AppState {
    /// Control client shared by all handlers.
    pub control: Arc<dyn ControlClient>,
    /// Playback cache maintained by the change watcher.
    pub playback: Arc<PlaybackState>,
    /// Reverse proxy for the audio stream.
    pub proxy: Arc<StreamProxy>,
    /// Deadline for each control call made on behalf of a request.
    pub control_timeout: Duration,
}

/// The HTTP gateway.
///
/// Built once at startup. Extra routes can be added with [`Gateway::route`]
/// until one of the serving methods consumes the gateway.
pub struct Gateway {
    config: ConfigStore,
    state: AppState,
    web_root: PathBuf,
    watcher: Arc<ChangeWatcher>,
    spawner: TokioSpawner,
    cancel_token: CancellationToken,
    extensions: Vec<(String, MethodRouter<AppState>)>,
}

impl Gateway {
    /// Loads the configuration at `path` and connects to the daemon.
    ///
    /// # Errors
    /// `GatewayError::Config` if the configuration is unusable,
    /// `GatewayError::Startup` if the daemon handshake fails.
    pub async fn new(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let config = ConfigStore::load(path)?;
        Self::from_config(config).await
    }

    /// Connects to the daemon named in an already loaded configuration.
    pub async fn from_config(config: ConfigStore) -> GatewayResult<Self> {
        let services = bootstrap_services(&config)?;
        Self::start(config, services).await
    }

    /// Builds a gateway around an existing control client.
    ///
    /// The client's `startup` still runs.
    pub async fn with_client(
        config: ConfigStore,
        client: Arc<dyn ControlClient>,
    ) -> GatewayResult<Self> {
        let services = bootstrap_with_client(&config, client)?;
        Self::start(config, services).await
    }

    async fn start(config: ConfigStore, services: BootstrappedServices) -> GatewayResult<Self> {
        services
            .control
            .startup()
            .await
            .map_err(GatewayError::Startup)?;

        let proxy = StreamProxy::new(services.http_client().clone(), config.stream_url());
        let state = AppState {
            control: services.control,
            playback: services.playback,
            proxy: Arc::new(proxy),
            control_timeout: config.control_timeout(),
        };

        Ok(Self {
            web_root: config.web_root(),
            config,
            state,
            watcher: services.watcher,
            spawner: services.spawner,
            cancel_token: services.cancel_token,
            extensions: Vec::new(),
        })
    }

    /// Registers an extra route, matched before the static file fallback.
    ///
    /// Extension paths are literal: captures and wildcards are not accepted.
    ///
    /// # Errors
    /// `GatewayError::InvalidRoute` if `path` is not a literal absolute path,
    /// `GatewayError::RouteConflict` if it is a built-in or already registered path.
    pub fn route(mut self, path: &str, handler: MethodRouter<AppState>) -> GatewayResult<Self> {
        if !is_literal_path(path) {
            return Err(GatewayError::InvalidRoute(path.to_string()));
        }
        let taken = RESERVED_PATHS.contains(&path)
            || self.extensions.iter().any(|(existing, _)| existing == path);
        if taken {
            return Err(GatewayError::RouteConflict(path.to_string()));
        }

        log::debug!("[Gateway] Registered extension route {}", path);
        self.extensions.push((path.to_string(), handler));
        Ok(self)
    }

    /// State handed to every handler.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Subscribes to daemon change events from the watcher.
    pub fn subscribe_events(&self) -> broadcast::Receiver<DaemonEvent> {
        self.watcher.subscribe()
    }

    /// Freezes the route table without starting the watcher or a listener.
    pub fn into_router(self) -> Router {
        create_router(self.state, &self.web_root, self.extensions)
    }

    /// Starts the watcher and serves until the process is terminated.
    pub async fn listen_and_serve(self) -> GatewayResult<()> {
        self.listen_and_serve_with_shutdown(std::future::pending())
            .await
    }

    /// Starts the watcher and serves until `signal` completes.
    ///
    /// # Errors
    /// `GatewayError::Bind` if the listen port is unavailable,
    /// `GatewayError::Serve` if the listener fails while serving.
    pub async fn listen_and_serve_with_shutdown<F>(self, signal: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let port = self.config.server_port();
        let cancel_token = self.cancel_token.clone();
        self.watcher.start(&self.spawner);

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { port, source })?;
        log::info!("[Gateway] Listening on http://{}", addr);
        log::info!("[Gateway] Serving frontend from {}", self.web_root.display());

        let router = self.into_router();
        let shutdown_token = cancel_token.clone();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = signal => {}
                    _ = shutdown_token.cancelled() => {}
                }
            })
            .await
            .map_err(GatewayError::Serve);

        cancel_token.cancel();
        log::info!("[Gateway] Stopped");
        result
    }
}

/// Returns true for a path axum will register as a plain static route.
fn is_literal_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains(|c: char| c.is_whitespace() || matches!(c, '{' | '}' | '*'))
        && !path.split('/').any(|segment| segment.starts_with(':'))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use axum::http::StatusCode;
    use axum::routing::get;
    use tower::ServiceExt;

    use super::test_fixtures::{body_string, get as get_request, MockControlClient};
    use super::*;

    fn config() -> ConfigStore {
        ConfigStore::from_pairs([
            ("mpd_domain", "127.0.0.1"),
            ("mpd_control_port", "1"),
            ("mpd_http_port", "1"),
            ("server_port", "0"),
            ("turbo_wookie_directory", "/nonexistent"),
        ])
        .expect("valid config")
    }

    #[tokio::test]
    async fn construction_runs_startup() {
        let mock = Arc::new(MockControlClient::default());
        let gateway = Gateway::with_client(config(), mock.clone())
            .await
            .expect("gateway");

        assert_eq!(mock.startup_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.state().proxy.upstream(), "http://127.0.0.1:1/");
    }

    #[tokio::test]
    async fn startup_failure_is_reported() {
        let mock = Arc::new(MockControlClient::failing());
        let result = Gateway::with_client(config(), mock).await;
        assert!(matches!(result, Err(GatewayError::Startup(_))));
    }

    #[tokio::test]
    async fn extension_route_is_reachable() {
        let mock = Arc::new(MockControlClient::default());
        let router = Gateway::with_client(config(), mock)
            .await
            .expect("gateway")
            .route("/health", get(|| async { "ok" }))
            .expect("free path")
            .into_router();

        let response = router
            .oneshot(get_request("/health"))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn reserved_and_duplicate_routes_are_rejected() {
        let mock = Arc::new(MockControlClient::default());
        let gateway = Gateway::with_client(config(), mock).await.expect("gateway");

        let result = gateway.route("/songs", get(|| async { "shadow" }));
        let Err(GatewayError::RouteConflict(path)) = result else {
            panic!("reserved path accepted");
        };
        assert_eq!(path, "/songs");

        let mock = Arc::new(MockControlClient::default());
        let gateway = Gateway::with_client(config(), mock)
            .await
            .expect("gateway")
            .route("/health", get(|| async { "ok" }))
            .expect("free path");
        assert!(matches!(
            gateway.route("/health", get(|| async { "again" })),
            Err(GatewayError::RouteConflict(_))
        ));
    }

    #[tokio::test]
    async fn malformed_route_is_rejected() {
        for path in ["health", "/x/{", "/x/{id}", "/files/{*rest}", "/x/:id", "/a b"] {
            let mock = Arc::new(MockControlClient::default());
            let gateway = Gateway::with_client(config(), mock).await.expect("gateway");
            assert!(
                matches!(
                    gateway.route(path, get(|| async { "ok" })),
                    Err(GatewayError::InvalidRoute(_))
                ),
                "{} accepted",
                path
            );
        }
    }

    #[tokio::test]
    async fn accepted_routes_always_build_a_router() {
        let mock = Arc::new(MockControlClient::default());
        let gateway = Gateway::with_client(config(), mock).await.expect("gateway");

        // A capture that would overlap another is refused up front.
        let gateway = gateway
            .route("/x/id", get(|| async { "id" }))
            .expect("literal path");
        assert!(matches!(
            gateway.route("/x/{name}", get(|| async { "name" })),
            Err(GatewayError::InvalidRoute(_))
        ));

        let mock = Arc::new(MockControlClient::default());
        let router = Gateway::with_client(config(), mock)
            .await
            .expect("gateway")
            .route("/x/id", get(|| async { "id" }))
            .and_then(|g| g.route("/x/id/", get(|| async { "slash" })))
            .expect("distinct literal paths")
            .into_router();

        let response = router
            .oneshot(get_request("/x/id/"))
            .await
            .expect("infallible");
        assert_eq!(body_string(response).await, "slash");
    }

    #[tokio::test]
    async fn serving_stops_on_shutdown_signal() {
        let mock = Arc::new(MockControlClient::default());
        let gateway = Gateway::with_client(config(), mock).await.expect("gateway");

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(gateway.listen_and_serve_with_shutdown(async move {
            let _ = rx.await;
        }));
        let _ = tx.send(());

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server stops")
            .expect("join");
        assert!(result.is_ok());
    }
}
