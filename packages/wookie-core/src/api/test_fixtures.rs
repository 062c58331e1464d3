//! Mock control client and helpers shared by router and gateway tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::proxy::StreamProxy;
use super::AppState;
use crate::mpd::{MpdError, MpdLibrary, MpdQueue, MpdResult, MpdSession, Track};
use crate::state::PlaybackState;

/// Cause text every failing mock call returns. Must never reach a client.
pub const MOCK_CAUSE: &str = "mock daemon exploded";

fn mock_failure() -> MpdError {
    MpdError::Protocol(MOCK_CAUSE.to_string())
}

/// Scriptable `ControlClient` with call counters.
#[derive(Default)]
pub struct MockControlClient {
    pub fail: AtomicBool,
    pub tracks: Vec<Track>,
    pub current: Track,
    pub upcoming: Vec<Track>,
    /// When set, `list_tracks` waits for a notification before answering.
    pub list_gate: Option<Arc<Notify>>,
    /// When set, `enqueue` records the uri and then waits for a notification.
    pub enqueue_gate: Option<Arc<Notify>>,
    pub startup_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub current_calls: AtomicUsize,
    pub upcoming_calls: AtomicUsize,
    pub enqueued: Mutex<Vec<String>>,
}

impl MockControlClient {
    pub fn failing() -> Self {
        let mock = Self::default();
        mock.fail.store(true, Ordering::SeqCst);
        mock
    }

    pub fn enqueue_calls(&self) -> usize {
        self.enqueued.lock().len()
    }

    fn check(&self) -> MpdResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(mock_failure())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MpdSession for MockControlClient {
    async fn startup(&self) -> MpdResult<()> {
        self.startup_calls.fetch_add(1, Ordering::SeqCst);
        self.check()
    }
}

#[async_trait]
impl MpdLibrary for MockControlClient {
    async fn list_tracks(&self) -> MpdResult<Vec<Track>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        self.check()?;
        Ok(self.tracks.clone())
    }
}

#[async_trait]
impl MpdQueue for MockControlClient {
    async fn current_track(&self) -> MpdResult<Track> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.current.clone())
    }

    async fn upcoming(&self) -> MpdResult<Vec<Track>> {
        self.upcoming_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.upcoming.clone())
    }

    async fn enqueue(&self, uri: &str) -> MpdResult<()> {
        self.enqueued.lock().push(uri.to_string());
        if let Some(gate) = &self.enqueue_gate {
            gate.notified().await;
        }
        self.check()
    }
}

/// Builds an `AppState` around a mock client.
pub fn test_state(control: Arc<MockControlClient>, upstream: &str) -> AppState {
    AppState {
        control,
        playback: Arc::new(PlaybackState::new()),
        proxy: Arc::new(StreamProxy::new(
            crate::bootstrap::create_http_client().expect("http client"),
            upstream,
        )),
        control_timeout: Duration::from_secs(5),
    }
}

pub fn track(file: &str) -> Track {
    [("file", file), ("Title", file)].into_iter().collect()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
