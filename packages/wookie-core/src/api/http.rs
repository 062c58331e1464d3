//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to the control client and turn its
//! result into a response. Each control call runs under the per-request
//! deadline from the configuration.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use axum::{
    extract::{rejection::FormRejection, rejection::QueryRejection, Form, Query, State},
    http::StatusCode,
    response::Response,
    routing::{any, get, MethodRouter},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::services::ServeDir;

use crate::api::proxy::stream_proxy;
use crate::api::response::{error_response, json_response};
use crate::api::AppState;
use crate::mpd::MpdError;
use crate::protocol_constants::STREAM_PATH;

// ─────────────────────────────────────────────────────────────────────────────
// Client Messages
// ─────────────────────────────────────────────────────────────────────────────

// The frontend matches on these strings; the spelling of the first one is part
// of the contract.
pub const LIST_TRACKS_FAILED: &str = "An error occured while processing your request";
pub const CURRENT_FAILED: &str = "Couldn't get current song info";
pub const UPCOMING_FAILED: &str = "Couldn't get upcoming playlist";
pub const NO_SONG: &str = "No song specified";
pub const UNKNOWN_SONG: &str = "Unknown song";

/// Paths owned by the gateway itself. Extension routes may not use them.
pub const RESERVED_PATHS: [&str; 5] = [STREAM_PATH, "/songs", "/current", "/upcoming", "/add"];

// ─────────────────────────────────────────────────────────────────────────────
// Control Call Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Why a control call produced no value.
enum ControlFault {
    Failed(MpdError),
    TimedOut(Duration),
}

impl ControlFault {
    /// Maps the fault to `status` (or `504` on timeout) with a fixed message.
    fn respond(self, status: StatusCode, message: &str) -> Response {
        match self {
            Self::Failed(e) => error_response(status, message, Some(&e)),
            Self::TimedOut(limit) => {
                let cause = format!("control call exceeded {:?}", limit);
                error_response(StatusCode::GATEWAY_TIMEOUT, message, Some(&cause))
            }
        }
    }
}

async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, ControlFault>
where
    F: Future<Output = Result<T, MpdError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ControlFault::Failed(e)),
        Err(_) => Err(ControlFault::TimedOut(limit)),
    }
}

/// Serializes a control result, or reports the fixed failure message.
async fn respond_with<T, F>(state: &AppState, call: F, message: &str) -> Response
where
    T: Serialize,
    F: Future<Output = Result<T, MpdError>>,
{
    match with_deadline(state.control_timeout, call).await {
        Ok(value) => json_response(&value),
        Err(fault) => fault.respond(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SongParams {
    song: Option<String>,
}

impl SongParams {
    fn song(self) -> Option<String> {
        self.song.filter(|s| !s.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the router: built-in routes first, then extension routes, then the
/// static file server for everything else.
pub fn create_router(
    state: AppState,
    web_root: &Path,
    extensions: Vec<(String, MethodRouter<AppState>)>,
) -> Router {
    let mut router = Router::new()
        .route(STREAM_PATH, any(stream_proxy))
        .route("/songs", get(list_songs))
        .route("/current", get(current_song))
        .route("/upcoming", get(upcoming_songs))
        .route("/add", get(add_song).post(add_song));

    for (path, route) in extensions {
        router = router.route(&path, route);
    }

    router
        .fallback_service(ServeDir::new(web_root))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Control Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn list_songs(State(state): State<AppState>) -> Response {
    respond_with(&state, state.control.list_tracks(), LIST_TRACKS_FAILED).await
}

async fn current_song(State(state): State<AppState>) -> Response {
    respond_with(&state, state.control.current_track(), CURRENT_FAILED).await
}

async fn upcoming_songs(State(state): State<AppState>) -> Response {
    respond_with(&state, state.control.upcoming(), UPCOMING_FAILED).await
}

/// Enqueues the song named by `song`, read from the form body first and then
/// from the query string.
async fn add_song(
    State(state): State<AppState>,
    query: Result<Query<SongParams>, QueryRejection>,
    form: Result<Form<SongParams>, FormRejection>,
) -> Response {
    let song = form
        .ok()
        .and_then(|Form(params)| params.song())
        .or_else(|| query.ok().and_then(|Query(params)| params.song()));

    let Some(song) = song else {
        return error_response(StatusCode::BAD_REQUEST, NO_SONG, None);
    };

    match with_deadline(state.control_timeout, state.control.enqueue(&song)).await {
        Ok(()) => json_response(&json!({ "note": format!("Added song: {}", song) })),
        Err(fault) => {
            if let ControlFault::TimedOut(_) = fault {
                log::warn!(
                    "[API] Enqueue of {:?} timed out; MPD may still have queued it",
                    song
                );
            }
            fault.respond(StatusCode::BAD_REQUEST, UNKNOWN_SONG)
        }
    }
}
