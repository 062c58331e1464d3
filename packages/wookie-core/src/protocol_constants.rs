//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the MPD control protocol or by the HTTP
//! contract the web frontend depends on. Changing them breaks compatibility.

use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// MPD Control Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Prefix of the greeting line MPD sends on every new connection.
pub const MPD_GREETING_PREFIX: &str = "OK MPD ";

/// Terminator line for a successful command response.
pub const MPD_OK: &str = "OK";

/// Prefix of an error response line (`ACK [code@index] {command} message`).
pub const MPD_ACK_PREFIX: &str = "ACK ";

/// Subsystems the change watcher waits on with `idle`.
pub const WATCHED_SUBSYSTEMS: &[&str] = &["player", "playlist"];

/// Timeout for establishing a TCP connection to MPD (seconds).
pub const MPD_CONNECT_TIMEOUT_SECS: u64 = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Change Watcher
// ─────────────────────────────────────────────────────────────────────────────

/// Reconnect delays for the change watcher (exponential backoff, last value repeats).
pub const WATCHER_RECONNECT_DELAYS_MS: [u64; 4] = [1000, 2000, 5000, 10_000];

/// Capacity of the daemon event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

/// Path the audio stream is proxied under.
pub const STREAM_PATH: &str = "/stream";

/// Default deadline for a single control call made on behalf of an HTTP request.
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect timeout for the upstream audio stream.
///
/// No total request timeout applies: the stream is unbounded.
pub const STREAM_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Path of the web frontend, relative to the install directory.
pub const WEB_ROOT_SUFFIX: &str = "frontend/turbo_wookie/web";

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "turbo-wookie";
