//! Reverse proxy for the daemon's HTTP audio stream.
//!
//! Bodies are streamed through in both directions; nothing is buffered.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::Response,
};
use reqwest::Client;

use crate::api::response::error_response;
use crate::api::AppState;

/// Client message for any upstream transport failure.
pub const STREAM_UNAVAILABLE: &str = "Stream unavailable";

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

/// Forwards requests to a fixed upstream URL.
#[derive(Debug, Clone)]
pub struct StreamProxy {
    client: Client,
    upstream: String,
}

impl StreamProxy {
    /// `upstream` is the stream base URL, e.g. `http://localhost:8000/`.
    pub fn new(client: Client, upstream: impl Into<String>) -> Self {
        Self {
            client,
            upstream: upstream.into(),
        }
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Target URL for a request: the upstream root plus the original query.
    fn target_url(&self, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}?{}", self.upstream, q),
            _ => self.upstream.clone(),
        }
    }

    /// Relays one request and its response.
    ///
    /// The request path is replaced by the upstream root. Method, end-to-end
    /// headers and the body stream pass through unchanged, and so do the
    /// response status, headers and body stream.
    pub async fn forward(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let url = self.target_url(parts.uri.query());
        log::debug!("[Proxy] {} {} -> {}", parts.method, parts.uri, url);

        let has_body = parts.headers.contains_key(header::CONTENT_LENGTH)
            || parts.headers.contains_key(header::TRANSFER_ENCODING);
        let mut upstream = self
            .client
            .request(parts.method, &url)
            .headers(end_to_end(&parts.headers));
        // A bodiless GET must not turn into a chunked upload.
        if has_body {
            upstream = upstream.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }
        let upstream = upstream.send().await;

        let upstream = match upstream {
            Ok(resp) => resp,
            Err(e) => {
                return error_response(StatusCode::BAD_GATEWAY, STREAM_UNAVAILABLE, Some(&e));
            }
        };

        let status = upstream.status();
        let headers = end_to_end(upstream.headers());
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

/// Copies `headers` without the hop-by-hop ones.
fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in &HOP_BY_HOP {
        forwarded.remove(name);
    }
    forwarded
}

/// Handler for the stream route (any method).
pub async fn stream_proxy(State(state): State<AppState>, request: Request) -> Response {
    state.proxy.forward(request).await
}
