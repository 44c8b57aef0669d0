//! Proxy failures and how they are rendered to clients.
//!
//! Nothing escapes the handler as a fault: every failure becomes a response.
//! Manifest requests get a minimal playlist carrying the error, since HLS
//! players choke on a JSON body; everything else gets JSON.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use crate::classify::{mentions_manifest, MANIFEST_CONTENT_TYPE};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("URL parameter required")]
    MissingParameter,

    #[error("invalid target URL: {0}")]
    InvalidTarget(String),

    #[error("HTTP {}: {}", .status.as_u16(), .status.canonical_reason().unwrap_or("Unknown"))]
    UpstreamStatus { status: StatusCode },

    #[error("upstream request failed: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("upstream request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

impl ProxyError {
    /// Map a reqwest failure, keeping its own timeouts distinct.
    pub fn from_reqwest(err: reqwest::Error, bound: Duration) -> Self {
        if err.is_timeout() {
            ProxyError::Timeout(bound)
        } else {
            ProxyError::Fetch(err)
        }
    }

    /// Label reported in the `error` field. Fetch, status and timeout
    /// failures all surface as upstream errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingParameter => "MissingParameter",
            ProxyError::InvalidTarget(_) => "InvalidTarget",
            ProxyError::UpstreamStatus { .. } | ProxyError::Fetch(_) | ProxyError::Timeout(_) => {
                "UpstreamError"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameter | ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render against the raw `url` parameter, if one was given.
    pub fn into_response_for(self, raw_target: Option<&str>) -> Response {
        match raw_target {
            Some(raw) if mentions_manifest(raw) => self.manifest_response(),
            _ => self.json_response(raw_target),
        }
    }

    fn manifest_response(&self) -> Response {
        let message = self.to_string().replace(['\r', '\n'], " ");
        let body = format!("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-ERROR: {message}");
        (
            self.status(),
            [(header::CONTENT_TYPE, HeaderValue::from_static(MANIFEST_CONTENT_TYPE))],
            body,
        )
            .into_response()
    }

    fn json_response(&self, raw_target: Option<&str>) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            url: raw_target,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: String,
    url: Option<&'a str>,
}
