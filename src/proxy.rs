//! The proxy handler: decode the target, fetch it with impersonated
//! headers, and shape the response by target kind.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use reqwest::{redirect, Client};
use tokio::time::{timeout_at, Instant};
use url::{form_urlencoded, Url};

use crate::classify::{classify, TargetKind, MANIFEST_CONTENT_TYPE};
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::headers::{
    base_profile, forwarded_response_headers, merge, origin_overrides, ClientSignals,
};
use crate::playlist::{self, ProxyLink};

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProxyParams {
    url: Option<String>,
    debug: Option<String>,
}

impl ProxyParams {
    /// Read `url` and `debug` from a raw query string. Repeated keys keep
    /// their first value; unknown keys are ignored.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                "url" => &mut params.url,
                "debug" => &mut params.debug,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    fn debug_requested(&self) -> bool {
        self.debug.as_deref().is_some_and(|d| !d.is_empty())
    }
}

pub async fn handle(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let params = ProxyParams::from_query(query.as_deref());
    match forward(&state.config, &params, &headers).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(
                kind = err.kind(),
                status = err.status().as_u16(),
                url = params.url.as_deref().unwrap_or(""),
                error = %err,
                "Proxy request failed"
            );
            err.into_response_for(params.url.as_deref())
        }
    }
}

async fn forward(
    config: &ProxyConfig,
    params: &ProxyParams,
    inbound: &HeaderMap,
) -> Result<Response, ProxyError> {
    let raw = params
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(ProxyError::MissingParameter)?;
    let target = decode_target(raw)?;
    let kind = classify(&target);

    tracing::debug!(url = %target, ?kind, "Proxying");

    let signals = ClientSignals::from_headers(inbound, &config.signals);
    let overrides = origin_overrides(&target, kind, &config.providers, &signals, inbound);
    let outbound = merge(base_profile(&config.upstream.user_agent), &overrides);

    let bound = config.upstream.timeout();
    let deadline = Instant::now() + bound;

    let client = upstream_client(config).map_err(ProxyError::Fetch)?;
    let upstream = timeout_at(deadline, client.get(target.clone()).headers(outbound).send())
        .await
        .map_err(|_| ProxyError::Timeout(bound))?
        .map_err(|e| ProxyError::from_reqwest(e, bound))?;

    let status = upstream.status();
    tracing::debug!(status = status.as_u16(), "Upstream responded");
    if !status.is_success() {
        return Err(ProxyError::UpstreamStatus { status });
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(kind.default_content_type()));

    match kind {
        TargetKind::Segment { .. } => {
            let mut headers = forwarded_response_headers(upstream.headers(), &[]);
            headers.insert(header::CONTENT_TYPE, content_type);
            headers.insert(header::CACHE_CONTROL, segment_cache_control(config));
            Ok((status, headers, Body::from_stream(upstream.bytes_stream())).into_response())
        }
        TargetKind::Manifest => {
            let mut headers = forwarded_response_headers(upstream.headers(), &[header::CONTENT_LENGTH]);
            let mut body = timeout_at(deadline, upstream.text())
                .await
                .map_err(|_| ProxyError::Timeout(bound))?
                .map_err(|e| ProxyError::from_reqwest(e, bound))?;

            if playlist::is_playlist(&body) {
                let origin = proxy_origin(config, inbound);
                let link = ProxyLink {
                    origin: &origin,
                    path: &config.routes.proxy_path,
                };
                body = playlist::rewrite(&body, &target, link);
                tracing::debug!(lines = body.split('\n').count(), "Rewrote playlist");

                if params.debug_requested() {
                    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                    body = format!("{}{}", playlist::debug_banner(&target, &now), body);
                }
            }

            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(MANIFEST_CONTENT_TYPE));
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-store, must-revalidate"),
            );
            headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
            Ok((status, headers, body).into_response())
        }
        TargetKind::Other => {
            let mut headers = forwarded_response_headers(upstream.headers(), &[]);
            let body = timeout_at(deadline, upstream.bytes())
                .await
                .map_err(|_| ProxyError::Timeout(bound))?
                .map_err(|e| ProxyError::from_reqwest(e, bound))?;
            headers.insert(header::CONTENT_TYPE, content_type);
            Ok((status, headers, body).into_response())
        }
    }
}

/// Turn the `url` parameter into an absolute http(s) URL.
///
/// Query-string parsing has already decoded it once. Clients that encoded it
/// twice are tolerated with one more decoding pass.
pub fn decode_target(raw: &str) -> Result<Url, ProxyError> {
    let raw = raw.trim();
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(first) => {
            let decoded = urlencoding::decode(raw)
                .map_err(|e| ProxyError::InvalidTarget(format!("not decodable: {e}")))?;
            Url::parse(decoded.trim())
                .map_err(|_| ProxyError::InvalidTarget(format!("{raw}: {first}")))?
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyError::InvalidTarget(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if !url.has_host() {
        return Err(ProxyError::InvalidTarget(format!("{url}: missing host")));
    }
    Ok(url)
}

/// Origin clients reached the proxy at, used in rewritten playlist links.
pub fn proxy_origin(config: &ProxyConfig, inbound: &HeaderMap) -> String {
    if let Some(origin) = &config.server.public_origin {
        return origin.trim_end_matches('/').to_string();
    }

    let first = |name: &str| {
        inbound
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let scheme = first("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
    let host = first("x-forwarded-host")
        .or_else(|| first("host"))
        .unwrap_or_else(|| config.server.bind_address.clone());
    format!("{scheme}://{host}")
}

/// A fresh client per request; the proxy keeps no connection pool.
fn upstream_client(config: &ProxyConfig) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(config.upstream.connect_timeout())
        .redirect(redirect::Policy::limited(config.upstream.max_redirects))
        .build()
}

fn segment_cache_control(config: &ProxyConfig) -> HeaderValue {
    let value = format!("public, max-age={}", config.cache.segment_max_age_secs);
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("public, max-age=300"))
}
