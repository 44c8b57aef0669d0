//! Header sets for outbound fetches and proxied responses.
//!
//! Outbound headers are a fixed browser profile merged with per-target
//! overrides (override wins). All functions here are pure.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::classify::TargetKind;
use crate::config::{Provider, SignalsConfig};

pub const HLS_ACCEPT: &str = "application/x-mpegURL, application/vnd.apple.mpegurl, */*";

const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const CF_IPCOUNTRY: HeaderName = HeaderName::from_static("cf-ipcountry");

/// Upstream response headers relayed to the client when present.
pub const FORWARDED_RESPONSE_HEADERS: [HeaderName; 6] = [
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
    header::LAST_MODIFIED,
    header::ETAG,
    header::CONTENT_DISPOSITION,
];

/// Client signals read from the edge platform's trusted headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSignals {
    pub client_ip: Option<String>,
    pub country: Option<String>,
}

impl ClientSignals {
    pub fn from_headers(headers: &HeaderMap, names: &SignalsConfig) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            client_ip: read(&names.client_ip_header),
            country: read(&names.country_header),
        }
    }
}

/// Browser identity sent on every outbound request.
pub fn base_profile(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(ua) = HeaderValue::from_str(user_agent) {
        headers.insert(header::USER_AGENT, ua);
    }

    let fixed: [(&'static str, &'static str); 14] = [
        ("accept", "*/*"),
        ("accept-language", "en-US,en;q=0.9"),
        ("accept-encoding", "gzip, deflate, br"),
        ("connection", "keep-alive"),
        ("cache-control", "no-cache"),
        ("pragma", "no-cache"),
        ("sec-ch-ua", r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", r#""Windows""#),
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "cross-site"),
        ("dnt", "1"),
        ("upgrade-insecure-requests", "1"),
    ];
    for (name, value) in fixed {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    headers
}

/// Headers that replace or extend the base profile for this target.
///
/// Provider targets get the provider's `Origin`/`Referer`, their own `Host`,
/// an HLS `Accept`, and the client's IP and country. Missing signals are
/// sent empty rather than invented. Segment requests carry the client's
/// `Range` so seeking works.
pub fn origin_overrides(
    target: &Url,
    kind: TargetKind,
    providers: &[Provider],
    signals: &ClientSignals,
    inbound: &HeaderMap,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let host = target.host_str().unwrap_or_default();
    if let Some(provider) = providers.iter().find(|p| p.matches_host(host)) {
        insert_str(&mut headers, header::ORIGIN, provider.origin());
        insert_str(&mut headers, header::REFERER, &provider.referer());
        insert_str(&mut headers, header::HOST, &host_with_port(target));
        headers.insert(header::ACCEPT, HeaderValue::from_static(HLS_ACCEPT));
        headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));
        insert_str(&mut headers, X_FORWARDED_FOR, signals.client_ip.as_deref().unwrap_or(""));
        insert_str(&mut headers, CF_IPCOUNTRY, signals.country.as_deref().unwrap_or(""));
    }

    if matches!(kind, TargetKind::Segment { .. }) {
        if let Some(range) = inbound.get(header::RANGE) {
            headers.insert(header::RANGE, range.clone());
        }
    }

    headers
}

/// Merge `overrides` onto `base`. Every name in `overrides` replaces the
/// base value.
pub fn merge(mut base: HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    for name in overrides.keys() {
        base.remove(name);
        for value in overrides.get_all(name) {
            base.append(name.clone(), value.clone());
        }
    }
    base
}

/// Permissive cross-origin headers attached to every response.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    headers
}

/// Copy the allow-listed headers from an upstream response. `skip` names
/// headers that no longer describe the body being sent.
pub fn forwarded_response_headers(upstream: &HeaderMap, skip: &[HeaderName]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in FORWARDED_RESPONSE_HEADERS.iter().filter(|n| !skip.contains(n)) {
        if let Some(value) = upstream.get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
    headers
}

fn host_with_port(target: &Url) -> String {
    let host = target.host_str().unwrap_or_default();
    match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn insert_str(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn outbound(target: &str, signals: &ClientSignals) -> HeaderMap {
        let target = url(target);
        let overrides = origin_overrides(
            &target,
            crate::classify::classify(&target),
            &[Provider::sonyliv()],
            signals,
            &HeaderMap::new(),
        );
        merge(base_profile("test-agent/1.0"), &overrides)
    }

    #[test]
    fn base_profile_applies_everywhere() {
        let headers = outbound("https://cdn.example.com/a/index.m3u8", &ClientSignals::default());
        assert_eq!(headers[header::USER_AGENT], "test-agent/1.0");
        assert_eq!(headers[header::ACCEPT], "*/*");
        assert_eq!(headers["sec-fetch-mode"], "cors");
        assert!(headers.get(header::ORIGIN).is_none());
        assert!(headers.get(header::REFERER).is_none());
        assert!(headers.get("x-forwarded-for").is_none());
    }

    #[test]
    fn provider_hosts_get_impersonation_headers() {
        let signals = ClientSignals {
            client_ip: Some("203.0.113.7".into()),
            country: Some("IN".into()),
        };
        let headers = outbound("https://sonydaimenew.akamaized.net:8443/hls/master.m3u8", &signals);

        assert_eq!(headers[header::ORIGIN], "https://www.sonyliv.com");
        assert_eq!(headers[header::REFERER], "https://www.sonyliv.com/");
        assert_eq!(headers[header::HOST], "sonydaimenew.akamaized.net:8443");
        assert_eq!(headers[header::ACCEPT], HLS_ACCEPT);
        assert_eq!(headers.get_all(header::ACCEPT).iter().count(), 1);
        assert_eq!(headers["x-forwarded-for"], "203.0.113.7");
        assert_eq!(headers["cf-ipcountry"], "IN");
        assert_eq!(headers[header::USER_AGENT], "test-agent/1.0");
    }

    #[test]
    fn missing_signals_are_sent_empty() {
        let headers = outbound("https://www.sonyliv.com/x.m3u8", &ClientSignals::default());
        assert_eq!(headers["x-forwarded-for"], "");
        assert_eq!(headers["cf-ipcountry"], "");
    }

    #[test]
    fn provider_fragment_in_path_does_not_match() {
        let headers = outbound("https://cdn.example.com/sonyliv/x.m3u8", &ClientSignals::default());
        assert!(headers.get(header::ORIGIN).is_none());
    }

    #[test]
    fn range_is_forwarded_for_segments_only() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::RANGE, HeaderValue::from_static("bytes=100-"));
        let none = ClientSignals::default();

        let seg = url("https://cdn.example.com/v/1.mp4");
        let overrides = origin_overrides(&seg, crate::classify::classify(&seg), &[], &none, &inbound);
        assert_eq!(overrides[header::RANGE], "bytes=100-");

        let manifest = url("https://cdn.example.com/v/index.m3u8");
        let overrides =
            origin_overrides(&manifest, crate::classify::classify(&manifest), &[], &none, &inbound);
        assert!(overrides.get(header::RANGE).is_none());
    }

    #[test]
    fn signals_are_read_from_configured_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.2"));
        inbound.insert("cf-ipcountry", HeaderValue::from_static("  "));

        let signals = ClientSignals::from_headers(&inbound, &SignalsConfig::default());
        assert_eq!(signals.client_ip.as_deref(), Some("198.51.100.2"));
        assert_eq!(signals.country, None);
    }

    #[test]
    fn forwarding_respects_allow_list_and_skip() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        upstream.insert(header::ETAG, HeaderValue::from_static("\"abc\""));
        upstream.insert(header::SET_COOKIE, HeaderValue::from_static("s=1"));

        let all = forwarded_response_headers(&upstream, &[]);
        assert_eq!(all.len(), 2);
        assert!(all.get(header::SET_COOKIE).is_none());

        let skipped = forwarded_response_headers(&upstream, &[header::CONTENT_LENGTH]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[header::ETAG], "\"abc\"");
    }

    #[test]
    fn cors_is_permissive() {
        let headers = cors_headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }
}
