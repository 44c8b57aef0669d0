//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub server: ServerConfig,
    pub routes: RoutesConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub signals: SignalsConfig,

    /// Streaming origins that get `Origin`/`Referer` impersonation.
    pub providers: Vec<Provider>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            routes: RoutesConfig::default(),
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            signals: SignalsConfig::default(),
            providers: vec![Provider::sonyliv()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,

    /// Externally visible origin (e.g., "https://proxy.example"). When unset
    /// the origin is taken from `X-Forwarded-Proto` and `Host`.
    pub public_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
            public_origin: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Path rewritten manifests point back at.
    pub proxy_path: String,
    pub health_path: String,

    /// Extra paths served by the same proxy handler.
    pub proxy_aliases: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            proxy_path: "/api/proxy".to_string(),
            health_path: "/api/health".to_string(),
            proxy_aliases: vec!["/proxy".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Bound on sending the request and reading a buffered body.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 5,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `max-age` applied to relayed segments.
    pub segment_max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            segment_max_age_secs: 300,
        }
    }
}

/// Inbound headers set by the edge platform in front of the proxy. Their
/// values are forwarded upstream and never used for decisions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalsConfig {
    pub client_ip_header: String,
    pub country_header: String,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            client_ip_header: "cf-connecting-ip".to_string(),
            country_header: "cf-ipcountry".to_string(),
        }
    }
}

/// A streaming origin with anti-hotlinking checks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Provider {
    pub name: String,

    /// Matched as substrings of the target host.
    pub host_fragments: Vec<String>,

    /// Canonical site, e.g. "https://www.sonyliv.com".
    pub site: String,
}

impl Provider {
    pub fn sonyliv() -> Self {
        Self {
            name: "sonyliv".to_string(),
            host_fragments: vec!["sonydaimenew".to_string(), "sonyliv".to_string()],
            site: "https://www.sonyliv.com".to_string(),
        }
    }

    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.host_fragments
            .iter()
            .filter(|f| !f.is_empty())
            .any(|f| host.contains(&f.to_ascii_lowercase()))
    }

    /// `Origin` value: the site without a trailing slash.
    pub fn origin(&self) -> &str {
        self.site.trim_end_matches('/')
    }

    /// `Referer` value: the site with a trailing slash.
    pub fn referer(&self) -> String {
        format!("{}/", self.origin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.timeout(), Duration::from_secs(5));
        assert_eq!(config.upstream.max_redirects, 5);
        assert_eq!(config.routes.proxy_path, "/api/proxy");
        assert_eq!(config.providers, vec![Provider::sonyliv()]);
    }

    #[test]
    fn providers_replace_the_default_list() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [[providers]]
            name = "acme"
            host_fragments = ["acmecdn"]
            site = "https://watch.acme.test/"
            "#,
        )
        .unwrap();

        assert_eq!(config.providers.len(), 1);
        let acme = &config.providers[0];
        assert!(acme.matches_host("edge1.ACMECDN.net"));
        assert!(!acme.matches_host("sonyliv.com"));
        assert_eq!(acme.origin(), "https://watch.acme.test");
        assert_eq!(acme.referer(), "https://watch.acme.test/");
    }

    #[test]
    fn empty_fragments_never_match() {
        let provider = Provider {
            name: "blank".into(),
            host_fragments: vec![String::new()],
            site: "https://blank.test".into(),
        };
        assert!(!provider.matches_host("anything.test"));
    }
}
