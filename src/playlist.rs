//! HLS playlist rewriting.
//!
//! Every media URI line is resolved to an absolute URL and replaced by a link
//! back through the proxy. Tag, comment and blank lines pass through
//! untouched, and the output has exactly one line per input line.

use url::Url;

pub const HLS_MARKER: &str = "#EXTM3U";

/// Where rewritten URIs point: `<origin><path>?url=<encoded>`.
#[derive(Debug, Clone, Copy)]
pub struct ProxyLink<'a> {
    pub origin: &'a str,
    pub path: &'a str,
}

impl ProxyLink<'_> {
    pub fn to(&self, absolute: &str) -> String {
        format!(
            "{}{}?url={}",
            self.origin.trim_end_matches('/'),
            self.path,
            urlencoding::encode(absolute)
        )
    }
}

/// Whether a body is an HLS playlist (starts with the marker tag).
pub fn is_playlist(body: &str) -> bool {
    body.trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with(HLS_MARKER)
}

pub fn rewrite(body: &str, target: &Url, link: ProxyLink<'_>) -> String {
    body.split('\n')
        .map(|line| {
            let uri = line.trim();
            if uri.is_empty() || uri.starts_with('#') {
                line.to_string()
            } else {
                link.to(&resolve(uri, target))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve a playlist URI against the playlist's own URL.
///
/// Absolute URIs are kept as written. Root-relative ones take the target's
/// scheme and host, scheme-relative ones its scheme, and anything else is
/// appended to the target's directory.
pub fn resolve(uri: &str, target: &Url) -> String {
    if has_scheme(uri) {
        uri.to_string()
    } else if let Some(rest) = uri.strip_prefix("//") {
        format!("{}://{}", target.scheme(), rest)
    } else if uri.starts_with('/') {
        format!("{}{}", target.origin().ascii_serialization(), uri)
    } else {
        format!("{}{}", directory_of(target), uri)
    }
}

/// The target up to and including the last `/` of its path.
fn directory_of(target: &Url) -> String {
    let mut base = target.clone();
    base.set_query(None);
    base.set_fragment(None);

    let s = base.as_str();
    match s.rfind('/') {
        Some(idx) => s[..=idx].to_string(),
        None => format!("{s}/"),
    }
}

fn has_scheme(uri: &str) -> bool {
    let Some((scheme, _)) = uri.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Comment lines prepended to a rewritten playlist when debugging.
pub fn debug_banner(target: &Url, rewritten_at: &str) -> String {
    format!("# Proxy Debug Info\n# Original URL: {target}\n# Rewritten at: {rewritten_at}\n")
}
