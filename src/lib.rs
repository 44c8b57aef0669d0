//! Edge reverse proxy for HLS manifests and media segments.
//!
//! ```text
//! GET /api/proxy?url=<encoded>
//!     → decode target, classify (manifest / segment / other)
//!     → browser profile + provider overrides → upstream fetch (bounded)
//!     → manifest: rewrite URIs back through the proxy, no-cache
//!       segment:  stream through, short cache lifetime
//!       other:    relay verbatim
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod headers;
pub mod playlist;
pub mod proxy;
pub mod server;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use proxy::AppState;
pub use server::router;
