//! Proxy configuration.
//!
//! ```text
//! hls-proxy.toml
//!     → loader.rs (read, deserialize, validate)
//!     → ProxyConfig (immutable, shared via Arc)
//! ```
//!
//! Every field has a default, so running without a file is valid.

pub mod loader;
pub mod schema;

pub use loader::{load_config, validate_config, ConfigError};
pub use schema::{
    CacheConfig, Provider, ProxyConfig, RoutesConfig, ServerConfig, SignalsConfig, UpstreamConfig,
};
