//! Configuration module for doc-harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. All sections are optional:
//!
//! ```toml
//! [engine]
//! concurrency = 5
//! min-domain-interval-ms = 1000
//! attempt-budget = 3
//!
//! [cache]
//! directory = "~/.cache/doc-harvest"
//! ttl-secs = 21600
//! max-entries = 1000
//!
//! [discovery]
//! sitemaps = true
//! max-sitemap-urls = 200
//!
//! [security]
//! allowed-roots = ["~/projects"]
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    expand_home, CacheConfig, Config, ContentConfig, DiscoveryConfig, EngineConfig,
    SecurityConfig, UserAgentConfig,
};
pub use validation::{validate, MAX_CACHE_ENTRIES};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
