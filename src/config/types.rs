use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for doc-harvest
///
/// Every field has a default, so an empty TOML file is a valid config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub cache: CacheConfig,
    pub content: ContentConfig,
    pub discovery: DiscoveryConfig,
    pub security: SecurityConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Fetch engine behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of requests in flight at once
    pub concurrency: u32,

    /// Minimum time between request starts to the same domain (milliseconds)
    #[serde(rename = "min-domain-interval-ms")]
    pub min_domain_interval_ms: u64,

    /// Total attempts per URL for transient failures
    #[serde(rename = "attempt-budget")]
    pub attempt_budget: u32,

    /// First backoff delay; doubles on each further attempt (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Maximum redirect hops followed per request
    #[serde(rename = "max-redirects")]
    pub max_redirects: u32,

    /// Wall-clock budget for a whole run (seconds)
    #[serde(rename = "run-deadline-secs")]
    pub run_deadline_secs: u64,

    /// Stop once this many documents have been extracted
    #[serde(rename = "max-documents")]
    pub max_documents: usize,

    /// Skip URLs disallowed by the origin's robots.txt
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            min_domain_interval_ms: 1000,
            attempt_budget: 3,
            backoff_base_ms: 2000,
            request_timeout_secs: 15,
            connect_timeout_secs: 10,
            max_redirects: 5,
            run_deadline_secs: 120,
            max_documents: 12,
            respect_robots: true,
        }
    }
}

impl EngineConfig {
    pub fn min_domain_interval(&self) -> Duration {
        Duration::from_millis(self.min_domain_interval_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }
}

/// Page cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disable to always fetch live and never write the cache
    pub enabled: bool,

    /// Directory holding the cache database (`~` is expanded)
    pub directory: String,

    /// Time-to-live for cached pages (seconds)
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached pages (at most 1000)
    #[serde(rename = "max-entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "~/.cache/doc-harvest".to_string(),
            ttl_secs: 6 * 60 * 60,
            max_entries: 1000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// The cache directory with a leading `~` expanded to the home directory
    pub fn directory_path(&self) -> PathBuf {
        expand_home(&self.directory)
    }
}

/// Content quality thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Bodies shorter than this many bytes are soft failures
    #[serde(rename = "min-content-length")]
    pub min_content_length: usize,

    /// Lowercase phrases that mark sign-in walls, paywalls and error pages
    #[serde(rename = "soft-failure-markers")]
    pub soft_failure_markers: Vec<String>,

    /// Markers only count within this many leading characters
    #[serde(rename = "marker-scan-window")]
    pub marker_scan_window: usize,

    /// Tokens per shingle for near-duplicate detection
    #[serde(rename = "shingle-size")]
    pub shingle_size: usize,

    /// Jaccard similarity at or above which documents are duplicates
    #[serde(rename = "duplicate-threshold")]
    pub duplicate_threshold: f64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_content_length: 500,
            soft_failure_markers: [
                "sign in",
                "access denied",
                "log in to continue",
                "enable javascript",
                "javascript is required",
                "subscribe to continue",
                "403 forbidden",
                "404 not found",
                "page not found",
                "unauthorized",
                "please log in",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            marker_scan_window: 2000,
            shingle_size: 5,
            duplicate_threshold: 0.9,
        }
    }
}

/// Sitemap and changelog discovery
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Queue documentation URLs listed in each seed origin's sitemaps
    pub sitemaps: bool,

    /// Most sitemap URLs queued per origin
    #[serde(rename = "max-sitemap-urls")]
    pub max_sitemap_urls: usize,

    /// Look for a changelog once the pages are fetched
    pub changelog: bool,

    /// Most changelog locations tried per origin
    #[serde(rename = "max-changelog-candidates")]
    pub max_changelog_candidates: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            sitemaps: true,
            max_sitemap_urls: 200,
            changelog: true,
            max_changelog_candidates: 4,
        }
    }
}

/// Security boundary configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Directories output may be written under; empty means cwd and home
    #[serde(rename = "allowed-roots")]
    pub allowed_roots: Vec<String>,

    /// Host patterns exempt from the private-address rule
    #[serde(rename = "trusted-hosts")]
    pub trusted_hosts: Vec<String>,
}

impl SecurityConfig {
    /// The configured roots with `~` expanded, or cwd and home when empty
    pub fn allowed_root_paths(&self) -> Vec<PathBuf> {
        if self.allowed_roots.is_empty() {
            crate::security::default_allowed_roots()
        } else {
            self.allowed_roots.iter().map(|r| expand_home(r)).collect()
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub name: String,
    pub version: String,
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: "doc-harvest".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!("{}/{} (+{})", self.name, self.version, contact),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

/// Expands a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
