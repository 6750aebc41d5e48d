use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use url::Url;

const DEFAULT_ENDPOINT: &str = "https://api.opentopodata.org/v1/ned10m";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Batch size cannot be 0")]
    InvalidBatchSize,

    #[error("Max points cannot be 0")]
    InvalidMaxPoints,

    #[error("Cache capacity cannot be 0")]
    InvalidCacheCapacity,

    #[error("Timeout must be a positive number of seconds")]
    InvalidTimeout,

    #[error("Backoff base must be a non-negative number of seconds")]
    InvalidBackoff,

    #[error("Failure TTL must be a non-negative number of seconds")]
    InvalidFailureTtl,
}

/// Proxy configuration.
///
/// Constructed once at startup and passed down to each component; no
/// component reads ambient environment state. Every field has a default so
/// the proxy runs without a config file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Listener for incoming client requests
    pub listener: Listener,
    /// Upstream elevation API settings
    pub upstream: UpstreamConfig,
    /// Batch cache settings
    pub cache: CacheConfig,
    /// Hard cap on accepted points per request
    pub max_points: usize,
    /// Optional StatsD metrics exporter
    pub metrics: Option<MetricsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default(),
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            max_points: 2500,
            metrics: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Validates the proxy configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.listener.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.upstream.batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize);
        }
        if self.max_points == 0 {
            return Err(ValidationError::InvalidMaxPoints);
        }
        if self.cache.capacity == 0 {
            return Err(ValidationError::InvalidCacheCapacity);
        }
        if !(self.upstream.timeout_secs.is_finite() && self.upstream.timeout_secs > 0.0) {
            return Err(ValidationError::InvalidTimeout);
        }
        if !(self.upstream.backoff_base_secs.is_finite() && self.upstream.backoff_base_secs >= 0.0)
        {
            return Err(ValidationError::InvalidBackoff);
        }
        // The cache feeds this straight into Duration::from_secs_f64, which
        // panics on negative or non-finite input.
        if let Some(ttl) = self.cache.failure_ttl_secs {
            if !(ttl.is_finite() && ttl >= 0.0) {
                return Err(ValidationError::InvalidFailureTtl);
            }
        }
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

/// Upstream elevation API configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// URL of the upstream elevation endpoint
    ///
    /// Note: Uses the `url::Url` type for compile-time URL validation.
    /// Invalid URLs will be rejected during config deserialization.
    pub endpoint: Url,
    /// Maximum number of coordinates sent in one upstream call
    pub batch_size: usize,
    /// Per-attempt request timeout in seconds
    pub timeout_secs: f64,
    /// Number of additional attempts after the first failure
    pub retries: u32,
    /// Linear backoff base: attempt n sleeps `backoff_base_secs * n` seconds
    pub backoff_base_secs: f64,
    /// User-Agent header identifying this client to the upstream
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            batch_size: 100,
            timeout_secs: 8.0,
            retries: 2,
            backoff_base_secs: 0.6,
            user_agent: concat!("elevationd/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Batch cache configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached batch outcomes
    pub capacity: u64,
    /// When set, failed batch outcomes expire after this many seconds.
    /// When unset, failures are cached until evicted by capacity pressure,
    /// exactly like successes.
    pub failure_ttl_secs: Option<f64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: 256,
            failure_ttl_secs: None,
        }
    }
}

/// StatsD metrics exporter configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}
