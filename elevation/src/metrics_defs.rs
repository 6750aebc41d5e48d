//! Metric names emitted by the elevation proxy.

/// Number of chunk lookups served from the batch cache.
pub const BATCH_CACHE_HIT: &str = "batch_cache.hit";

/// Number of chunk lookups that had to call upstream.
pub const BATCH_CACHE_MISS: &str = "batch_cache.miss";

/// Number of upstream attempts that failed and were retried.
pub const UPSTREAM_RETRY: &str = "upstream.retry";

/// Number of chunks whose upstream retries were exhausted.
pub const UPSTREAM_EXHAUSTED: &str = "upstream.exhausted";
