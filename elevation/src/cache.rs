// Memoizes upstream batch outcomes keyed by exact chunk content. Success and
// failure outcomes are both cached: a failed batch keeps returning the same
// failure on repeat identical requests until it falls out of the cache, by
// capacity pressure or (when configured) via the failure TTL.
use crate::batch::Chunk;
use crate::config::CacheConfig;
use crate::metrics_defs::{BATCH_CACHE_HIT, BATCH_CACHE_MISS};
use crate::upstream::{BatchOutcome, UpstreamClient};
use moka::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};

/// Expires only failed outcomes. Successes live until capacity eviction.
struct FailureExpiry {
    failure_ttl: Option<Duration>,
}

impl Expiry<String, BatchOutcome> for FailureExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &BatchOutcome,
        _created_at: Instant,
    ) -> Option<Duration> {
        if value.success {
            None
        } else {
            self.failure_ttl
        }
    }
}

/// Bounded, shared memoization layer in front of the upstream client.
pub struct BatchCache {
    cache: Cache<String, BatchOutcome>,
}

impl BatchCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .expire_after(FailureExpiry {
                failure_ttl: config.failure_ttl_secs.map(Duration::from_secs_f64),
            })
            .build();

        BatchCache { cache }
    }

    /// Return the cached outcome for this chunk's key, calling upstream on a
    /// miss and storing whatever comes back. Concurrent lookups of the same
    /// key share a single upstream call.
    pub async fn get_or_fetch(&self, chunk: &Chunk, upstream: &UpstreamClient) -> BatchOutcome {
        let entry = self
            .cache
            .entry(chunk.key())
            .or_insert_with(upstream.fetch(chunk))
            .await;

        let metric = if entry.is_fresh() {
            BATCH_CACHE_MISS
        } else {
            BATCH_CACHE_HIT
        };
        metrics::counter!(metric).increment(1);

        entry.into_value()
    }
}
