use crate::batch::chunk_coordinates;
use crate::cache::BatchCache;
use crate::config::Config;
use crate::normalize::normalize_locations;
use crate::upstream::UpstreamClient;
use serde_json::{Value, json};

/// Client-caused request failures. Surfaced as 400s, never retried.
///
/// Upstream-caused problems are deliberately absent: they are absorbed into
/// sentinel results so the response shape is always well-formed.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum BadRequest {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing 'locations' array")]
    MissingLocations,

    #[error("No valid coordinates provided")]
    NoValidCoordinates,

    #[error("Request exceeds max points ({0})")]
    TooManyPoints(usize),
}

/// Placeholder entry substituted when upstream data for a point is
/// unavailable.
pub fn sentinel_result() -> Value {
    json!({ "elevation": 0.0, "location": Value::Null })
}

/// Ties the pipeline together: normalize, chunk, cache-or-fetch per chunk,
/// reassemble in order.
pub struct ElevationProxy {
    config: Config,
    upstream: UpstreamClient,
    cache: BatchCache,
}

impl ElevationProxy {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let cache = BatchCache::new(&config.cache);
        Ok(ElevationProxy {
            config,
            upstream,
            cache,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn upstream_endpoint(&self) -> &url::Url {
        self.upstream.endpoint()
    }

    /// Run the full pipeline for one request payload.
    ///
    /// Returns the ordered result list, exactly one entry per normalized
    /// coordinate, in the normalized order. Chunks whose upstream fetch
    /// failed, or whose result count does not match the chunk length, are
    /// filled with sentinel entries instead.
    pub async fn handle_elevation(&self, payload: &Value) -> Result<Vec<Value>, BadRequest> {
        let Some(fields) = payload.as_object() else {
            return Err(BadRequest::MissingLocations);
        };
        let locations = fields
            .get("locations")
            .ok_or(BadRequest::MissingLocations)?;
        // A null or otherwise non-array value carries zero coordinates and
        // falls through to the empty check below.
        let items = locations.as_array().map(Vec::as_slice).unwrap_or_default();

        let coords = normalize_locations(items);
        if coords.is_empty() {
            return Err(BadRequest::NoValidCoordinates);
        }
        if coords.len() > self.config.max_points {
            return Err(BadRequest::TooManyPoints(self.config.max_points));
        }

        let mut all_results = Vec::with_capacity(coords.len());
        for chunk in chunk_coordinates(&coords, self.config.upstream.batch_size) {
            let outcome = self.cache.get_or_fetch(&chunk, &self.upstream).await;
            if outcome.success && outcome.results.len() == chunk.len() {
                all_results.extend(outcome.results.iter().cloned());
            } else {
                if outcome.success {
                    tracing::warn!(
                        expected = chunk.len(),
                        got = outcome.results.len(),
                        "upstream result count mismatch, substituting sentinels"
                    );
                }
                all_results.extend(std::iter::repeat_with(sentinel_result).take(chunk.len()));
            }
        }

        debug_assert_eq!(all_results.len(), coords.len());
        Ok(all_results)
    }
}
