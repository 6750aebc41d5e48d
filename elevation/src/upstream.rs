use crate::batch::Chunk;
use crate::config::UpstreamConfig;
use crate::metrics_defs::{UPSTREAM_EXHAUSTED, UPSTREAM_RETRY};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// The outcome of one upstream batch fetch, including retries.
///
/// Failure is a value rather than an error so callers can apply fallback
/// policy uniformly; nothing upstream-originated crosses the orchestrator
/// boundary as an exception. Results are shared behind an `Arc` because
/// outcomes are cloned out of the cache.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub success: bool,
    pub results: Arc<Vec<Value>>,
}

impl BatchOutcome {
    pub fn failed() -> Self {
        BatchOutcome {
            success: false,
            results: Arc::new(Vec::new()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum AttemptError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("rate limited (429)")]
    RateLimited,
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid upstream payload")]
    InvalidPayload,
}

/// Client for the batched elevation lookup endpoint.
///
/// Issues one GET per attempt with the chunk's coordinates pipe-joined into
/// the `locations` query parameter, applying the configured per-attempt
/// timeout and linear retry backoff.
pub struct UpstreamClient {
    client: reqwest::Client,
    endpoint: url::Url,
    retries: u32,
    backoff_base: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(UpstreamClient {
            client,
            endpoint: config.endpoint.clone(),
            retries: config.retries,
            backoff_base: Duration::from_secs_f64(config.backoff_base_secs),
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Fetch elevations for one chunk.
    ///
    /// Any failure (transport error, timeout, 429, non-2xx status, malformed
    /// body, `status` field not `"OK"`, `results` not an array) triggers a
    /// retry after sleeping `backoff_base * attempt` seconds, up to the
    /// configured retry count. Exhaustion returns a failed outcome with an
    /// empty result list; this method never errors.
    ///
    /// On success the upstream `results` array is returned verbatim, with no
    /// element-level shape validation.
    pub async fn fetch(&self, chunk: &Chunk) -> BatchOutcome {
        let locations = chunk.key();

        for attempt in 1..=self.retries + 1 {
            match self.attempt(&locations).await {
                Ok(results) => {
                    return BatchOutcome {
                        success: true,
                        results: Arc::new(results),
                    };
                }
                Err(reason) => {
                    tracing::warn!(
                        attempt,
                        chunk_len = chunk.len(),
                        %reason,
                        "upstream attempt failed"
                    );
                    if attempt > self.retries {
                        break;
                    }
                    metrics::counter!(UPSTREAM_RETRY).increment(1);
                    tokio::time::sleep(self.backoff_base.mul_f64(f64::from(attempt))).await;
                }
            }
        }

        metrics::counter!(UPSTREAM_EXHAUSTED).increment(1);
        tracing::warn!(chunk_len = chunk.len(), "upstream retries exhausted");
        BatchOutcome::failed()
    }

    async fn attempt(&self, locations: &str) -> Result<Vec<Value>, AttemptError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("locations", locations)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::RateLimited);
        }
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }

        let mut body: Value = response.json().await?;
        if body.get("status").and_then(Value::as_str) != Some("OK") {
            return Err(AttemptError::InvalidPayload);
        }
        match body.get_mut("results").map(Value::take) {
            Some(Value::Array(results)) => Ok(results),
            _ => Err(AttemptError::InvalidPayload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::chunk_coordinates;
    use crate::normalize::Coordinate;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(uri: &str, retries: u32) -> UpstreamConfig {
        UpstreamConfig {
            endpoint: url::Url::parse(uri).unwrap(),
            retries,
            backoff_base_secs: 0.01,
            ..UpstreamConfig::default()
        }
    }

    fn one_chunk(coords: &[Coordinate]) -> Chunk {
        chunk_coordinates(coords, 100).remove(0)
    }

    #[tokio::test]
    async fn success_returns_results_verbatim() {
        let mock_server = MockServer::start().await;

        let results = json!([
            {"elevation": 12.5, "location": {"lat": 1.0, "lng": 2.0}},
            {"elevation": -3.0, "location": {"lat": 3.0, "lng": 4.0}, "extra": "kept"}
        ]);
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param(
                "locations",
                "1.000000,2.000000|3.000000,4.000000",
            ))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "OK", "results": results})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = UpstreamClient::new(&test_config(&mock_server.uri(), 2)).unwrap();
        let chunk = one_chunk(&[
            Coordinate { lat: 1.0, lon: 2.0 },
            Coordinate { lat: 3.0, lon: 4.0 },
        ]);

        let outcome = client.fetch(&chunk).await;
        assert!(outcome.success);
        assert_eq!(*outcome.results, results.as_array().unwrap().clone());
    }

    #[tokio::test]
    async fn retries_after_429_then_succeeds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{"elevation": 5.0, "location": {"lat": 1.0, "lng": 2.0}}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = UpstreamClient::new(&test_config(&mock_server.uri(), 2)).unwrap();
        let chunk = one_chunk(&[Coordinate { lat: 1.0, lon: 2.0 }]);

        let outcome = client.fetch(&chunk).await;
        assert!(outcome.success);
        assert_eq!(outcome.results.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_return_failed_outcome() {
        let mock_server = MockServer::start().await;

        // retries = 2 means three attempts total
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = UpstreamClient::new(&test_config(&mock_server.uri(), 2)).unwrap();
        let chunk = one_chunk(&[Coordinate { lat: 1.0, lon: 2.0 }]);

        let outcome = client.fetch(&chunk).await;
        assert!(!outcome.success);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn non_ok_status_field_is_a_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "INVALID_REQUEST", "results": []})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = UpstreamClient::new(&test_config(&mock_server.uri(), 0)).unwrap();
        let chunk = one_chunk(&[Coordinate { lat: 1.0, lon: 2.0 }]);

        assert!(!client.fetch(&chunk).await.success);
    }

    #[tokio::test]
    async fn non_array_results_is_a_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "OK", "results": "nope"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = UpstreamClient::new(&test_config(&mock_server.uri(), 0)).unwrap();
        let chunk = one_chunk(&[Coordinate { lat: 1.0, lon: 2.0 }]);

        assert!(!client.fetch(&chunk).await.success);
    }

    #[tokio::test]
    async fn unparseable_body_is_a_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = UpstreamClient::new(&test_config(&mock_server.uri(), 0)).unwrap();
        let chunk = one_chunk(&[Coordinate { lat: 1.0, lon: 2.0 }]);

        assert!(!client.fetch(&chunk).await.success);
    }
}
