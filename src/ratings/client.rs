//! Rating client for the spreadsheet-backed ratings endpoint
//!
//! [`RatingClient`] fetches rating summaries through a short-lived in-memory
//! cache and submits new ratings. Neither operation returns an error: fetch
//! failures degrade to [`RatingSummary::EMPTY`] and submission failures are
//! reported as an error [`SubmissionResult`].

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::fetch::{fetch_with_retry, FetchError};
use super::{Rating, RatingError, RatingSummary, SubmissionResult};
use crate::cache::{lock_cache, CacheSweeper, SharedCache, SweepHandle, TtlCache};
use crate::config::{ClientConfig, ConfigureOptions};

/// Prefix of every rating cache key
const CACHE_NAMESPACE: &str = "ratings_";

/// IP reported when the lookup service cannot be reached
pub const UNKNOWN_IP: &str = "unknown";

/// Snapshot of the cache state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
    /// Stored entries, including expired ones not yet evicted
    pub size: usize,
    /// Current time-to-live
    pub duration: Duration,
}

/// Response of the IP lookup service
#[derive(Debug, Deserialize)]
struct IpResponse {
    #[serde(default)]
    ip: Option<String>,
}

/// Body of a rating submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RatingPayload<'a> {
    action: &'static str,
    course_id: &'a str,
    rating: Rating,
}

/// Client for fetching and submitting course ratings
///
/// Cloning is cheap; clones share the same cache.
#[derive(Debug, Clone)]
pub struct RatingClient {
    http_client: Client,
    config: ClientConfig,
    cache: SharedCache<RatingSummary>,
}

impl RatingClient {
    /// Creates a client with a fresh HTTP client and an empty cache
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a client that reuses an existing HTTP client
    pub fn with_client(http_client: Client, config: ClientConfig) -> Self {
        let cache = TtlCache::shared(config.cache_ttl);
        Self {
            http_client,
            config,
            cache,
        }
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts the background sweep of expired cache entries
    ///
    /// The sweep runs every `sweep_interval` until the returned handle is
    /// shut down or dropped. Must be called from within a tokio runtime.
    pub fn spawn_sweeper(&self) -> SweepHandle {
        CacheSweeper::spawn(self.cache.clone(), self.config.sweep_interval)
    }

    fn cache_key(course_id: &str) -> String {
        format!("{}{}", CACHE_NAMESPACE, course_id)
    }

    /// Fetches the rating summary for a course
    ///
    /// Returns a cached summary while it is fresh. Otherwise queries the
    /// endpoint, normalizes the response, and caches it. Any failure, including
    /// an empty `course_id`, yields [`RatingSummary::EMPTY`].
    pub async fn fetch_ratings(&self, course_id: &str) -> RatingSummary {
        let course_id = course_id.trim();
        if course_id.is_empty() {
            error!("fetch_ratings called without a course id");
            return RatingSummary::EMPTY;
        }

        let key = Self::cache_key(course_id);
        let (cached, generation) = {
            let mut cache = lock_cache(&self.cache);
            (cache.get(&key), cache.generation())
        };
        if let Some(summary) = cached {
            debug!(course_id, "using cached ratings");
            return summary;
        }

        match self.fetch_from_api(course_id).await {
            Ok(summary) => {
                // A submission may have invalidated the key while we waited
                if !lock_cache(&self.cache).set_if_current(key, summary, generation) {
                    debug!(course_id, "cache invalidated during fetch, not storing");
                }
                summary
            }
            Err(e) => {
                error!(course_id, error = %e, "failed to fetch ratings");
                RatingSummary::EMPTY
            }
        }
    }

    async fn fetch_from_api(&self, course_id: &str) -> Result<RatingSummary, RatingError> {
        let request = self
            .http_client
            .get(&self.config.endpoint)
            .query(&[("action", "getRatings"), ("courseId", course_id)]);

        let response = fetch_with_retry(request, &self.config.ratings_policy()).await?;
        let text = response.text().await.map_err(FetchError::from)?;
        let raw: serde_json::Value = serde_json::from_str(&text)?;

        Ok(RatingSummary::from_raw(&raw))
    }

    /// Submits a rating for a course
    ///
    /// `rating_value` must be between 1 and 5 and `course_id` non-empty;
    /// otherwise an error result is returned without touching the network.
    /// A successful submission drops the cached summary for the course so the
    /// next fetch goes to the endpoint.
    pub async fn submit_rating(&self, course_id: &str, rating_value: u8) -> SubmissionResult {
        let course_id = course_id.trim();
        let rating = match Rating::new(rating_value) {
            Some(rating) if !course_id.is_empty() => rating,
            _ => {
                warn!(course_id, rating_value, "rejected invalid rating submission");
                return SubmissionResult::error(RatingError::Validation.to_string());
            }
        };

        let user_ip = self.lookup_ip().await;

        match self.post_rating(course_id, rating, &user_ip).await {
            Ok(result) => {
                if result.is_success() {
                    lock_cache(&self.cache).remove(&Self::cache_key(course_id));
                    info!(course_id, rating = rating.value(), "rating submitted, cache cleared");
                } else {
                    warn!(course_id, message = ?result.message, "endpoint rejected rating");
                }
                result
            }
            Err(e) => {
                error!(course_id, error = %e, "failed to submit rating");
                SubmissionResult::error(format!("Submit failed: {}", e))
            }
        }
    }

    async fn post_rating(
        &self,
        course_id: &str,
        rating: Rating,
        user_ip: &str,
    ) -> Result<SubmissionResult, RatingError> {
        let payload = RatingPayload {
            action: "addRating",
            course_id,
            rating,
        };
        let body = serde_json::to_string(&payload)?;

        let request = self
            .http_client
            .post(&self.config.endpoint)
            .query(&[("userIP", user_ip)])
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body);

        let response = fetch_with_retry(request, &self.config.ratings_policy()).await?;
        let text = response.text().await.map_err(FetchError::from)?;

        Ok(serde_json::from_str(&text)?)
    }

    /// Best-effort lookup of the caller's public IP
    ///
    /// Falls back to [`UNKNOWN_IP`] on any failure.
    async fn lookup_ip(&self) -> String {
        match self.fetch_ip().await {
            Ok(Some(ip)) => ip,
            Ok(None) => UNKNOWN_IP.to_string(),
            Err(e) => {
                warn!(error = %e, "could not fetch user IP");
                UNKNOWN_IP.to_string()
            }
        }
    }

    async fn fetch_ip(&self) -> Result<Option<String>, RatingError> {
        let request = self.http_client.get(&self.config.ip_lookup_url);
        let response = fetch_with_retry(request, &self.config.ip_lookup_policy()).await?;
        let text = response.text().await.map_err(FetchError::from)?;
        let parsed: IpResponse = serde_json::from_str(&text)?;

        Ok(parsed.ip.filter(|ip| !ip.trim().is_empty()))
    }

    /// Empties the rating cache
    pub fn clear_cache(&self) {
        lock_cache(&self.cache).clear();
    }

    /// Current cache size and time-to-live
    pub fn cache_info(&self) -> CacheInfo {
        let cache = lock_cache(&self.cache);
        CacheInfo {
            size: cache.len(),
            duration: cache.ttl(),
        }
    }

    /// Adjusts client behavior at runtime
    ///
    /// A zero `cache_duration` is ignored.
    pub fn configure(&self, options: ConfigureOptions) {
        if let Some(duration) = options.cache_duration.filter(|d| !d.is_zero()) {
            lock_cache(&self.cache).set_ttl(duration);
            debug!(ttl_ms = duration.as_millis() as u64, "cache duration updated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> RatingClient {
        // Port 9 (discard) is never served in tests; validation must short-circuit
        RatingClient::new(
            ClientConfig::default()
                .with_endpoint("http://127.0.0.1:9/exec")
                .with_ip_lookup_url("http://127.0.0.1:9/ip"),
        )
    }

    #[test]
    fn test_cache_key_uses_namespace() {
        assert_eq!(RatingClient::cache_key("42"), "ratings_42");
        assert_eq!(RatingClient::cache_key("intro-rust"), "ratings_intro-rust");
    }

    #[test]
    fn test_payload_sends_course_id_as_string() {
        let payload = RatingPayload {
            action: "addRating",
            course_id: "42",
            rating: Rating::new(4).unwrap(),
        };

        let json = serde_json::to_string(&payload).unwrap();

        assert_eq!(json, r#"{"action":"addRating","courseId":"42","rating":4}"#);
    }

    #[test]
    fn test_payload_keeps_ids_verbatim() {
        for id in ["intro-rust", "007"] {
            let payload = RatingPayload {
                action: "addRating",
                course_id: id,
                rating: Rating::new(1).unwrap(),
            };
            let value = serde_json::to_value(&payload).unwrap();
            assert_eq!(value["courseId"], serde_json::Value::String(id.to_string()));
        }
    }

    #[tokio::test]
    async fn test_empty_course_id_returns_empty_summary() {
        let client = offline_client();
        assert_eq!(client.fetch_ratings("").await, RatingSummary::EMPTY);
        assert_eq!(client.fetch_ratings("   ").await, RatingSummary::EMPTY);
        assert_eq!(client.cache_info().size, 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_input_locally() {
        let client = offline_client();

        for (course_id, value) in [("42", 0), ("42", 6), ("", 3)] {
            let result = client.submit_rating(course_id, value).await;
            assert!(!result.is_success());
            assert_eq!(
                result.message.as_deref(),
                Some("Invalid course ID or rating value")
            );
        }
    }

    #[test]
    fn test_configure_changes_ttl() {
        let client = offline_client();
        assert_eq!(client.cache_info().duration, Duration::from_secs(300));

        client.configure(ConfigureOptions {
            cache_duration: Some(Duration::from_secs(30)),
        });
        assert_eq!(client.cache_info().duration, Duration::from_secs(30));

        client.configure(ConfigureOptions {
            cache_duration: Some(Duration::ZERO),
        });
        client.configure(ConfigureOptions::default());
        assert_eq!(client.cache_info().duration, Duration::from_secs(30));
    }

    #[test]
    fn test_clones_share_cache() {
        let client = offline_client();
        let clone = client.clone();

        lock_cache(&client.cache).set("ratings_1", RatingSummary::EMPTY);

        assert_eq!(clone.cache_info().size, 1);
        clone.clear_cache();
        assert_eq!(client.cache_info().size, 0);
    }
}
