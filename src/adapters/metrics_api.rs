//! External metrics provider client.
//!
//! Client-credentials auth, batch metrics lookups chunked at the provider's
//! id limit, and per-artist recent-release fetches with bounded concurrency.
//! All calls go through the injected [`RetryPolicy`]; a chunk or artist that
//! exhausts its retries is logged and skipped, never fatal to the run.

use crate::adapters::retry::{RetryDecision, RetryPolicy};
use crate::config::ProviderConfig;
use crate::domain::{ArtistMetrics, Release, ReleaseType};
use crate::error::{CrescendoError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Short-lived bearer credential; valid for one run at most
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Read-only metrics provider seam. The HTTP client implements it; tests
/// mock it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Obtain (or refresh) the bearer credential for this run
    async fn authenticate(&self) -> Result<BearerToken>;

    /// Current metrics for the given artists. Ids are chunked internally;
    /// a failed chunk is skipped, so the result may be a subset.
    async fn fetch_metrics(&self, artist_ids: &[String]) -> Result<Vec<ArtistMetrics>>;

    /// Recent releases per artist, fetched with bounded concurrency.
    /// Artists whose fetch fails permanently are absent from the map.
    async fn fetch_recent_releases(
        &self,
        artist_ids: &[String],
    ) -> Result<HashMap<String, Vec<Release>>>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ArtistsEnvelope {
    artists: Vec<ArtistPayload>,
}

#[derive(Debug, Deserialize)]
struct ArtistPayload {
    id: String,
    #[serde(default)]
    popularity: i32,
    #[serde(default)]
    followers: FollowersPayload,
}

#[derive(Debug, Deserialize, Default)]
struct FollowersPayload {
    #[serde(default)]
    total: i64,
}

#[derive(Debug, Deserialize)]
struct ReleasesEnvelope {
    items: Vec<ReleasePayload>,
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    id: String,
    name: String,
    album_type: String,
    release_date: String,
}

/// HTTP implementation of [`MetricsProvider`]
pub struct MetricsApiClient {
    http: Client,
    cfg: ProviderConfig,
    retry: RetryPolicy,
    token: RwLock<Option<String>>,
}

impl MetricsApiClient {
    pub fn new(cfg: ProviderConfig) -> Result<Self> {
        let retry = RetryPolicy::new(cfg.max_attempts, cfg.base_delay());
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CrescendoError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            cfg,
            retry,
            token: RwLock::new(None),
        })
    }

    /// Split ids into provider-sized chunks
    pub fn chunk_ids(ids: &[String], batch_size: usize) -> Vec<Vec<String>> {
        ids.chunks(batch_size.max(1)).map(|c| c.to_vec()).collect()
    }

    async fn bearer(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        Ok(self.authenticate().await?.0)
    }

    /// One GET with retry/backoff. 401 triggers a single token refresh that
    /// does not count against the retry budget; other failures follow the
    /// policy.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let mut attempt = 0u32;
        let mut token_refreshed = false;

        loop {
            let token = self.bearer().await?;
            let response = self.http.get(url).bearer_auth(&token).send().await;

            let response = match response {
                Ok(r) => r,
                Err(e) => match self.retry.decide_transport(attempt) {
                    RetryDecision::RetryAfter(delay) => {
                        warn!("Transport error on {} (attempt {}): {}", url, attempt + 1, e);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    RetryDecision::Abandon => {
                        warn!("Giving up on {} after transport errors: {}", url, e);
                        // Status 0 marks a connection-level failure
                        return Err(CrescendoError::ProviderExhausted {
                            attempts: attempt + 1,
                            status: 0,
                        });
                    }
                },
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response.json().await?);
            }

            let retry_after = parse_retry_after(&response);
            let body = response.text().await.unwrap_or_default();

            match classify_failure(&self.retry, status, retry_after, body, attempt, token_refreshed)
            {
                FailureAction::RefreshToken => {
                    debug!("Bearer token expired, refreshing");
                    self.token.write().await.take();
                    token_refreshed = true;
                }
                FailureAction::Retry(delay) => {
                    warn!(
                        "Provider returned {} for {} (attempt {}), retrying in {:?}",
                        status,
                        url,
                        attempt + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                FailureAction::GiveUp(e) => return Err(e),
            }
        }
    }

    async fn fetch_metrics_chunk(&self, chunk: &[String]) -> Result<Vec<ArtistMetrics>> {
        let url = format!("{}/artists?ids={}", self.cfg.api_base, chunk.join(","));
        let value = self.get_json(&url).await?;
        let envelope: ArtistsEnvelope = serde_json::from_value(value)?;

        Ok(envelope
            .artists
            .into_iter()
            .map(|a| ArtistMetrics {
                artist_id: a.id,
                popularity: a.popularity,
                followers: a.followers.total,
            })
            .collect())
    }

    async fn fetch_releases_for(&self, artist_id: &str) -> Result<Vec<Release>> {
        let url = format!(
            "{}/artists/{}/albums?include_groups=album,single&limit=50",
            self.cfg.api_base, artist_id
        );
        let value = self.get_json(&url).await?;
        let envelope: ReleasesEnvelope = serde_json::from_value(value)?;

        Ok(envelope
            .items
            .into_iter()
            .filter_map(|item| {
                let released_on = parse_release_date(&item.release_date)?;
                Some(Release {
                    id: item.id,
                    artist_id: artist_id.to_string(),
                    title: item.name,
                    release_type: ReleaseType::parse(&item.album_type),
                    released_on,
                })
            })
            .collect())
    }
}

#[async_trait]
impl MetricsProvider for MetricsApiClient {
    async fn authenticate(&self) -> Result<BearerToken> {
        let response = self
            .http
            .post(&self.cfg.token_url)
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrescendoError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        *self.token.write().await = Some(token.access_token.clone());
        info!("Authenticated with metrics provider");
        Ok(BearerToken(token.access_token))
    }

    async fn fetch_metrics(&self, artist_ids: &[String]) -> Result<Vec<ArtistMetrics>> {
        let chunks = Self::chunk_ids(artist_ids, self.cfg.batch_size);
        let mut metrics = Vec::with_capacity(artist_ids.len());
        let mut skipped = 0usize;

        for chunk in &chunks {
            match self.fetch_metrics_chunk(chunk).await {
                Ok(batch) => metrics.extend(batch),
                Err(e) if e.is_skippable() => {
                    skipped += chunk.len();
                    warn!("Skipping metrics chunk of {} artists: {}", chunk.len(), e);
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Fetched metrics for {}/{} artists ({} chunks)",
            metrics.len(),
            artist_ids.len(),
            chunks.len()
        );
        if skipped > 0 {
            warn!("{} artists not updated this run", skipped);
        }
        Ok(metrics)
    }

    async fn fetch_recent_releases(
        &self,
        artist_ids: &[String],
    ) -> Result<HashMap<String, Vec<Release>>> {
        let results: Vec<(String, Result<Vec<Release>>)> = stream::iter(artist_ids.to_vec())
            .map(|id| async move { (id.clone(), self.fetch_releases_for(&id).await) })
            .buffer_unordered(self.cfg.release_concurrency.max(1))
            .collect()
            .await;

        let mut releases = HashMap::with_capacity(results.len());
        for (artist_id, result) in results {
            match result {
                Ok(items) => {
                    releases.insert(artist_id, items);
                }
                Err(e) if e.is_skippable() => {
                    warn!("Skipping releases for artist {}: {}", artist_id, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(releases)
    }
}

/// What to do with one failed provider response within a call
#[derive(Debug)]
enum FailureAction {
    /// Drop the cached token and resend; does not consume a retry attempt
    RefreshToken,
    /// Retry the same request after the delay
    Retry(Duration),
    GiveUp(CrescendoError),
}

fn classify_failure(
    retry: &RetryPolicy,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: String,
    attempt: u32,
    token_refreshed: bool,
) -> FailureAction {
    if status == StatusCode::UNAUTHORIZED && !token_refreshed {
        return FailureAction::RefreshToken;
    }

    match retry.decide(status, retry_after, attempt) {
        RetryDecision::RetryAfter(delay) => FailureAction::Retry(delay),
        RetryDecision::Abandon => {
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                FailureAction::GiveUp(CrescendoError::ProviderExhausted {
                    attempts: attempt + 1,
                    status: status.as_u16(),
                })
            } else {
                FailureAction::GiveUp(CrescendoError::ProviderRejected {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

/// Retry-After header in seconds, when present and well-formed
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Providers report dates at day, month, or year precision
fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(year) = raw.parse::<i32>() {
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_respects_batch_limit() {
        let ids: Vec<String> = (0..120).map(|i| format!("artist-{}", i)).collect();
        let chunks = MetricsApiClient::chunk_ids(&ids, 50);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 50);
        assert_eq!(chunks[1].len(), 50);
        assert_eq!(chunks[2].len(), 20);
    }

    #[test]
    fn test_chunking_empty_input() {
        let chunks = MetricsApiClient::chunk_ids(&[], 50);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_release_date_precision() {
        assert_eq!(
            parse_release_date("2024-03-15"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(
            parse_release_date("2024-03"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_release_date("2024"),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_release_date("unknown"), None);
    }

    #[test]
    fn test_token_refresh_keeps_full_retry_budget() {
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            jitter: 0.0,
        };
        let mut attempt = 0u32;
        let mut refreshed = false;

        // Expired token first: refresh only, no attempt consumed
        match classify_failure(
            &retry,
            StatusCode::UNAUTHORIZED,
            None,
            String::new(),
            attempt,
            refreshed,
        ) {
            FailureAction::RefreshToken => refreshed = true,
            other => panic!("expected token refresh, got {:?}", other),
        }
        assert_eq!(attempt, 0);

        // The full retry budget is still available for transient failures
        // on the same call
        for _ in 0..2 {
            match classify_failure(
                &retry,
                StatusCode::SERVICE_UNAVAILABLE,
                None,
                String::new(),
                attempt,
                refreshed,
            ) {
                FailureAction::Retry(_) => attempt += 1,
                other => panic!("expected retry, got {:?}", other),
            }
        }
        assert!(matches!(
            classify_failure(
                &retry,
                StatusCode::SERVICE_UNAVAILABLE,
                None,
                String::new(),
                attempt,
                refreshed,
            ),
            FailureAction::GiveUp(CrescendoError::ProviderExhausted { attempts: 3, .. })
        ));
    }

    #[test]
    fn test_second_unauthorized_is_rejected() {
        let retry = RetryPolicy::default();
        assert!(matches!(
            classify_failure(
                &retry,
                StatusCode::UNAUTHORIZED,
                None,
                String::new(),
                0,
                true,
            ),
            FailureAction::GiveUp(CrescendoError::ProviderRejected { status: 401, .. })
        ));
    }

    #[test]
    fn test_metrics_payload_parsing() {
        let raw = r#"{
            "artists": [
                {"id": "a1", "name": "First", "popularity": 65, "followers": {"total": 1100}},
                {"id": "a2", "name": "Second"}
            ]
        }"#;
        let envelope: ArtistsEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.artists.len(), 2);
        assert_eq!(envelope.artists[0].popularity, 65);
        assert_eq!(envelope.artists[0].followers.total, 1100);
        // Missing fields default instead of failing the whole chunk
        assert_eq!(envelope.artists[1].popularity, 0);
        assert_eq!(envelope.artists[1].followers.total, 0);
    }

    #[test]
    fn test_releases_payload_parsing() {
        let raw = r#"{
            "items": [
                {"id": "r1", "name": "New Single", "album_type": "single", "release_date": "2024-06-01"},
                {"id": "r2", "name": "Greatest Hits", "album_type": "compilation", "release_date": "2024"}
            ]
        }"#;
        let envelope: ReleasesEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.items.len(), 2);
        assert_eq!(ReleaseType::parse(&envelope.items[0].album_type), ReleaseType::Single);
        assert_eq!(
            ReleaseType::parse(&envelope.items[1].album_type),
            ReleaseType::Compilation
        );
    }
}
