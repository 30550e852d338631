//! Daily scoring run orchestration.
//!
//! Two-phase pipeline: resolve the active artist set from roster, feature,
//! and wager state, then fetch fresh metrics and score. Score writes happen
//! before wager resolution so both sides of every wager read current rows.
//! Each unit of work (one provider chunk, one manager, one wager) is
//! independently idempotent, so a partial run followed by a full rerun
//! converges to the correct state.

use crate::adapters::{MetricsProvider, PostgresStore};
use crate::config::{AppConfig, ScoringConfig};
use crate::domain::{ArtistMetrics, BaselineSnapshot, PeriodScore, Release};
use crate::engine::active::resolve_active_artists;
use crate::engine::ledger::AccrualLedger;
use crate::engine::scorer::score_artist;
use crate::engine::wagers::WagerResolver;
use crate::error::{CrescendoError, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What one daily run did
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub season_id: Uuid,
    pub active_artists: usize,
    pub artists_scored: usize,
    pub artists_skipped: usize,
    pub managers_updated: usize,
    pub wagers_resolved: usize,
    pub duration_ms: u64,
}

/// The daily scoring job: diff fresh metrics against season baselines,
/// accrue manager points, resolve wagers.
pub struct DailyScoringJob {
    store: PostgresStore,
    provider: Arc<dyn MetricsProvider>,
    config: AppConfig,
}

impl DailyScoringJob {
    pub fn new(store: PostgresStore, provider: Arc<dyn MetricsProvider>, config: AppConfig) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();

        // Required reads: without a season or its rosters the run cannot
        // proceed and aborts with failure.
        let season = self
            .store
            .active_season()
            .await?
            .ok_or(CrescendoError::NoActiveSeason)?;

        let teams = self.store.teams(season.id).await?;
        for team in &teams {
            if !team.is_consistent() {
                warn!(
                    "Team {} captain {} is not on its roster",
                    team.id, team.captain_id
                );
            }
        }
        let featured_ids = self.store.featured_artist_ids().await?;
        let pending_wagers = self.store.pending_wagers(season.id).await?;
        let baselines = self.store.baselines(season.id).await?;

        let active: Vec<String> = resolve_active_artists(&teams, &featured_ids, &pending_wagers)
            .into_iter()
            .collect();
        info!(
            "Season {}: {} active artists across {} teams, {} pending wagers",
            season.id,
            active.len(),
            teams.len(),
            pending_wagers.len()
        );

        // Auth failure aborts the run; nothing has been written yet.
        self.provider.authenticate().await?;

        let metrics = self.provider.fetch_metrics(&active).await?;
        let fetched_ids: Vec<String> = metrics.iter().map(|m| m.artist_id.clone()).collect();
        let releases = self.provider.fetch_recent_releases(&fetched_ids).await?;

        // Phase 2: score and upsert. A failed write degrades that artist,
        // not the run.
        let today = Utc::now().date_naive();
        let mut scored = 0usize;
        let mut skipped = active.len().saturating_sub(metrics.len());

        for current in &metrics {
            let Some(baseline) = baselines.get(&current.artist_id) else {
                warn!(
                    "No baseline for artist {} this season, skipping",
                    current.artist_id
                );
                skipped += 1;
                continue;
            };

            let artist_releases = releases
                .get(&current.artist_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let score: PeriodScore = score_artist(
                baseline,
                current,
                artist_releases,
                today,
                &self.config.scoring,
            );

            match self.store.upsert_period_score(&score).await {
                Ok(()) => scored += 1,
                Err(e) => {
                    error!("Failed to store score for artist {}: {}", score.artist_id, e);
                    skipped += 1;
                }
            }
        }
        info!("Scored {}/{} active artists", scored, active.len());

        // Ledger pass reads the rows just written (plus any survivors from
        // earlier runs).
        let scores = self.store.period_scores(season.id).await?;
        let featured: HashSet<String> = featured_ids.into_iter().collect();

        let ledger = AccrualLedger::new(&self.store, &self.config.scoring);
        let managers_updated = ledger.run(&teams, &scores, &featured, today).await?;

        // Wager resolution is sequenced after score writes.
        let resolver = WagerResolver::new(&self.store, &self.config.wagers);
        let wagers_resolved = resolver.run(&pending_wagers, &scores).await?;

        Ok(RunSummary {
            season_id: season.id,
            active_artists: active.len(),
            artists_scored: scored,
            artists_skipped: skipped,
            managers_updated,
            wagers_resolved,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Score a batch of fetched metrics against baselines without touching any
/// store; the daily job's scoring phase in pure form.
pub fn score_batch(
    baselines: &HashMap<String, BaselineSnapshot>,
    metrics: &[ArtistMetrics],
    releases: &HashMap<String, Vec<Release>>,
    window_end: chrono::NaiveDate,
    cfg: &ScoringConfig,
) -> Vec<PeriodScore> {
    metrics
        .iter()
        .filter_map(|current| {
            let baseline = baselines.get(&current.artist_id)?;
            let artist_releases = releases
                .get(&current.artist_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            Some(score_artist(baseline, current, artist_releases, window_end, cfg))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::metrics_api::{BearerToken, MockMetricsProvider};
    use chrono::{NaiveDate, TimeZone};

    #[tokio::test]
    async fn test_fetch_phase_scores_only_returned_artists() {
        let mut provider = MockMetricsProvider::new();
        provider
            .expect_authenticate()
            .returning(|| Ok(BearerToken("token".into())));
        // One chunk was skipped; only the first artist comes back
        provider.expect_fetch_metrics().returning(|ids| {
            Ok(vec![ArtistMetrics {
                artist_id: ids[0].clone(),
                popularity: 65,
                followers: 1100,
            }])
        });
        provider
            .expect_fetch_recent_releases()
            .returning(|_| Ok(HashMap::new()));

        let provider: Arc<dyn MetricsProvider> = Arc::new(provider);
        provider.authenticate().await.unwrap();

        let active = vec!["a1".to_string(), "a2".to_string()];
        let metrics = provider.fetch_metrics(&active).await.unwrap();
        let fetched: Vec<String> = metrics.iter().map(|m| m.artist_id.clone()).collect();
        let releases = provider.fetch_recent_releases(&fetched).await.unwrap();

        let season_id = Uuid::new_v4();
        let baselines: HashMap<String, BaselineSnapshot> = ["a1", "a2"]
            .iter()
            .map(|id| {
                (
                    id.to_string(),
                    BaselineSnapshot {
                        season_id,
                        artist_id: id.to_string(),
                        popularity: 50,
                        followers: 1000,
                        frozen_at: Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap(),
                    },
                )
            })
            .collect();

        let scores = score_batch(
            &baselines,
            &metrics,
            &releases,
            NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
            &ScoringConfig::default(),
        );

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].artist_id, "a1");
        assert_eq!(scores[0].total_points, 160);
    }
}
