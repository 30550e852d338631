//! Idempotent accrual ledger.
//!
//! Each run recomputes a manager's season-to-date total from scratch and
//! applies only the difference against what the accrual log already holds.
//! The "already applied" figure is the sum of log rows, never a cached
//! counter; that recomputation is what makes repeated and partial runs safe.

use crate::adapters::PostgresStore;
use crate::config::ScoringConfig;
use crate::domain::{AccrualEntry, PeriodScore, Team};
use crate::engine::scorer::captain_multiplier;
use crate::error::Result;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Season-to-date total for one roster: each slot's period score, with the
/// captain's contribution multiplied up before summing. Slots without a
/// score row (artist skipped this run, no baseline yet) contribute zero.
pub fn team_period_total(
    team: &Team,
    scores: &HashMap<String, PeriodScore>,
    featured: &HashSet<String>,
    cfg: &ScoringConfig,
) -> i64 {
    team.artist_ids
        .iter()
        .map(|artist_id| {
            let points = scores.get(artist_id).map(|s| s.total_points).unwrap_or(0);
            if artist_id == &team.captain_id {
                let multiplier = captain_multiplier(featured.contains(artist_id), cfg);
                (points as f64 * multiplier).round() as i64
            } else {
                points
            }
        })
        .sum()
}

/// Points still owed to a manager given what the log already holds
pub fn accrual_delta(current_total: i64, already_logged: i64) -> i64 {
    current_total - already_logged
}

/// Store-backed application of the ledger pass
pub struct AccrualLedger<'a> {
    store: &'a PostgresStore,
    scoring: &'a ScoringConfig,
}

impl<'a> AccrualLedger<'a> {
    pub fn new(store: &'a PostgresStore, scoring: &'a ScoringConfig) -> Self {
        Self { store, scoring }
    }

    /// Apply accrual deltas for every roster. A zero delta writes nothing;
    /// a failed write is logged and the pass continues with the next
    /// manager. Returns the number of managers updated.
    pub async fn run(
        &self,
        teams: &[Team],
        scores: &HashMap<String, PeriodScore>,
        featured: &HashSet<String>,
        day: NaiveDate,
    ) -> Result<usize> {
        let mut updated = 0usize;

        for team in teams {
            let current_total = team_period_total(team, scores, featured, self.scoring);
            let already_logged = self
                .store
                .accrued_points(team.user_id, team.season_id)
                .await?;
            let delta = accrual_delta(current_total, already_logged);

            if delta == 0 {
                debug!("Manager {} already up to date", team.user_id);
                continue;
            }

            let entry = AccrualEntry {
                id: Uuid::new_v4(),
                user_id: team.user_id,
                season_id: team.season_id,
                day,
                points: delta,
            };

            match self.store.apply_accrual(&entry).await {
                Ok(()) => {
                    debug!("Accrued {} points for manager {}", delta, team.user_id);
                    updated += 1;
                }
                Err(e) => {
                    error!("Failed to accrue points for manager {}: {}", team.user_id, e);
                }
            }
        }

        info!("Accrual pass updated {}/{} managers", updated, teams.len());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn score(artist_id: &str, points: i64) -> (String, PeriodScore) {
        (
            artist_id.to_string(),
            PeriodScore {
                season_id: Uuid::new_v4(),
                artist_id: artist_id.to_string(),
                popularity_delta: 0,
                growth_pct: 0.0,
                release_bonus: 0,
                total_points: points,
            },
        )
    }

    fn team(artists: &[&str], captain: &str) -> Team {
        Team {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            season_id: Uuid::new_v4(),
            artist_ids: artists.iter().map(|s| s.to_string()).collect(),
            captain_id: captain.to_string(),
        }
    }

    #[test]
    fn test_captain_contribution_non_featured() {
        let cfg = ScoringConfig::default();
        let scores: HashMap<_, _> = [score("c", 100)].into_iter().collect();
        let t = team(&["c"], "c");

        // 100 * 1.5 = 150
        assert_eq!(team_period_total(&t, &scores, &HashSet::new(), &cfg), 150);
    }

    #[test]
    fn test_captain_contribution_featured() {
        let cfg = ScoringConfig::default();
        let scores: HashMap<_, _> = [score("c", 100)].into_iter().collect();
        let featured: HashSet<String> = ["c".to_string()].into_iter().collect();
        let t = team(&["c"], "c");

        // 100 * 2.0 = 200
        assert_eq!(team_period_total(&t, &scores, &featured, &cfg), 200);
    }

    #[test]
    fn test_non_captains_contribute_at_face_value() {
        let cfg = ScoringConfig::default();
        let scores: HashMap<_, _> = [score("c", 100), score("a", 40), score("b", -10)]
            .into_iter()
            .collect();
        let t = team(&["c", "a", "b"], "c");

        assert_eq!(
            team_period_total(&t, &scores, &HashSet::new(), &cfg),
            150 + 40 - 10
        );
    }

    #[test]
    fn test_missing_score_rows_contribute_zero() {
        let cfg = ScoringConfig::default();
        let scores: HashMap<_, _> = [score("a", 40)].into_iter().collect();
        let t = team(&["a", "unknown"], "a");

        assert_eq!(team_period_total(&t, &scores, &HashSet::new(), &cfg), 60);
    }

    #[test]
    fn test_delta_math() {
        assert_eq!(accrual_delta(180, 0), 180);
        assert_eq!(accrual_delta(180, 180), 0);
        // Metrics moved down since the last run: negative catch-up
        assert_eq!(accrual_delta(150, 180), -30);
    }
}
