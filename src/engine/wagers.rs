//! Head-to-head wager resolution.
//!
//! Runs after the score-writing phase so both sides' period scores are
//! current. Each pending wager settles exactly once; the payout is applied
//! atomically with the state transition, additive to the same totals row the
//! accrual ledger writes (a distinct point source, never double-counted
//! against the ledger's delta).

use crate::adapters::PostgresStore;
use crate::config::WagerConfig;
use crate::domain::{PeriodScore, Wager, WagerStatus};
use crate::error::Result;
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Planned terminal transition for one wager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub wager_id: Uuid,
    pub user_id: Uuid,
    pub status: WagerStatus,
    pub point_award: i64,
    pub coin_award: i64,
}

/// Settle every pending wager whose two sides both have a period score.
/// Wagers with a missing side stay pending until a later run. Pure function
/// of wager and score state.
pub fn plan_settlements(
    wagers: &[Wager],
    scores: &HashMap<String, PeriodScore>,
    cfg: &WagerConfig,
) -> Vec<Settlement> {
    let mut settlements = Vec::new();

    for wager in wagers {
        let (my_score, rival_score) = match (
            scores.get(&wager.artist_id),
            scores.get(&wager.rival_artist_id),
        ) {
            (Some(m), Some(r)) => (m, r),
            _ => {
                warn!(
                    "Wager {} missing a period score for {} or {}, deferring",
                    wager.id, wager.artist_id, wager.rival_artist_id
                );
                continue;
            }
        };

        let my_delta = my_score.total_points - wager.artist_points_at_stake;
        let rival_delta = rival_score.total_points - wager.rival_points_at_stake;

        let status = match wager.settle(my_delta, rival_delta) {
            Ok(s) => s,
            Err(e) => {
                warn!("Wager {} cannot settle: {}", wager.id, e);
                continue;
            }
        };

        // Coin award is zero on every outcome in the current design
        let point_award = if status == WagerStatus::Won {
            cfg.win_points
        } else {
            0
        };
        let coin_award = if status == WagerStatus::Won {
            cfg.win_coins
        } else {
            0
        };

        settlements.push(Settlement {
            wager_id: wager.id,
            user_id: wager.user_id,
            status,
            point_award,
            coin_award,
        });
    }

    settlements
}

/// Store-backed wager resolution pass
pub struct WagerResolver<'a> {
    store: &'a PostgresStore,
    cfg: &'a WagerConfig,
}

impl<'a> WagerResolver<'a> {
    pub fn new(store: &'a PostgresStore, cfg: &'a WagerConfig) -> Self {
        Self { store, cfg }
    }

    /// Resolve pending wagers against the given scores. Per-wager write
    /// failures are logged and skipped. Returns the number resolved.
    pub async fn run(
        &self,
        wagers: &[Wager],
        scores: &HashMap<String, PeriodScore>,
    ) -> Result<usize> {
        let settlements = plan_settlements(wagers, scores, self.cfg);
        let mut resolved = 0usize;

        for settlement in &settlements {
            match self
                .store
                .settle_wager(
                    settlement.wager_id,
                    settlement.user_id,
                    settlement.status,
                    settlement.point_award,
                    settlement.coin_award,
                )
                .await
            {
                Ok(true) => resolved += 1,
                Ok(false) => {
                    // Another run got here first; the transition is one-way
                    warn!("Wager {} was already settled", settlement.wager_id);
                }
                Err(e) => {
                    error!("Failed to settle wager {}: {}", settlement.wager_id, e);
                }
            }
        }

        info!(
            "Resolved {}/{} pending wagers ({} deferred)",
            resolved,
            wagers.len(),
            wagers.len() - settlements.len()
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WagerPick;
    use chrono::Utc;

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

    fn wager(mine: &str, rival: &str, pick: WagerPick, my_stake: i64, rival_stake: i64) -> Wager {
        Wager {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            season_id: Uuid::new_v4(),
            artist_id: mine.to_string(),
            rival_artist_id: rival.to_string(),
            pick,
            artist_points_at_stake: my_stake,
            rival_points_at_stake: rival_stake,
            status: WagerStatus::Pending,
            placed_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn cfg() -> WagerConfig {
        WagerConfig {
            win_points: 100,
            win_coins: 0,
        }
    }

    #[test]
    fn test_won_wager_pays_points_no_coins() {
        // myDelta = 40, rivalDelta = 10
        let scores: HashMap<_, _> = [score("m", 40), score("r", 10)].into_iter().collect();
        let w = wager("m", "r", WagerPick::Mine, 0, 0);

        let settlements = plan_settlements(&[w], &scores, &cfg());
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].status, WagerStatus::Won);
        assert_eq!(settlements[0].point_award, 100);
        assert_eq!(settlements[0].coin_award, 0);
    }

    #[test]
    fn test_draw_outcome_no_payout() {
        let scores: HashMap<_, _> = [score("m", 10), score("r", 10)].into_iter().collect();
        let w = wager("m", "r", WagerPick::Mine, 0, 0);

        let settlements = plan_settlements(&[w], &scores, &cfg());
        assert_eq!(settlements[0].status, WagerStatus::Draw);
        assert_eq!(settlements[0].point_award, 0);
    }

    #[test]
    fn test_lost_wager_no_payout() {
        let scores: HashMap<_, _> = [score("m", 10), score("r", 40)].into_iter().collect();
        let w = wager("m", "r", WagerPick::Mine, 0, 0);

        let settlements = plan_settlements(&[w], &scores, &cfg());
        assert_eq!(settlements[0].status, WagerStatus::Lost);
        assert_eq!(settlements[0].point_award, 0);
    }

    #[test]
    fn test_deltas_measured_from_stake_snapshots() {
        // Current scores equal, but my side moved more since placement
        let scores: HashMap<_, _> = [score("m", 50), score("r", 50)].into_iter().collect();
        let w = wager("m", "r", WagerPick::Mine, 10, 45);

        let settlements = plan_settlements(&[w], &scores, &cfg());
        assert_eq!(settlements[0].status, WagerStatus::Won);
    }

    #[test]
    fn test_missing_score_defers_wager() {
        let scores: HashMap<_, _> = [score("m", 50)].into_iter().collect();
        let w = wager("m", "unscored", WagerPick::Mine, 0, 0);

        assert!(plan_settlements(&[w], &scores, &cfg()).is_empty());
    }

    #[test]
    fn test_already_settled_wager_not_planned() {
        let scores: HashMap<_, _> = [score("m", 40), score("r", 10)].into_iter().collect();
        let mut w = wager("m", "r", WagerPick::Mine, 0, 0);
        w.status = WagerStatus::Won;

        assert!(plan_settlements(&[w], &scores, &cfg()).is_empty());
    }
}
