//! End-of-season rollover: rank every manager, archive one immutable history
//! row each, then zero the running totals.
//!
//! Must run only after the closing season's final accrual pass; that ordering
//! is a scheduling contract, not a lock held here.

use crate::adapters::PostgresStore;
use crate::domain::{LeaderboardEntry, ManagerTotals};
use crate::error::{CrescendoError, Result};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// What the rollover run did
#[derive(Debug, Clone, Serialize)]
pub struct RolloverSummary {
    pub season_id: Uuid,
    pub managers_ranked: usize,
    pub totals_reset: u64,
}

/// Rank managers by combined score, descending, with deterministic
/// tie-breaks: higher period points, then higher event points, then earlier
/// account creation. The sort key is a total order, so ranks run 1..n with
/// no gaps. Pure function of the totals rows.
pub fn rank_managers(season_id: Uuid, mut totals: Vec<ManagerTotals>) -> Vec<LeaderboardEntry> {
    totals.sort_by(|a, b| {
        b.combined()
            .cmp(&a.combined())
            .then_with(|| b.period_points.cmp(&a.period_points))
            .then_with(|| b.event_points.cmp(&a.event_points))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    totals
        .into_iter()
        .enumerate()
        .map(|(i, t)| LeaderboardEntry {
            user_id: t.user_id,
            season_id,
            rank: (i + 1) as i32,
            period_points: t.period_points,
            event_points: t.event_points,
            combined_points: t.combined(),
        })
        .collect()
}

/// Store-backed weekly rollover job
pub struct RolloverJob {
    store: PostgresStore,
}

impl RolloverJob {
    pub fn new(store: PostgresStore) -> Self {
        Self { store }
    }

    /// Close out the active season. Aborts early when no season is active;
    /// the history write happens before the reset so a failure between the
    /// two leaves the archive complete and the reset re-runnable.
    pub async fn run(&self) -> Result<RolloverSummary> {
        let season = self
            .store
            .active_season()
            .await?
            .ok_or(CrescendoError::NoActiveSeason)?;

        let totals = self.store.manager_totals().await?;
        let entries = rank_managers(season.id, totals);

        self.store.insert_leaderboard_entries(&entries).await?;
        let totals_reset = self.store.reset_totals().await?;

        info!(
            "Season {} rolled over: {} managers ranked, {} totals reset",
            season.id,
            entries.len(),
            totals_reset
        );

        Ok(RolloverSummary {
            season_id: season.id,
            managers_ranked: entries.len(),
            totals_reset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn totals(period: i64, event: i64, created_offset_days: i64) -> ManagerTotals {
        ManagerTotals {
            user_id: Uuid::new_v4(),
            period_points: period,
            event_points: event,
            coins: 0,
            created_at: Utc::now() + Duration::days(created_offset_days),
        }
    }

    #[test]
    fn test_sorted_by_combined_descending() {
        let season = Uuid::new_v4();
        let a = totals(100, 0, 0);
        let b = totals(200, 50, 0);
        let c = totals(150, 0, 0);

        let entries = rank_managers(season, vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(entries[0].user_id, b.user_id);
        assert_eq!(entries[1].user_id, c.user_id);
        assert_eq!(entries[2].user_id, a.user_id);
        assert_eq!(
            entries.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_combined_tie_broken_by_period_points() {
        let season = Uuid::new_v4();
        // Same combined (150), different split
        let a = totals(100, 50, 0);
        let b = totals(120, 30, 0);

        let entries = rank_managers(season, vec![a.clone(), b.clone()]);
        assert_eq!(entries[0].user_id, b.user_id);
    }

    #[test]
    fn test_full_tie_broken_by_earlier_creation() {
        let season = Uuid::new_v4();
        let newer = totals(100, 50, 10);
        let older = totals(100, 50, 0);

        let entries = rank_managers(season, vec![newer.clone(), older.clone()]);
        assert_eq!(entries[0].user_id, older.user_id);
        assert_eq!(entries[1].user_id, newer.user_id);
    }

    #[test]
    fn test_ranks_start_at_one_with_no_gaps() {
        let season = Uuid::new_v4();
        let entries = rank_managers(
            season,
            vec![totals(10, 0, 0), totals(10, 0, 1), totals(5, 0, 0)],
        );
        assert_eq!(
            entries.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_history_rows_carry_components() {
        let season = Uuid::new_v4();
        let entries = rank_managers(season, vec![totals(120, 30, 0)]);
        assert_eq!(entries[0].period_points, 120);
        assert_eq!(entries[0].event_points, 30);
        assert_eq!(entries[0].combined_points, 150);
        assert_eq!(entries[0].season_id, season);
    }
}
