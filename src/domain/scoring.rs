use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-(season, artist) score row, upserted on every daily run. Re-running
/// with unchanged provider data reproduces the same row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodScore {
    pub season_id: Uuid,
    pub artist_id: String,
    pub popularity_delta: i32,
    pub growth_pct: f64,
    pub release_bonus: i64,
    pub total_points: i64,
}

/// One accrual-log row: the points delta applied to a manager on a given day.
/// The sum of a manager's rows within a season always equals their currently
/// computed season total; that sum is the idempotence mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub season_id: Uuid,
    pub day: NaiveDate,
    pub points: i64,
}

/// Per-manager running totals. `period_points` is written only through the
/// accrual ledger, `event_points` only through wager payouts; both are
/// additive deltas so the writers compose without overwriting each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerTotals {
    pub user_id: Uuid,
    pub period_points: i64,
    pub event_points: i64,
    /// Secondary currency balance; read/written by collaborators outside
    /// this engine, only ever adjusted by delta here.
    pub coins: i64,
    pub created_at: DateTime<Utc>,
}

impl ManagerTotals {
    pub fn combined(&self) -> i64 {
        self.period_points + self.event_points
    }
}

/// Immutable per-(manager, season) history row written once at rollover
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub season_id: Uuid,
    pub rank: i32,
    pub period_points: i64,
    pub event_points: i64,
    pub combined_points: i64,
}
