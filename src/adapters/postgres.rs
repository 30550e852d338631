use crate::adapters::paging::collect_pages;
use crate::domain::{
    AccrualEntry, BaselineSnapshot, LeaderboardEntry, ManagerTotals, PeriodScore, Season, Team,
    Wager, WagerPick, WagerStatus,
};
use crate::error::{CrescendoError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    page_size: i64,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32, page_size: i64) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool, page_size })
    }

    /// Create a store from an existing connection pool
    pub fn from_pool(pool: PgPool, page_size: i64) -> Self {
        Self { pool, page_size }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== Seasons & baselines ====================

    /// The season containing the current instant, if any
    pub async fn active_season(&self) -> Result<Option<Season>> {
        let row = sqlx::query(
            r#"
            SELECT id, starts_at, ends_at
            FROM seasons
            WHERE starts_at <= NOW() AND ends_at > NOW()
            ORDER BY starts_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Season {
            id: r.get("id"),
            starts_at: r.get("starts_at"),
            ends_at: r.get("ends_at"),
        }))
    }

    /// All baseline snapshots for a season, keyed by artist id
    pub async fn baselines(&self, season_id: Uuid) -> Result<HashMap<String, BaselineSnapshot>> {
        let rows = collect_pages(self.page_size, |offset, limit| async move {
            let rows = sqlx::query(
                r#"
                SELECT season_id, artist_id, popularity, followers, frozen_at
                FROM baseline_snapshots
                WHERE season_id = $1
                ORDER BY artist_id
                OFFSET $2 LIMIT $3
                "#,
            )
            .bind(season_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let snapshot = BaselineSnapshot {
                    season_id: r.get("season_id"),
                    artist_id: r.get("artist_id"),
                    popularity: r.get("popularity"),
                    followers: r.get("followers"),
                    frozen_at: r.get("frozen_at"),
                };
                (snapshot.artist_id.clone(), snapshot)
            })
            .collect())
    }

    // ==================== Rosters & featured artists ====================

    /// All rosters for a season
    pub async fn teams(&self, season_id: Uuid) -> Result<Vec<Team>> {
        let rows = collect_pages(self.page_size, |offset, limit| async move {
            let rows = sqlx::query(
                r#"
                SELECT id, user_id, season_id, artist_ids, captain_id
                FROM teams
                WHERE season_id = $1
                ORDER BY id
                OFFSET $2 LIMIT $3
                "#,
            )
            .bind(season_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Team {
                id: r.get("id"),
                user_id: r.get("user_id"),
                season_id: r.get("season_id"),
                artist_ids: r.get("artist_ids"),
                captain_id: r.get("captain_id"),
            })
            .collect())
    }

    /// Ids of globally featured artists
    pub async fn featured_artist_ids(&self) -> Result<Vec<String>> {
        let rows = collect_pages(self.page_size, |offset, limit| async move {
            let rows = sqlx::query(
                r#"
                SELECT id FROM artists
                WHERE featured = TRUE
                ORDER BY id
                OFFSET $1 LIMIT $2
                "#,
            )
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await?;

        Ok(rows.into_iter().map(|r| r.get("id")).collect())
    }

    // ==================== Period scores ====================

    /// Idempotent upsert of one (season, artist) score row
    pub async fn upsert_period_score(&self, score: &PeriodScore) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO period_scores
                (season_id, artist_id, popularity_delta, growth_pct, release_bonus, total_points, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (season_id, artist_id) DO UPDATE SET
                popularity_delta = EXCLUDED.popularity_delta,
                growth_pct = EXCLUDED.growth_pct,
                release_bonus = EXCLUDED.release_bonus,
                total_points = EXCLUDED.total_points,
                updated_at = NOW()
            "#,
        )
        .bind(score.season_id)
        .bind(&score.artist_id)
        .bind(score.popularity_delta)
        .bind(score.growth_pct)
        .bind(score.release_bonus)
        .bind(score.total_points)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All score rows for a season, keyed by artist id
    pub async fn period_scores(&self, season_id: Uuid) -> Result<HashMap<String, PeriodScore>> {
        let rows = collect_pages(self.page_size, |offset, limit| async move {
            let rows = sqlx::query(
                r#"
                SELECT season_id, artist_id, popularity_delta, growth_pct, release_bonus, total_points
                FROM period_scores
                WHERE season_id = $1
                ORDER BY artist_id
                OFFSET $2 LIMIT $3
                "#,
            )
            .bind(season_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let score = PeriodScore {
                    season_id: r.get("season_id"),
                    artist_id: r.get("artist_id"),
                    popularity_delta: r.get("popularity_delta"),
                    growth_pct: r.get("growth_pct"),
                    release_bonus: r.get("release_bonus"),
                    total_points: r.get("total_points"),
                };
                (score.artist_id.clone(), score)
            })
            .collect())
    }

    // ==================== Accrual ledger ====================

    /// Sum of all accrual-log rows for a manager this season. Summed on every
    /// run rather than cached; the sum is the idempotence mechanism.
    pub async fn accrued_points(&self, user_id: Uuid, season_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(points), 0)::BIGINT AS total
            FROM accrual_log
            WHERE user_id = $1 AND season_id = $2
            "#,
        )
        .bind(user_id)
        .bind(season_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("total"))
    }

    /// Append one accrual-log row and apply the same delta to the manager's
    /// running total, atomically. Totals are adjusted additively so this
    /// composes with other writers of the totals row.
    pub async fn apply_accrual(&self, entry: &AccrualEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO accrual_log (id, user_id, season_id, day, points)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.season_id)
        .bind(entry.day)
        .bind(entry.points)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO manager_totals (user_id, period_points, event_points, coins)
            VALUES ($1, $2, 0, 0)
            ON CONFLICT (user_id) DO UPDATE SET
                period_points = manager_totals.period_points + EXCLUDED.period_points
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.points)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== Wagers ====================

    /// Unresolved wagers for a season. Rows with an unknown pick or a missing
    /// rival are logged and skipped, not fatal.
    pub async fn pending_wagers(&self, season_id: Uuid) -> Result<Vec<Wager>> {
        let rows = collect_pages(self.page_size, |offset, limit| async move {
            let rows = sqlx::query(
                r#"
                SELECT id, user_id, season_id, artist_id, rival_artist_id, pick,
                       artist_points_at_stake, rival_points_at_stake, status,
                       placed_at, resolved_at
                FROM wagers
                WHERE season_id = $1 AND status = 'pending'
                ORDER BY id
                OFFSET $2 LIMIT $3
                "#,
            )
            .bind(season_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await?;

        let mut wagers = Vec::with_capacity(rows.len());
        for r in rows {
            let id: Uuid = r.get("id");

            let rival: Option<String> = r.get("rival_artist_id");
            let rival_artist_id = match rival {
                Some(rival) if !rival.is_empty() => rival,
                _ => {
                    warn!("Wager {} has no rival artist, skipping", id);
                    continue;
                }
            };

            let pick_raw: String = r.get("pick");
            let pick = match WagerPick::parse(&pick_raw) {
                Some(p) => p,
                None => {
                    warn!("Wager {} has unknown pick '{}', skipping", id, pick_raw);
                    continue;
                }
            };

            let status_raw: String = r.get("status");
            let status = WagerStatus::parse(&status_raw).unwrap_or(WagerStatus::Pending);

            wagers.push(Wager {
                id,
                user_id: r.get("user_id"),
                season_id: r.get("season_id"),
                artist_id: r.get("artist_id"),
                rival_artist_id,
                pick,
                artist_points_at_stake: r.get("artist_points_at_stake"),
                rival_points_at_stake: r.get("rival_points_at_stake"),
                status,
                placed_at: r.get("placed_at"),
                resolved_at: r.get("resolved_at"),
            });
        }

        Ok(wagers)
    }

    /// Transition a wager out of pending and apply its payout, atomically.
    /// The status guard in the UPDATE makes the transition one-way even if
    /// two runs race; returns false when the wager was already settled.
    pub async fn settle_wager(
        &self,
        wager_id: Uuid,
        user_id: Uuid,
        status: WagerStatus,
        point_award: i64,
        coin_award: i64,
    ) -> Result<bool> {
        if !status.is_terminal() {
            return Err(CrescendoError::InvalidStateTransition {
                from: WagerStatus::Pending.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE wagers
            SET status = $1, resolved_at = NOW()
            WHERE id = $2 AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(wager_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if point_award != 0 || coin_award != 0 {
            sqlx::query(
                r#"
                INSERT INTO manager_totals (user_id, period_points, event_points, coins)
                VALUES ($1, 0, $2, $3)
                ON CONFLICT (user_id) DO UPDATE SET
                    event_points = manager_totals.event_points + EXCLUDED.event_points,
                    coins = manager_totals.coins + EXCLUDED.coins
                "#,
            )
            .bind(user_id)
            .bind(point_award)
            .bind(coin_award)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    // ==================== Totals & leaderboard ====================

    /// All manager totals rows
    pub async fn manager_totals(&self) -> Result<Vec<ManagerTotals>> {
        let rows = collect_pages(self.page_size, |offset, limit| async move {
            let rows = sqlx::query(
                r#"
                SELECT user_id, period_points, event_points, coins, created_at
                FROM manager_totals
                ORDER BY user_id
                OFFSET $1 LIMIT $2
                "#,
            )
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ManagerTotals {
                user_id: r.get("user_id"),
                period_points: r.get("period_points"),
                event_points: r.get("event_points"),
                coins: r.get("coins"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Write history rows for a closed season. Rows are immutable; a rerun
    /// of the rollover leaves existing entries untouched.
    pub async fn insert_leaderboard_entries(&self, entries: &[LeaderboardEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO leaderboard_history
                    (user_id, season_id, rank, period_points, event_points, combined_points)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (user_id, season_id) DO NOTHING
                "#,
            )
            .bind(entry.user_id)
            .bind(entry.season_id)
            .bind(entry.rank)
            .bind(entry.period_points)
            .bind(entry.event_points)
            .bind(entry.combined_points)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Stored {} leaderboard entries", entries.len());
        Ok(())
    }

    /// Zero both score components for every manager
    pub async fn reset_totals(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE manager_totals
            SET period_points = 0, event_points = 0
            WHERE period_points <> 0 OR event_points <> 0
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
